//! Bounded file loading.
//!
//! The whole image is read once into an immutable [`Bytes`] buffer; every
//! later stage borrows from it.

use crate::error::{ElfSiftError, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Defines the resource limits for I/O operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IoLimits {
    /// The absolute maximum file size that can be loaded.
    pub max_file_size: u64,
}

impl Default for IoLimits {
    fn default() -> Self {
        Self {
            max_file_size: 256 * 1024 * 1024, // 256MB
        }
    }
}

/// Immutable file contents plus the path they came from
#[derive(Debug, Clone)]
pub struct RawImage {
    bytes: Bytes,
    path: Option<PathBuf>,
}

impl RawImage {
    /// Wrap an in-memory buffer
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            path: None,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Read a whole file, refusing anything larger than `limits.max_file_size`.
pub fn load_image<P: AsRef<Path>>(path: P, limits: &IoLimits) -> Result<RawImage> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let file_size = file.metadata()?.len();

    debug!(
        path = %path.display(),
        size = file_size,
        limits.max_file_size = limits.max_file_size,
        "Loading file"
    );

    if file_size > limits.max_file_size {
        warn!(
            path = %path.display(),
            size = file_size,
            limit = limits.max_file_size,
            "File is too large"
        );
        return Err(ElfSiftError::FileTooLarge {
            limit: limits.max_file_size,
            found: file_size,
        });
    }

    // Bound the read as well; the file may grow after the metadata check
    let mut buf = Vec::with_capacity(file_size as usize);
    file.by_ref()
        .take(limits.max_file_size.saturating_add(1))
        .read_to_end(&mut buf)?;
    if buf.len() as u64 > limits.max_file_size {
        return Err(ElfSiftError::FileTooLarge {
            limit: limits.max_file_size,
            found: buf.len() as u64,
        });
    }

    Ok(RawImage {
        bytes: Bytes::from(buf),
        path: Some(path.to_path_buf()),
    })
}
