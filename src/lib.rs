//! elfsift: structural and symbolic analysis of untrusted ELF binaries.
//!
//! The [`engine::Analyzer`] parses an ELF32/ELF64 image of either byte order
//! and produces an [`report::AnalysisReport`] with header facts, sections,
//! dynamic entries, import statistics, relocation hotspots, anomalies,
//! suspicious-import clusters and entry-point candidates.

pub mod analysis;
pub mod config;
pub mod demangle;
pub mod engine;
pub mod error;
pub mod formats;
pub mod io;
pub mod logging;
pub mod render;
pub mod report;
pub mod timeout;
pub mod tool;

pub use config::{AnalyzeOptions, AnalyzeRequest, FilterSpec};
pub use engine::{analyze_path, Analyzer};
pub use error::{ElfSiftError, Result};
pub use report::AnalysisReport;
pub use tool::Tool;
