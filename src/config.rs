//! Analysis options and the request shape accepted by the tool surface.

use crate::analysis::anomalies::AnomalyThresholds;
use crate::error::Result;
use crate::io::IoLimits;
use crate::timeout::DEFAULT_DEMANGLE_TIMEOUT_MS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MAX_SECTIONS: usize = 200;
pub const DEFAULT_TOP_N: usize = 40;
pub const DEFAULT_DEMANGLE_LIMIT: usize = 256;

/// Optional name filter applied to imports and relocation symbols.
///
/// `include` is a plain substring and wins over `regex` when both are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.include.as_deref().map_or(true, str::is_empty)
            && self.regex.as_deref().map_or(true, str::is_empty)
    }
}

/// Options for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzeOptions {
    /// Cap on the section list in the report
    pub max_sections: usize,
    /// Length of each hotspot list
    pub top_n: usize,
    pub demangle: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterSpec>,
    /// Most names sent to the demangler in one run
    pub demangle_limit: usize,
    pub demangle_timeout_ms: u64,
    pub thresholds: AnomalyThresholds,
    pub io: IoLimits,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            max_sections: DEFAULT_MAX_SECTIONS,
            top_n: DEFAULT_TOP_N,
            demangle: true,
            filters: None,
            demangle_limit: DEFAULT_DEMANGLE_LIMIT,
            demangle_timeout_ms: DEFAULT_DEMANGLE_TIMEOUT_MS,
            thresholds: AnomalyThresholds::default(),
            io: IoLimits::default(),
        }
    }
}

impl AnalyzeOptions {
    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The active filter, ignoring one whose fields are all empty.
    pub fn active_filter(&self) -> Option<&FilterSpec> {
        self.filters.as_ref().filter(|f| !f.is_empty())
    }
}

/// Tool request: a path plus flattened options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub path: PathBuf,
    #[serde(flatten)]
    pub options: AnalyzeOptions,
}
