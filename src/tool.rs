//! Tool surface: a closed registry of JSON-in, JSON-out operations.
//!
//! Callers that dispatch by name (agents, RPC front ends) look a tool up with
//! [`Tool::from_name`], advertise its [`Tool::input_schema`] and pass the
//! request body to [`Tool::invoke`].

use crate::config::{AnalyzeRequest, DEFAULT_MAX_SECTIONS, DEFAULT_TOP_N};
use crate::engine::Analyzer;
use crate::error::Result;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    ElfAnalyze,
}

impl Tool {
    pub const ALL: [Tool; 1] = [Tool::ElfAnalyze];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::ElfAnalyze => "elf_analyze",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::ElfAnalyze => {
                "Analyze an ELF file: header, sections, dynamic entries, imports, \
                 relocation hotspots, anomalies, suspicious imports and entry candidates."
            }
        }
    }

    /// JSON Schema of the request body
    pub fn input_schema(&self) -> Value {
        match self {
            Tool::ElfAnalyze => json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Path to the ELF file" },
                    "maxSections": { "type": "integer", "minimum": 0, "default": DEFAULT_MAX_SECTIONS },
                    "topN": { "type": "integer", "minimum": 0, "default": DEFAULT_TOP_N },
                    "demangle": { "type": "boolean", "default": true },
                    "filters": {
                        "type": "object",
                        "properties": {
                            "include": { "type": "string", "description": "Substring match" },
                            "regex": { "type": "string", "description": "Case-insensitive regex" }
                        }
                    }
                },
                "required": ["path"]
            }),
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Run the tool on a JSON request and return the JSON report.
    pub fn invoke(&self, request: Value) -> Result<Value> {
        match self {
            Tool::ElfAnalyze => {
                let request: AnalyzeRequest = serde_json::from_value(request)?;
                debug!(path = %request.path.display(), "elf_analyze invoked");
                let report = Analyzer::new(request.options).analyze_path(&request.path)?;
                report.to_json_value()
            }
        }
    }
}
