//! Caller-supplied name filter.

use crate::config::FilterSpec;
use crate::error::{ElfSiftError, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Compiled name filter
#[derive(Debug, Clone)]
pub enum NameFilter {
    /// Plain, case-sensitive substring
    Substring(String),
    /// Case-insensitive regular expression
    Pattern(Regex),
}

impl NameFilter {
    /// Compile a filter spec. `include` wins over `regex`; an empty spec
    /// yields `None`. A regex that fails to compile is an error.
    pub fn from_spec(spec: &FilterSpec) -> Result<Option<Self>> {
        if let Some(include) = spec.include.as_deref().filter(|s| !s.is_empty()) {
            return Ok(Some(NameFilter::Substring(include.to_string())));
        }
        let Some(pattern) = spec.regex.as_deref().filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(|re| Some(NameFilter::Pattern(re)))
            .map_err(|e| ElfSiftError::InvalidFilter {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameFilter::Substring(s) => name.contains(s.as_str()),
            NameFilter::Pattern(re) => re.is_match(name),
        }
    }

    /// Keep matching, non-empty names in input order.
    pub fn select<'a, I>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter(|n| !n.is_empty() && self.matches(n))
            .map(str::to_string)
            .collect()
    }
}

/// Names that passed the filter, per source list.
///
/// Relocation lists keep one entry per matching relocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterMatches {
    pub imports: Vec<String>,
    pub plt: Vec<String>,
    #[serde(rename = "dyn")]
    pub dyn_: Vec<String>,
}
