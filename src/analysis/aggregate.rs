//! Import statistics and relocation hotspot ranking.
//!
//! Every function here is a pure reduction over already-parsed tables.

use crate::formats::elf::symbols::SymbolTable;
use crate::formats::elf::{bind_name, symbol_type_name, Relocation, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of a frequency table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}

/// A symbol name and how many relocations reference it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    pub name: String,
    pub count: usize,
    /// Display form; equals `name` unless a demangled form is known.
    pub demangled_name: String,
}

/// Aggregated view of the imported symbols
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    pub count: usize,
    pub sample: Vec<String>,
    pub sample_demangled: Vec<String>,
    pub by_type: Vec<CategoryCount>,
    pub by_bind: Vec<CategoryCount>,
    pub func_sample: Vec<String>,
    pub func_sample_demangled: Vec<String>,
}

/// Count occurrences of each key, keeping first-seen order.
fn tally<I, K>(keys: I) -> Vec<CategoryCount>
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    let mut order: Vec<CategoryCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for key in keys {
        let key = key.into();
        match index.get(&key) {
            Some(&i) => order[i].count += 1,
            None => {
                index.insert(key.clone(), order.len());
                order.push(CategoryCount {
                    name: key,
                    count: 1,
                });
            }
        }
    }
    order
}

/// Group imports by type and binding and take the leading samples.
///
/// Demangled samples start out equal to the raw names; the engine fills them
/// in once a demangling pass has run.
pub fn import_stats<'a, I>(imports: I, top_n: usize) -> ImportStats
where
    I: IntoIterator<Item = &'a Symbol>,
{
    let imports: Vec<&Symbol> = imports.into_iter().collect();

    let sample: Vec<String> = imports.iter().take(top_n).map(|s| s.name.clone()).collect();
    let func_sample: Vec<String> = imports
        .iter()
        .filter(|s| s.is_function())
        .take(top_n)
        .map(|s| s.name.clone())
        .collect();

    ImportStats {
        count: imports.len(),
        sample_demangled: sample.clone(),
        sample,
        by_type: tally(imports.iter().map(|s| symbol_type_name(s.st_type()))),
        by_bind: tally(imports.iter().map(|s| bind_name(s.st_bind()))),
        func_sample_demangled: func_sample.clone(),
        func_sample,
    }
}

/// Rank names by frequency: descending count, ties in first-seen order.
///
/// Empty names are skipped. At most `top_n` entries are returned.
pub fn rank<'a, I>(names: I, top_n: usize) -> Vec<Hotspot>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts = tally(names.into_iter().filter(|n| !n.is_empty()));
    // sort_by is stable, so equal counts keep insertion order
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(top_n);
    counts
        .into_iter()
        .map(|c| Hotspot {
            demangled_name: c.name.clone(),
            name: c.name,
            count: c.count,
        })
        .collect()
}

/// Hotspots for a relocation list, resolving symbol indices through `symbols`.
pub fn hotspots(relocations: &[Relocation], symbols: &SymbolTable, top_n: usize) -> Vec<Hotspot> {
    rank(relocations.iter().map(|r| symbols.name_of(r.symbol)), top_n)
}
