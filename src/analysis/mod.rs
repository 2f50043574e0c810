//! Analyst signals derived from the parsed ELF structures.
//!
//! Nothing in here touches the raw image; each pass consumes the tables the
//! `formats::elf` parsers produced.

pub mod aggregate;
pub mod anomalies;
pub mod entry;
pub mod filter;
pub mod suspicious;

pub use aggregate::{hotspots, import_stats, CategoryCount, Hotspot, ImportStats};
pub use anomalies::{detect_anomalies, Anomaly, AnomalyCode, AnomalyThresholds, Severity};
pub use entry::{find_entry_candidates, EntryCandidates, KnownEntry};
pub use filter::{FilterMatches, NameFilter};
pub use suspicious::{classify_imports, Category, SuspiciousGroup};
