//! Symbol demangling collaborators.
//!
//! Demangling only feeds display fields. Every implementation returns a
//! [`DemangleOutcome`] and never an error: a missing tool, a crash or a
//! timeout just leaves names as they were.

use crate::error::{ElfSiftError, Result};
use crate::timeout::{with_timeout, TimeoutConfig, DEFAULT_DEMANGLE_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolFlavor {
    Rust,
    Itanium,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemangleResult {
    pub original: String,
    pub demangled: String,
    pub flavor: SymbolFlavor,
}

/// Names following the Itanium (`_Z`) or Rust v0 (`_R`) mangling schemes
pub fn is_mangled(name: &str) -> bool {
    name.starts_with("_Z") || name.starts_with("_R")
}

pub fn detect_flavor(s: &str) -> SymbolFlavor {
    if rustc_demangle::try_demangle(s).is_ok() {
        return SymbolFlavor::Rust;
    }
    if s.starts_with("_Z") {
        return SymbolFlavor::Itanium;
    }
    SymbolFlavor::Unknown
}

/// Attempt to demangle a single symbol. Returns None when not recognized.
pub fn demangle_one(s: &str) -> Option<DemangleResult> {
    // Rust (v0 + legacy) demangler
    if let Ok(dm) = rustc_demangle::try_demangle(s) {
        return Some(DemangleResult {
            original: s.to_string(),
            demangled: dm.to_string(),
            flavor: SymbolFlavor::Rust,
        });
    }
    // C++ (Itanium) demangler
    if s.starts_with("_Z") {
        if let Ok(sym) = cpp_demangle::Symbol::new(s) {
            return Some(DemangleResult {
                original: s.to_string(),
                demangled: sym.to_string(),
                flavor: SymbolFlavor::Itanium,
            });
        }
    }
    None
}

/// How far a demangling pass got
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DemangleStatus {
    /// The collaborator answered for every candidate
    Complete,
    /// Only a fallback answered
    Partial,
    Unavailable,
    TimedOut,
}

/// Raw name to demangled name, for names whose demangled form differs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemangleOutcome {
    pub names: BTreeMap<String, String>,
    pub status: DemangleStatus,
}

impl DemangleOutcome {
    pub fn empty(status: DemangleStatus) -> Self {
        Self {
            names: BTreeMap::new(),
            status,
        }
    }

    /// Demangled form of `name`, or `name` itself.
    pub fn display<'a>(&'a self, name: &'a str) -> &'a str {
        self.names.get(name).map(String::as_str).unwrap_or(name)
    }
}

/// Report section describing the demangling pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemangleSummary {
    pub status: DemangleStatus,
    pub requested: usize,
    pub resolved: usize,
}

/// Something that can turn mangled names into readable ones.
pub trait Demangler {
    /// Demangle `names`. Implementations only consider mangled candidates
    /// and must tolerate their backing tool being absent.
    fn demangle(&self, names: &[String]) -> DemangleOutcome;
}

/// Unique mangled candidates in sorted order.
///
/// Names with embedded line breaks are skipped; filters answer one line
/// per name.
fn candidates(names: &[String]) -> Vec<String> {
    names
        .iter()
        .filter(|n| is_mangled(n) && !n.contains(['\n', '\r']))
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// In-process demangling via `cpp_demangle` and `rustc-demangle`
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinDemangler;

impl Demangler for BuiltinDemangler {
    fn demangle(&self, names: &[String]) -> DemangleOutcome {
        let names = candidates(names)
            .iter()
            .filter_map(|n| demangle_one(n))
            .filter(|r| r.demangled != r.original)
            .map(|r| (r.original, r.demangled))
            .collect();
        DemangleOutcome {
            names,
            status: DemangleStatus::Complete,
        }
    }
}

/// Program plus arguments for a line-oriented demangler such as `c++filt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemangleCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl DemangleCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Pipes candidates through external filters, trying each in order.
///
/// Each attempt is bounded by the timeout; the child is killed when the
/// bounded future is dropped.
#[derive(Debug, Clone)]
pub struct ExternalDemangler {
    commands: Vec<DemangleCommand>,
    timeout_ms: u64,
}

impl Default for ExternalDemangler {
    fn default() -> Self {
        Self::new(DEFAULT_DEMANGLE_TIMEOUT_MS)
    }
}

impl ExternalDemangler {
    /// `llvm-cxxfilt`, then `c++filt`
    pub fn new(timeout_ms: u64) -> Self {
        Self::with_commands(
            vec![
                DemangleCommand::new("llvm-cxxfilt"),
                DemangleCommand::new("c++filt"),
            ],
            timeout_ms,
        )
    }

    pub fn with_commands(commands: Vec<DemangleCommand>, timeout_ms: u64) -> Self {
        Self {
            commands,
            timeout_ms,
        }
    }

    async fn run_all(&self, names: &[String]) -> (Option<Vec<String>>, DemangleStatus) {
        let mut status = DemangleStatus::Unavailable;
        for command in &self.commands {
            let config = TimeoutConfig::demangle(self.timeout_ms);
            match with_timeout(config, run_filter(command, names)).await {
                Ok(lines) => return (Some(lines), DemangleStatus::Complete),
                Err(ElfSiftError::Timeout { .. }) => {
                    status = DemangleStatus::TimedOut;
                }
                Err(e) => {
                    debug!(program = %command.program, error = %e, "Demangler unavailable");
                }
            }
        }
        (None, status)
    }
}

impl Demangler for ExternalDemangler {
    fn demangle(&self, names: &[String]) -> DemangleOutcome {
        let candidates = candidates(names);
        if candidates.is_empty() {
            return DemangleOutcome::empty(DemangleStatus::Complete);
        }

        // A private runtime on its own thread, so callers already inside a
        // runtime do not hit the nested block_on panic.
        let this = self.clone();
        let input = candidates.clone();
        let joined = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(ElfSiftError::Io)?;
            Ok::<_, ElfSiftError>(runtime.block_on(this.run_all(&input)))
        })
        .join();

        let (lines, status) = match joined {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(error = %e, "Could not start demangler runtime");
                (None, DemangleStatus::Unavailable)
            }
            Err(_) => {
                warn!("Demangler thread panicked");
                (None, DemangleStatus::Unavailable)
            }
        };

        let Some(lines) = lines else {
            return DemangleOutcome::empty(status);
        };
        let names = candidates
            .into_iter()
            .zip(lines)
            .filter(|(raw, out)| !out.is_empty() && raw != out)
            .collect();
        DemangleOutcome { names, status }
    }
}

/// Feed one name per line and read one name per line back.
async fn run_filter(command: &DemangleCommand, names: &[String]) -> Result<Vec<String>> {
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| ElfSiftError::ExternalTool("stdin not captured".into()))?;
    let mut input = names.join("\n");
    input.push('\n');
    stdin.write_all(input.as_bytes()).await?;
    drop(stdin);

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        return Err(ElfSiftError::ExternalTool(format!(
            "{} exited with {}",
            command.program, output.status
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<String> = text
        .lines()
        .map(|l| l.trim_end_matches('\r').to_string())
        .collect();
    if lines.len() != names.len() {
        return Err(ElfSiftError::ExternalTool(format!(
            "{} returned {} lines for {} names",
            command.program,
            lines.len(),
            names.len()
        )));
    }
    Ok(lines)
}

/// External filters first, in-process demangling for whatever they left.
#[derive(Debug, Clone, Default)]
pub struct AutoDemangler {
    external: ExternalDemangler,
}

impl AutoDemangler {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            external: ExternalDemangler::new(timeout_ms),
        }
    }

    pub fn with_external(external: ExternalDemangler) -> Self {
        Self { external }
    }
}

impl Demangler for AutoDemangler {
    fn demangle(&self, names: &[String]) -> DemangleOutcome {
        let mut outcome = self.external.demangle(names);
        let leftovers: Vec<String> = candidates(names)
            .into_iter()
            .filter(|n| !outcome.names.contains_key(n))
            .collect();
        if leftovers.is_empty() {
            return outcome;
        }

        let fallback = BuiltinDemangler.demangle(&leftovers);
        if !fallback.names.is_empty() && outcome.status != DemangleStatus::Complete {
            outcome.status = DemangleStatus::Partial;
        }
        outcome.names.extend(fallback.names);
        outcome
    }
}
