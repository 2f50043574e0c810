//! Suspicious-import classification.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Behavioural category of an imported API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "antiDebug")]
    AntiDebug,
    #[serde(rename = "codeLoading")]
    CodeLoading,
    #[serde(rename = "process")]
    Process,
    #[serde(rename = "netIO")]
    NetIo,
    #[serde(rename = "fileOps")]
    FileOps,
    #[serde(rename = "crypto")]
    Crypto,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::AntiDebug,
        Category::CodeLoading,
        Category::Process,
        Category::NetIo,
        Category::FileOps,
        Category::Crypto,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::AntiDebug => "antiDebug",
            Category::CodeLoading => "codeLoading",
            Category::Process => "process",
            Category::NetIo => "netIO",
            Category::FileOps => "fileOps",
            Category::Crypto => "crypto",
        }
    }

    fn patterns(&self) -> &'static [Regex] {
        match self {
            Category::AntiDebug => &RE_ANTI_DEBUG,
            Category::CodeLoading => &RE_CODE_LOADING,
            Category::Process => &RE_PROCESS,
            Category::NetIo => &RE_NET_IO,
            Category::FileOps => &RE_FILE_OPS,
            Category::Crypto => &RE_CRYPTO,
        }
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid suspicious import regex"))
        .collect()
}

static RE_ANTI_DEBUG: Lazy<Vec<Regex>> =
    Lazy::new(|| compile(&[r"\bptrace\b", r"\bprctl\b", r"(?i)seccomp"]));

static RE_CODE_LOADING: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"\bdlopen\b",
        r"\bdlsym\b",
        r"\bdladdr\b",
        r"\bmprotect\b",
        r"\bmmap\b",
    ])
});

static RE_PROCESS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"\bsystem\b",
        r"\bpopen\b",
        r"\bexecv?e?\b",
        r"\bfork\b",
        r"\bkill\b",
    ])
});

static RE_NET_IO: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"\bsocket\b",
        r"\bconnect\b",
        r"\bsend\b",
        r"\brecv\b",
        r"(?i)inet_",
        r"(?i)getaddrinfo",
    ])
});

static RE_FILE_OPS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"\bopen\b",
        r"\bfopen\b",
        r"\bchmod\b",
        r"\bchown\b",
        r"\bunlink\b",
        r"\brename\b",
    ])
});

static RE_CRYPTO: Lazy<Vec<Regex>> =
    Lazy::new(|| compile(&[r"(?i)AES", r"(?i)SHA\d*", r"(?i)MD5", r"EVP_"]));

/// Imports that fell into one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspiciousGroup {
    pub category: Category,
    pub count: usize,
    pub symbols: Vec<String>,
}

/// Sort import names into categories.
///
/// Each name is tested against every category; within a category it counts
/// once however many patterns match. Categories come out in fixed order and
/// empty ones are omitted.
pub fn classify_imports<'a, I>(names: I) -> Vec<SuspiciousGroup>
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: Clone,
{
    let names = names.into_iter();
    Category::ALL
        .iter()
        .filter_map(|&category| {
            let patterns = category.patterns();
            let symbols: Vec<String> = names
                .clone()
                .filter(|n| patterns.iter().any(|re| re.is_match(n)))
                .map(str::to_string)
                .collect();
            if symbols.is_empty() {
                None
            } else {
                Some(SuspiciousGroup {
                    category,
                    count: symbols.len(),
                    symbols,
                })
            }
        })
        .collect()
}
