//! Wildcard path patterns.
//!
//! A pattern such as `root.items[*].transactions[*]` is compiled once into an
//! anchored regex in which each `[*]` accepts any non-negative index and every
//! other character is literal. Compiled patterns are interned in a
//! process-wide cache and handed out as shared, immutable values.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

static PATTERN_CACHE: Lazy<RwLock<HashMap<String, Arc<PathPattern>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

const ESCAPED_WILDCARD: &str = r"\[\*\]";
const INDEX_CLASS: &str = r"\[[0-9]+\]";

/// A compiled attachment or parent pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

impl PathPattern {
    /// Compile a pattern without touching the shared cache.
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let body = regex::escape(pattern).replace(ESCAPED_WILDCARD, INDEX_CLASS);
        let regex = Regex::new(&format!("^{body}$"))?;
        Ok(PathPattern {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Fetch the interned compilation of `pattern`, compiling it on first use.
    pub fn cached(pattern: &str) -> Result<Arc<Self>, regex::Error> {
        {
            let cache = PATTERN_CACHE.read().unwrap_or_else(|e| e.into_inner());
            if let Some(compiled) = cache.get(pattern) {
                return Ok(Arc::clone(compiled));
            }
        }

        let compiled = Arc::new(Self::compile(pattern)?);
        let mut cache = PATTERN_CACHE.write().unwrap_or_else(|e| e.into_inner());
        let entry = cache
            .entry(pattern.to_string())
            .or_insert_with(|| Arc::clone(&compiled));
        Ok(Arc::clone(entry))
    }

    /// True iff `concrete` equals this pattern with every `[*]` bound to some index.
    pub fn matches(&self, concrete: &str) -> bool {
        self.regex.is_match(concrete)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for PathPattern {}

/// Test a concrete path against an abstract pattern using the shared cache.
pub fn matches(concrete: &str, pattern: &str) -> bool {
    match PathPattern::cached(pattern) {
        Ok(compiled) => compiled.matches(concrete),
        Err(_) => false,
    }
}
