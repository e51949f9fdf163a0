use regex::Regex;
use tracing::debug;

use crate::document::Document;
use crate::error::Result;

/// Cleanup rules starting with one of these are removed.
pub const DEFAULT_UNCLEANUP_PATTERNS: &[&str] = &[
    r"^/include",
    r"^/lib/.+/include",
    r"^/lib/pkgconfig",
    r"^/share/pkgconfig",
    r"^/share/aclocal",
    r"^/lib/cmake",
];

#[derive(Debug, Clone)]
pub struct UncleanupRules {
    patterns: Vec<Regex>,
}

impl UncleanupRules {
    /// Rules with the default patterns only.
    pub fn new() -> Result<Self> {
        Self::with_patterns::<&str>(&[])
    }

    /// Default patterns plus `extra`. Every pattern is anchored at the start
    /// of the rule but may match only a prefix of it.
    pub fn with_patterns<S: AsRef<str>>(extra: &[S]) -> Result<Self> {
        let mut patterns = Vec::with_capacity(DEFAULT_UNCLEANUP_PATTERNS.len() + extra.len());

        for pattern in DEFAULT_UNCLEANUP_PATTERNS {
            patterns.push(compile_prefix(pattern)?);
        }
        for pattern in extra {
            let pattern = pattern.as_ref();
            if !pattern.is_empty() {
                patterns.push(compile_prefix(pattern)?);
            }
        }

        Ok(Self { patterns })
    }

    pub fn is_match(&self, rule: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(rule))
    }
}

fn compile_prefix(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("^(?:{})", pattern))?)
}

/// Remove matching `cleanup` entries from the holder and every nested module.
/// Returns the number of removed entries.
pub fn uncleanup(holder: &mut Document, rules: &UncleanupRules) -> usize {
    let Document::Object(mapping) = holder else {
        return 0;
    };

    let mut removed = 0;

    if let Some(Document::Array(cleanup)) = mapping.get_mut("cleanup") {
        cleanup.retain(|entry| match entry.as_str() {
            Some(rule) if rules.is_match(rule) => {
                debug!("Dropping cleanup rule {}", rule);
                removed += 1;
                false
            }
            _ => true,
        });
    }

    if let Some(Document::Array(modules)) = mapping.get_mut("modules") {
        for module in modules {
            removed += uncleanup(module, rules);
        }
    }

    removed
}
