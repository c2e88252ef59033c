//! Pre-compiled regex filters built once at configuration-load time.
//!
//! User-supplied patterns are never recompiled per request; an invalid
//! pattern is skipped (or replaced with the built-in default) with a
//! warning, never a startup failure.

use regex_lite::Regex;
use tracing::warn;

/// Episode titles matching this are recap/extra material, not real episodes.
const DEFAULT_EPISODE_TITLE_FILTER: &str =
    "预告|彩蛋|专访|直拍|纯享|加更|抢先|花絮|特辑|合集|剪辑|幕后|片花|精华|看点|速看|解读|影评|揭秘|赏析";

/// A set of compiled patterns; a text "matches" if any pattern matches.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilter {
    patterns: Vec<Regex>,
}

impl CompiledFilter {
    /// Compile a blocked-words list of the form `/pat1/,/pat2/,...`.
    ///
    /// Commas inside `/.../` delimiters do not split; entries that are not
    /// slash-delimited or fail to compile are skipped with a warning.
    pub fn from_blocked_words(spec: &str) -> Self {
        let mut patterns = Vec::new();
        for entry in split_outside_slashes(spec) {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let Some(body) = entry
                .strip_prefix('/')
                .and_then(|rest| rest.strip_suffix('/'))
            else {
                warn!(entry, "blocked word entry is not /slash/-delimited, skipping");
                continue;
            };
            match Regex::new(body) {
                Ok(re) => patterns.push(re),
                Err(e) => warn!(pattern = body, error = %e, "invalid blocked word pattern, skipping"),
            }
        }
        Self { patterns }
    }

    /// Compile the episode-title filter, substituting the built-in default
    /// when the configured pattern is missing or invalid.
    pub fn episode_title_filter(configured: Option<&str>) -> Self {
        let pattern = match configured {
            Some(p) if !p.is_empty() => p,
            _ => DEFAULT_EPISODE_TITLE_FILTER,
        };
        match Regex::new(pattern) {
            Ok(re) => Self { patterns: vec![re] },
            Err(e) => {
                warn!(pattern, error = %e, "invalid episode title filter, using default");
                let re = Regex::new(DEFAULT_EPISODE_TITLE_FILTER)
                    .unwrap_or_else(|_| Regex::new("$^").unwrap());
                Self { patterns: vec![re] }
            }
        }
    }

    /// A filter that matches nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Split on commas that sit outside `/.../` delimiters.
fn split_outside_slashes(spec: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_slashes = false;
    for c in spec.chars() {
        match c {
            '/' => {
                in_slashes = !in_slashes;
                current.push(c);
            }
            ',' if !in_slashes => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
