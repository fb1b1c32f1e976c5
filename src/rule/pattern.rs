//! Multi-pattern glob matching for entry names.

use glob::{MatchOptions, Pattern};

use crate::{Error, Result};

/// Match options shared by every pattern.
///
/// `*` and `?` stay within one path component, `**` spans components, and
/// a leading dot in a component has to be matched explicitly.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

#[derive(Debug, Clone)]
struct CompiledPattern {
    source: String,
    pattern: Pattern,
    negated: bool,
}

/// An ordered list of glob patterns, optionally negated with a leading `!`.
///
/// Patterns are evaluated in order: a positive pattern that matches
/// includes the name, a negated pattern that matches excludes it again.
/// The name matches if it is included after the last pattern. A set of
/// only negated patterns therefore matches nothing.
///
/// # Example
///
/// ```rust
/// use tarpatch::PatternSet;
///
/// let set = PatternSet::new(["**/*.js", "!**/*.test.js"])?;
/// assert!(set.matches("package/index.js"));
/// assert!(!set.matches("package/index.test.js"));
/// assert!(!set.matches("package/README.md"));
/// # Ok::<(), tarpatch::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
}

impl PatternSet {
    /// Compiles a pattern set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if any pattern is not valid glob
    /// syntax.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| compile(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Returns whether `name` is selected by this set.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.strip_prefix("./").unwrap_or(name);
        let mut included = false;
        for p in &self.patterns {
            if p.negated {
                if included && p.pattern.matches_with(name, MATCH_OPTIONS) {
                    included = false;
                }
            } else if !included && p.pattern.matches_with(name, MATCH_OPTIONS) {
                included = true;
            }
        }
        included
    }

    /// Returns the patterns as written.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.source.as_str())
    }

    /// Returns the number of patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns whether the set has no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn compile(source: &str) -> Result<CompiledPattern> {
    let (negated, body) = match source.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, source),
    };
    let pattern = Pattern::new(body).map_err(|e| Error::InvalidPattern {
        pattern: source.to_string(),
        reason: e.msg.to_string(),
    })?;
    Ok(CompiledPattern {
        source: source.to_string(),
        pattern,
        negated,
    })
}
