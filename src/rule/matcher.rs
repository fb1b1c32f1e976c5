//! First-match rule selection.

use super::Rule;

/// The rule chosen for one entry.
#[derive(Debug, Clone, Copy)]
pub enum RuleMatch<'r> {
    /// A declared rule matched.
    Rule {
        /// Position of the rule in the declared list.
        index: usize,
        /// The matching rule.
        rule: &'r Rule,
    },
    /// No declared rule matched; the entry is copied unchanged.
    Default,
}

impl<'r> RuleMatch<'r> {
    /// Returns the matched rule, or `None` for the implicit default.
    pub fn rule(&self) -> Option<&'r Rule> {
        match self {
            RuleMatch::Rule { rule, .. } => Some(rule),
            RuleMatch::Default => None,
        }
    }

    /// Returns the index of the matched rule, or `None` for the default.
    pub fn index(&self) -> Option<usize> {
        match self {
            RuleMatch::Rule { index, .. } => Some(*index),
            RuleMatch::Default => None,
        }
    }

    /// Returns whether the implicit default rule applies.
    pub fn is_default(&self) -> bool {
        matches!(self, RuleMatch::Default)
    }
}

/// Selects the first rule in `rules` whose patterns accept `entry_name`.
///
/// A rule without patterns accepts every name. When nothing matches the
/// implicit default (copy unchanged) applies.
pub fn match_rule<'r>(entry_name: &str, rules: &'r [Rule]) -> RuleMatch<'r> {
    rules
        .iter()
        .enumerate()
        .find(|(_, rule)| rule.matches(entry_name))
        .map_or(RuleMatch::Default, |(index, rule)| RuleMatch::Rule { index, rule })
}
