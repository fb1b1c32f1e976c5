//! Declarative rule descriptions, loadable from JSON.
//!
//! ```json
//! [
//!   { "match": "package/package.json", "action": "json",
//!     "remove": ["scripts", "devDependencies"],
//!     "replace": { "publishConfig.access": "public" } },
//!   { "match": ["**/*.log", "**/*.tmp"], "action": "skip" }
//! ]
//! ```

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::{Action, Rule};
use crate::patch::JsonPatch;
use crate::{Error, Result};

/// Action names accepted in rule files.
///
/// Parsing is case-insensitive; `skip`, `remove` and `delete` are accepted
/// as aliases of `suppress`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActionSpec {
    /// Copy unchanged.
    #[default]
    Copy,
    /// Drop from the output.
    Suppress,
    /// Apply the rule's `remove`/`replace` lists as a JSON patch.
    Json,
}

impl FromStr for ActionSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "copy" => Ok(Self::Copy),
            "suppress" | "skip" | "remove" | "delete" => Ok(Self::Suppress),
            "json" => Ok(Self::Json),
            other => Err(Error::InvalidConfig(format!("unknown action '{}'", other))),
        }
    }
}

impl TryFrom<String> for ActionSpec {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ActionSpec> for String {
    fn from(spec: ActionSpec) -> Self {
        match spec {
            ActionSpec::Copy => "copy",
            ActionSpec::Suppress => "suppress",
            ActionSpec::Json => "json",
        }
        .to_string()
    }
}

/// Serializable description of a [`Rule`].
///
/// Only the built-in actions can be described; custom handlers and hooks
/// have to be attached in code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Glob patterns; `None` matches every entry. Accepts a single string,
    /// and an empty string also matches every entry.
    #[serde(
        default,
        rename = "match",
        deserialize_with = "one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub patterns: Option<Vec<String>>,
    /// What to do with matching entries.
    #[serde(default, alias = "proc")]
    pub action: ActionSpec,
    /// Dotted paths to delete (json action only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
    /// Dotted path to replacement value (json action only).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub replace: Map<String, Value>,
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(
        Option::<OneOrMany>::deserialize(deserializer)?.and_then(|patterns| match patterns {
            OneOrMany::One(p) if p.is_empty() => None,
            OneOrMany::One(p) => Some(vec![p]),
            OneOrMany::Many(ps) => Some(ps),
        }),
    )
}

impl RuleSpec {
    /// Compiles this description into a [`Rule`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for bad globs and
    /// [`Error::InvalidConfig`] if `remove`/`replace` are given for a
    /// non-json action.
    pub fn into_rule(self) -> Result<Rule> {
        let action = match self.action {
            ActionSpec::Json => Action::JsonPatch(JsonPatch {
                remove: self.remove,
                replace: self.replace,
            }),
            other => {
                if !self.remove.is_empty() || !self.replace.is_empty() {
                    return Err(Error::InvalidConfig(format!(
                        "'remove' and 'replace' need the json action, not '{}'",
                        String::from(other)
                    )));
                }
                match other {
                    ActionSpec::Suppress => Action::Suppress,
                    _ => Action::Copy,
                }
            }
        };

        match self.patterns {
            Some(patterns) if patterns != [""] => Rule::matching(patterns, action),
            _ => Ok(Rule::new(action)),
        }
    }

    /// Parses a JSON array of rule descriptions.
    pub fn parse_list(json: &str) -> Result<Vec<RuleSpec>> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig(format!("rule list: {}", e)))
    }

    /// Loads a JSON array of rule descriptions from a file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Vec<RuleSpec>> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::parse_list(&text)
    }

    /// Compiles a list of descriptions, preserving order.
    pub fn compile_all(specs: impl IntoIterator<Item = RuleSpec>) -> Result<Vec<Rule>> {
        specs.into_iter().map(RuleSpec::into_rule).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::ActionKind;
    use serde_json::json;

    #[test]
    fn test_parse_single_and_many_patterns() {
        let specs = RuleSpec::parse_list(
            r#"[{"match": "a.txt", "action": "skip"}, {"match": ["b", "c"]}, {"action": "copy"}]"#,
        )
        .unwrap();
        assert_eq!(specs[0].patterns.as_deref(), Some(&["a.txt".to_string()][..]));
        assert_eq!(specs[0].action, ActionSpec::Suppress);
        assert_eq!(specs[1].patterns.as_ref().unwrap().len(), 2);
        assert_eq!(specs[1].action, ActionSpec::Copy);
        assert!(specs[2].patterns.is_none());
    }

    #[test]
    fn test_empty_match_matches_everything() {
        let specs = RuleSpec::parse_list(r#"[{"match": "", "action": "skip"}]"#).unwrap();
        assert!(specs[0].patterns.is_none());

        let rule = specs[0].clone().into_rule().unwrap();
        assert!(rule.matches("package/index.js"));
        assert_eq!(rule.action().kind(), ActionKind::Suppress);

        let built = RuleSpec {
            patterns: Some(vec![String::new()]),
            ..Default::default()
        };
        assert!(built.into_rule().unwrap().matches("any/entry"));
    }

    #[test]
    fn test_action_aliases() {
        for name in ["skip", "REMOVE", "Delete", "suppress"] {
            assert_eq!(name.parse::<ActionSpec>().unwrap(), ActionSpec::Suppress);
        }
        assert!(matches!(
            "zip".parse::<ActionSpec>(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_proc_alias_for_action() {
        let specs = RuleSpec::parse_list(r#"[{"match": "x", "proc": "json"}]"#).unwrap();
        assert_eq!(specs[0].action, ActionSpec::Json);
    }

    #[test]
    fn test_into_rule_json() {
        let spec = RuleSpec {
            patterns: Some(vec!["package/package.json".into()]),
            action: ActionSpec::Json,
            remove: vec!["scripts".into()],
            replace: json!({"a.b": 5}).as_object().unwrap().clone(),
        };
        let rule = spec.into_rule().unwrap();
        assert_eq!(rule.action().kind(), ActionKind::JsonPatch);
        assert!(rule.matches("package/package.json"));
    }

    #[test]
    fn test_into_rule_rejects_patch_fields_on_copy() {
        let spec = RuleSpec {
            remove: vec!["x".into()],
            ..Default::default()
        };
        assert!(matches!(spec.into_rule(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_action_in_file_is_config_error() {
        let err = RuleSpec::parse_list(r#"[{"action": "explode"}]"#).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_serialize_round_trip() {
        let spec = RuleSpec {
            patterns: Some(vec!["*.md".into()]),
            action: ActionSpec::Suppress,
            ..Default::default()
        };
        let text = serde_json::to_string(&spec).unwrap();
        assert_eq!(text, r#"{"match":["*.md"],"action":"suppress"}"#);
        let back: RuleSpec = serde_json::from_str(&text).unwrap();
        assert_eq!(back, spec);
    }
}
