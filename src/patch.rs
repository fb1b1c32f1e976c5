//! Dotted-path edits on JSON documents.
//!
//! Paths address nested fields with `.`-separated segments, e.g.
//! `scripts.test` or `files.0`. A segment that meets an array is read as a
//! decimal index; anywhere else it is an object key.
//!
//! - [`delete_path`] removes the addressed leaf and stops silently at the
//!   first missing link.
//! - [`set_path`] writes the addressed leaf, creating (or overwriting) the
//!   intermediate containers it needs.
//!
//! Neither operation fails. Malformed paths are logged at debug level and
//! absorbed: a delete does nothing, a replace writes the raw path string as
//! a single top-level key. A replace whose array index lies more than
//! [`MAX_ARRAY_PADDING`] past the end of the array is skipped.
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use tarpatch::patch::JsonPatch;
//!
//! let mut manifest = json!({"name": "x", "scripts": {"test": "jest"}});
//!
//! JsonPatch::new()
//!     .remove("scripts")
//!     .replace("publishConfig.access", json!("public"))
//!     .apply(&mut manifest);
//!
//! assert_eq!(manifest, json!({"name": "x", "publishConfig": {"access": "public"}}));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Most `null` elements a replace may append to reach an array index.
pub const MAX_ARRAY_PADDING: usize = 1024;

/// A path that could not be used as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PathError {
    /// The path is the empty string.
    Empty,
    /// The path has a leading, trailing or doubled `.`.
    EmptySegment,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty path"),
            Self::EmptySegment => write!(f, "empty path segment"),
        }
    }
}

/// A parsed dotted path. Always holds at least one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DottedPath<'a> {
    segments: Vec<&'a str>,
}

impl<'a> DottedPath<'a> {
    pub(crate) fn parse(path: &'a str) -> Result<Self, PathError> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(PathError::EmptySegment);
        }
        Ok(Self { segments })
    }

    /// A single-segment path holding `path` verbatim.
    fn literal(path: &'a str) -> Self {
        Self {
            segments: vec![path],
        }
    }

    fn segments(&self) -> &[&'a str] {
        &self.segments
    }
}

/// Removes the value addressed by `path`.
///
/// Returns `true` if something was removed. Object keys are removed in
/// place so the order of the remaining keys is kept; array elements are
/// removed and the tail shifts down.
pub fn delete_path(root: &mut Value, path: &str) -> bool {
    let parsed = match DottedPath::parse(path) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::debug!("ignoring delete of '{}': {}", path, e);
            return false;
        }
    };

    let Some((last, parents)) = parsed.segments().split_last() else {
        return false;
    };

    let mut current = root;
    for segment in parents {
        current = match child_mut(current, segment) {
            Some(child) => child,
            None => return false,
        };
    }

    match current {
        Value::Object(map) => map.shift_remove(*last).is_some(),
        Value::Array(items) => match last.parse::<usize>() {
            Ok(index) if index < items.len() => {
                items.remove(index);
                true
            }
            _ => false,
        },
        _ => false,
    }
}

/// Writes `value` at `path`, creating missing containers.
///
/// Any scalar met on the way is replaced by an object. Array indices past
/// the end pad the array with `null`, up to [`MAX_ARRAY_PADDING`] elements;
/// an index further out leaves the document unchanged.
pub fn set_path(root: &mut Value, path: &str, value: Value) {
    let parsed = match DottedPath::parse(path) {
        Ok(parsed) => parsed,
        Err(PathError::Empty) => {
            log::debug!("ignoring replace with an empty path");
            return;
        }
        Err(e) => {
            log::debug!("replace path '{}' has {}, writing it as one key", path, e);
            DottedPath::literal(path)
        }
    };

    if let Some(index) = unreachable_index(root, &parsed) {
        log::debug!(
            "ignoring replace of '{}': array index {} is out of range",
            path,
            index
        );
        return;
    }

    let mut slot = root;
    for segment in parsed.segments() {
        slot = slot_for(slot, segment);
    }
    *slot = value;
}

/// Finds an array index on the path that would need too much padding.
///
/// Checked before anything is written, so a skipped replace leaves no
/// half-built containers behind. Containers the replace would create are
/// always objects, so only existing arrays can hold such an index.
fn unreachable_index(root: &Value, path: &DottedPath<'_>) -> Option<usize> {
    let mut current = Some(root);
    for segment in path.segments() {
        let value = current?;
        current = match value {
            Value::Array(items) => match segment.parse::<usize>() {
                Ok(index) if index.saturating_sub(items.len()) > MAX_ARRAY_PADDING => {
                    return Some(index);
                }
                Ok(index) => items.get(index),
                Err(_) => None,
            },
            Value::Object(map) => map.get(*segment),
            _ => None,
        };
    }
    None
}

/// Returns the value addressed by `path`, if present.
pub fn get_path<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    let parsed = DottedPath::parse(path).ok()?;
    let mut current = root;
    for segment in parsed.segments() {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn child_mut<'v>(value: &'v mut Value, segment: &str) -> Option<&'v mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |index| items.get_mut(index)),
        _ => None,
    }
}

/// Descends into `segment`, converting `value` into a container if needed.
fn slot_for<'v>(value: &'v mut Value, segment: &str) -> &'v mut Value {
    let index = match value {
        Value::Array(_) => segment.parse::<usize>().ok(),
        _ => None,
    };

    match (value, index) {
        (Value::Array(items), Some(index)) => {
            // `unreachable_index` has bounded `index` by the array length.
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            &mut items[index]
        }
        (slot, _) => {
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            // IndexMut on an object inserts a null slot for a missing key.
            &mut slot[segment]
        }
    }
}

/// Field deletions and replacements applied to one JSON document.
///
/// Removals run first, in order; replacements follow in declaration order,
/// so replacing a path that is also listed for removal re-creates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonPatch {
    /// Dotted paths to delete.
    pub remove: Vec<String>,
    /// Dotted path to replacement value, in declaration order.
    pub replace: Map<String, Value>,
}

impl JsonPatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a path to delete.
    pub fn remove(mut self, path: impl Into<String>) -> Self {
        self.remove.push(path.into());
        self
    }

    /// Adds a path to replace.
    ///
    /// Replacing the same path twice keeps the later value at the position
    /// of the first declaration.
    pub fn replace(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.replace.insert(path.into(), value.into());
        self
    }

    /// Returns whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.replace.is_empty()
    }

    /// Applies the patch to `document`.
    pub fn apply(&self, document: &mut Value) {
        for path in &self.remove {
            delete_path(document, path);
        }
        for (path, value) in &self.replace {
            set_path(document, path, value.clone());
        }
    }
}
