//! Workflow execution context and path resolution
//!
//! The context is the single mutable state of a workflow run. Extracted fields
//! are flattened into its root; every step may read any key and write new ones.
//!
//! Paths are dotted and support array access in two forms:
//! - `items[0].name` - bracket index
//! - `items.0.name` - bare numeric segment

use serde_json::{Map, Value};

use super::document::SourceDocument;
use super::error::WorkflowError;
use super::template;

/// Prefix stripped from paths, since extracted fields live at the context root
pub const EXTRACTED_DATA_PREFIX: &str = "extractedData.";

/// Key holding the whole extracted data object
pub const EXTRACTED_DATA_KEY: &str = "extractedData";

/// A single token of a parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathToken {
    /// Object key, or array index when the segment is numeric
    Key(String),
    /// Bracket index, e.g. `[2]`
    Index(usize),
}

/// Split a dotted path into tokens.
///
/// `a.b[0][1].c` becomes `[Key(a), Key(b), Index(0), Index(1), Key(c)]`.
/// Bracket contents that are not numbers are treated as quoted keys.
pub fn parse_path(path: &str) -> Vec<PathToken> {
    let mut tokens = Vec::new();

    for segment in path.split('.') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let (name, mut rest) = match segment.find('[') {
            Some(pos) => (&segment[..pos], &segment[pos..]),
            None => (segment, ""),
        };

        if !name.is_empty() {
            tokens.push(PathToken::Key(name.to_string()));
        }

        while let Some(stripped) = rest.strip_prefix('[') {
            let Some(end) = stripped.find(']') else {
                // Unterminated bracket, keep the remainder as a literal key
                tokens.push(PathToken::Key(rest.to_string()));
                break;
            };

            let inner = stripped[..end].trim();
            match inner.parse::<usize>() {
                Ok(index) => tokens.push(PathToken::Index(index)),
                Err(_) => tokens.push(PathToken::Key(
                    inner.trim_matches(|c| c == '"' || c == '\'').to_string(),
                )),
            }

            rest = &stripped[end + 1..];
        }
    }

    tokens
}

/// Walk `tokens` from `start`, returning `None` at the first missing segment
fn walk<'a>(start: &'a Value, tokens: &[PathToken]) -> Option<&'a Value> {
    let mut current = start;

    for token in tokens {
        current = match (token, current) {
            (PathToken::Key(key), Value::Object(obj)) => obj.get(key)?,
            (PathToken::Key(key), Value::Array(arr)) => arr.get(key.parse::<usize>().ok()?)?,
            (PathToken::Index(index), Value::Array(arr)) => arr.get(*index)?,
            (PathToken::Index(index), Value::Object(obj)) => obj.get(&index.to_string())?,
            _ => return None,
        };
    }

    Some(current)
}

/// Resolve a path against any JSON value.
///
/// Never fails: a missing or mistyped segment yields `None`.
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    let path = path.strip_prefix(EXTRACTED_DATA_PREFIX).unwrap_or(path);
    let tokens = parse_path(path);

    if tokens.is_empty() {
        return None;
    }

    walk(value, &tokens)
}

/// Write `new_value` at `path` inside `target`, creating intermediate objects.
///
/// Scalars found on the way are replaced by containers. An array index may
/// address an existing slot or the slot right after the last one; anything
/// further out is a validation error. Containers created before the failing
/// index are kept.
pub fn set_path(target: &mut Value, path: &str, new_value: Value) -> Result<(), WorkflowError> {
    let tokens = parse_path(path);
    let Some((last, parents)) = tokens.split_last() else {
        return Ok(());
    };

    let mut current = target;
    for token in parents {
        current = child_mut(current, token)?;
    }

    *child_mut(current, last)? = new_value;
    Ok(())
}

fn child_mut<'a>(current: &'a mut Value, token: &PathToken) -> Result<&'a mut Value, WorkflowError> {
    let key = match token {
        PathToken::Key(key) => {
            if current.is_array() {
                if let Ok(index) = key.parse::<usize>() {
                    return array_slot(current, index);
                }
            }
            key.clone()
        }
        PathToken::Index(index) => {
            if !current.is_object() {
                return array_slot(current, *index);
            }
            index.to_string()
        }
    };

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }

    match current {
        Value::Object(obj) => Ok(obj.entry(key).or_insert(Value::Null)),
        _ => unreachable!("value was just replaced by an object"),
    }
}

fn array_slot(current: &mut Value, index: usize) -> Result<&mut Value, WorkflowError> {
    if !current.is_array() {
        *current = Value::Array(Vec::new());
    }

    match current {
        Value::Array(arr) => {
            if index > arr.len() {
                return Err(WorkflowError::validation(format!(
                    "Array index {} is out of range for an array of length {}",
                    index,
                    arr.len()
                )));
            }
            if index == arr.len() {
                arr.push(Value::Null);
            }
            Ok(&mut arr[index])
        }
        _ => unreachable!("value was just replaced by an array"),
    }
}

/// Mutable state of one workflow run
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Context root; always a JSON object
    root: Value,

    /// Document being processed
    document: SourceDocument,

    /// Parsed body of the most recent API step
    last_api_response: Option<Value>,
}

impl ExecutionContext {
    /// Create a context from extracted fields
    pub fn new(values: Map<String, Value>) -> Self {
        Self {
            root: Value::Object(values),
            document: SourceDocument::default(),
            last_api_response: None,
        }
    }

    /// Create a context from a JSON value; non-objects are stored under `extractedData`
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::new(map),
            other => {
                let mut map = Map::new();
                map.insert(EXTRACTED_DATA_KEY.to_string(), other);
                Self::new(map)
            }
        }
    }

    pub fn with_document(mut self, document: SourceDocument) -> Self {
        self.document = document;
        self
    }

    pub fn document(&self) -> &SourceDocument {
        &self.document
    }

    /// Context root as a JSON object
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Owned copy of the context root, used for log snapshots
    pub fn snapshot(&self) -> Value {
        self.root.clone()
    }

    /// Get a top-level key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Set a top-level key
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        if let Value::Object(obj) = &mut self.root {
            obj.insert(key.into(), value);
        }
    }

    /// Resolve a dotted path against the context.
    ///
    /// `extractedData` alone refers to the `extractedData` key when it exists,
    /// otherwise to the whole root.
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        if path.trim() == EXTRACTED_DATA_KEY {
            return Some(self.extracted_data());
        }
        resolve_path(&self.root, path)
    }

    /// Write a value at a dotted path, creating intermediate objects
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<(), WorkflowError> {
        let path = path.trim();
        let path = path.strip_prefix(EXTRACTED_DATA_PREFIX).unwrap_or(path);
        set_path(&mut self.root, path, value)
    }

    /// The extracted data value
    pub fn extracted_data(&self) -> &Value {
        self.root.get(EXTRACTED_DATA_KEY).unwrap_or(&self.root)
    }

    pub fn last_api_response(&self) -> Option<&Value> {
        self.last_api_response.as_ref()
    }

    pub fn set_last_api_response(&mut self, response: Value) {
        self.last_api_response = Some(response);
    }

    /// Replace `{{path}}` tokens; unresolved tokens are kept
    pub fn substitute(&self, template: &str) -> String {
        template::substitute(template, self)
    }

    /// Replace `{var}` and `${var}` tokens; unresolved tokens are kept
    pub fn substitute_path_variables(&self, template: &str) -> String {
        template::substitute_path_variables(template, self)
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(Map::new())
    }
}
