//! Data values passed into and produced by processes

use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use serde_json::json;

use crate::error::{Result, ShellfnError};

/// Outputs of a process, keyed by link name
pub type Outputs = BTreeMap<String, Value>;

/// A data value bound to an input slot or attached as an output.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit "no value", distinct from an absent input
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    File(FileContent),
}

impl Value {
    /// Build a list of string values
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(|s| Value::Str(s.into())).collect())
    }

    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::File(_) => "file",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_file(&self) -> Option<&FileContent> {
        match self {
            Value::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the value as a list of strings, if every element is a string
    pub fn as_str_list(&self) -> Option<Vec<&str>> {
        match self {
            Value::List(items) => items.iter().map(Value::as_str).collect(),
            _ => None,
        }
    }

    /// JSON description of the value for record summaries. File content is summarized.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::None => serde_json::Value::Null,
            Value::Bool(b) => json!(b),
            Value::Int(i) => json!(i),
            Value::Float(f) => json!(f),
            Value::Str(s) => json!(s),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::File(file) => json!({
                "filename": file.filename(),
                "size": file.len(),
            }),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<FileContent> for Value {
    fn from(value: FileContent) -> Self {
        Value::File(value)
    }
}

/// Single file content, optionally with the filename it is staged under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    filename: Option<String>,
    content: Vec<u8>,
}

impl FileContent {
    /// Filename used when content is created without one
    pub const DEFAULT_FILENAME: &'static str = "file.txt";

    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: Some(filename.into()),
            content: content.into(),
        }
    }

    /// Create content without a filename of its own
    pub fn from_bytes(content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: None,
            content: content.into(),
        }
    }

    /// Read a file from disk, keeping its file name
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ShellfnError::InvalidInputs(format!("path `{}` has no file name", path.display()))
            })?;
        let content = fs::read(path)?;
        Ok(Self::new(filename, content))
    }

    /// Filename, or [`FileContent::DEFAULT_FILENAME`] when none was given
    pub fn filename(&self) -> &str {
        self.filename.as_deref().unwrap_or(Self::DEFAULT_FILENAME)
    }

    /// Filename given at creation, if any
    pub fn declared_filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Readable byte stream over the content
    pub fn open(&self) -> impl Read + '_ {
        Cursor::new(self.content.as_slice())
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Content decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
