//! Configuration file formats and per-file decoding.

use crate::error::DecodeError;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// File format used to decode each candidate file.
///
/// The format doubles as the file extension: a loader named `myapp` with
/// `Format::Json` looks for `myapp.json` in every search path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Yaml,
    /// A format with no built-in decoder. Setting it is allowed; decoding
    /// with it always fails with `invalid format`.
    Other(String),
}

impl Format {
    /// File extension for this format, without the leading dot.
    pub fn extension(&self) -> &str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Other(ext) => ext,
        }
    }

    /// Decode raw file content into a key-value tree.
    ///
    /// Returns `Ok(None)` when the document is `null` (e.g. an empty YAML
    /// file), which contributes nothing to the merge. A document whose root
    /// is not a mapping is rejected.
    pub fn decode(&self, bytes: &[u8]) -> Result<Option<Map<String, Value>>, DecodeError> {
        let value: Value = match self {
            Format::Json => serde_json::from_slice(bytes)?,
            Format::Yaml => serde_yaml::from_slice(bytes)?,
            Format::Other(_) => return Err(DecodeError::InvalidFormat(self.clone())),
        };

        match value {
            Value::Object(map) => Ok(Some(map)),
            Value::Null => Ok(None),
            _ => Err(DecodeError::NotAnObject),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl From<&str> for Format {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Format::Json,
            "yaml" | "yml" => Format::Yaml,
            _ => Format::Other(s.to_string()),
        }
    }
}

impl From<String> for Format {
    fn from(s: String) -> Self {
        Format::from(s.as_str())
    }
}

impl FromStr for Format {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Format::from(s))
    }
}
