//! Error types for configuration resolution.
//!
//! Every stage wraps its cause with a short stage tag, so a failure renders as
//! a chain such as `read in: decode: invalid format`.

use crate::config::Format;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a resolution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A candidate file exists but could not be opened.
    Open,
    /// A candidate file could not be read or decoded, or the format is unknown.
    Decode,
    /// The merged tree does not fit the target type.
    StructuralDecode,
    /// An environment override could not be applied to the target.
    EnvBinding,
}

/// Top-level error returned by [`ConfigLoader::read_in`](crate::config::ConfigLoader::read_in).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read in: {0}")]
    ReadIn(#[from] ReadError),

    #[error("structural decode: {0}")]
    StructuralDecode(#[source] serde_json::Error),

    #[error("env binding: {0}")]
    Env(#[from] EnvError),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::ReadIn(ReadError::Open { .. }) => ErrorKind::Open,
            ConfigError::ReadIn(ReadError::Decode { .. }) => ErrorKind::Decode,
            ConfigError::StructuralDecode(_) => ErrorKind::StructuralDecode,
            ConfigError::Env(_) => ErrorKind::EnvBinding,
        }
    }
}

/// Failure while loading a single candidate file.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("open: {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("decode: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
}

/// Failure decoding raw file content.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid format")]
    InvalidFormat(Format),

    #[error("document root is not a mapping")]
    NotAnObject,

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failure applying environment overrides.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The target's current values could not be serialized.
    #[error("capturing current values: {0}")]
    Capture(#[source] serde_json::Error),

    /// A variable could not be parsed into its field's type.
    #[error("{0}")]
    Assign(#[source] serde_json::Error),
}

/// Result type for configuration operations.
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_format_message_chain() {
        let err = ConfigError::from(ReadError::Decode {
            path: PathBuf::from("./test.properties"),
            source: DecodeError::InvalidFormat(Format::from("properties")),
        });
        assert_eq!(err.to_string(), "read in: decode: invalid format");
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_open_error_names_path() {
        let err = ConfigError::from(ReadError::Open {
            path: PathBuf::from("/etc/app/app.json"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        });
        assert_eq!(
            err.to_string(),
            "read in: open: /etc/app/app.json: permission denied"
        );
        assert_eq!(err.kind(), ErrorKind::Open);
    }

    #[test]
    fn test_env_error_kind() {
        let cause = <serde_json::Error as serde::de::Error>::custom(
            "assigning APP_PORT: converting 'abc' to u16",
        );
        let err = ConfigError::from(EnvError::Assign(cause));
        assert_eq!(
            err.to_string(),
            "env binding: assigning APP_PORT: converting 'abc' to u16"
        );
        assert_eq!(err.kind(), ErrorKind::EnvBinding);
    }

    #[test]
    fn test_structural_decode_kind() {
        let cause = serde_json::from_str::<u16>("\"high\"").unwrap_err();
        let err = ConfigError::StructuralDecode(cause);
        assert!(err.to_string().starts_with("structural decode: "));
        assert_eq!(err.kind(), ErrorKind::StructuralDecode);
    }
}
