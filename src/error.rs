use std::path::PathBuf;

use thiserror::Error;

/// Structural defect found while following constant pool references or
/// decoding bytecode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("unexpected end of data at offset {offset}")]
    Truncated { offset: usize },

    #[error("constant pool index {index} is not a {expected}")]
    BadConstant { index: u16, expected: &'static str },

    #[error("unknown opcode 0x{opcode:02x} at bytecode offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("invalid switch range at bytecode offset {offset}")]
    BadSwitch { offset: usize },
}

/// A compiled unit that could not be turned into a structural model.
///
/// Load failures are scoped to one unit; callers record them and move on.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {unit}: {source}")]
    Io {
        unit: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid archive {unit}: {source}")]
    Archive {
        unit: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("invalid class file {unit}: {reason}")]
    Rejected { unit: String, reason: String },

    #[error("malformed class file {unit}: {source}")]
    Malformed {
        unit: String,
        #[source]
        source: FormatError,
    },
}

impl LoadError {
    /// Name of the unit (path or `jar:` URI) that failed.
    pub fn unit(&self) -> &str {
        match self {
            LoadError::Io { unit, .. }
            | LoadError::Archive { unit, .. }
            | LoadError::Rejected { unit, .. }
            | LoadError::Malformed { unit, .. } => unit,
        }
    }
}

/// Threshold or configuration-file problem, raised when the value is set.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be positive, got {value}")]
    NonPositive { key: &'static str, value: u32 },

    #[error("warning threshold ({warning}) must be less than error threshold ({error})")]
    WarningNotBelowError { warning: u32, error: u32 },

    #[error("invalid secret pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
