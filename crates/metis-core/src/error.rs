use thiserror::Error;

use crate::models::EntryId;

/// All errors that can occur in metis-core.
#[derive(Debug, Error)]
pub enum MetisError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Entry not found: {0}")]
    NotFound(EntryId),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid snapshot: {0}")]
    Snapshot(String),

    #[error("No entry ids left")]
    IdsExhausted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl MetisError {
    /// Process exit code a front end should use for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::NotFound(_) => ExitCode::NotFound,
            Self::Validation(_) | Self::UnknownField(_) => ExitCode::InvalidArgs,
            Self::Duplicate(_) => ExitCode::Conflict,
            Self::Snapshot(_) | Self::Io(_) | Self::Json(_) => ExitCode::FileSystemError,
            Self::IdsExhausted | Self::TomlParse(_) | Self::TomlSerialize(_) => {
                ExitCode::GeneralError
            }
        }
    }
}

/// Exit codes shared by the command-line front end.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
    FileSystemError = 4,
    Conflict = 7,
    ConfirmRequired = 8,
}

pub type Result<T> = std::result::Result<T, MetisError>;
