//! Error types for obra
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, missing site, validation, unknown entity)
//! - 3: Blocked by policy (not signed in, role lacks permission, finalized project)
//! - 4: Operation failed (storage, lock, provider request)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the obra CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const POLICY_BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for obra operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Not an obra site: {0}")]
    NotASite(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("Invitation not found: {0}")]
    InvitationNotFound(String),

    #[error("Material not found: {0}")]
    MaterialNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    // Policy blocks (exit code 3)
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Project is finalized: {0}")]
    ProjectFinalized(String),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Weather provider error: {0}")]
    Provider(#[from] reqwest::Error),

    #[error("Password hash error: {0}")]
    PasswordHash(String),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::NotASite(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::Validation(_)
            | Error::ProjectNotFound(_)
            | Error::TaskNotFound(_)
            | Error::MemberNotFound(_)
            | Error::InvitationNotFound(_)
            | Error::MaterialNotFound(_)
            | Error::UserNotFound(_) => exit_codes::USER_ERROR,

            // Policy blocks
            Error::NotAuthenticated
            | Error::InvalidCredentials
            | Error::Forbidden(_)
            | Error::ProjectFinalized(_) => exit_codes::POLICY_BLOCKED,

            // Operation failures
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::Provider(_)
            | Error::PasswordHash(_)
            | Error::LockFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }
}

/// Result type alias for obra operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
        }
    }
}
