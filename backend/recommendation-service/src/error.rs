use thiserror::Error;
use user_cf::CfError;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Source unreadable ({source_name}): {message}")]
    SourceUnreadable { source_name: String, message: String },

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Target user not found: {0}")]
    TargetNotFound(String),

    #[error("Recommendation engine error: {0}")]
    Engine(#[from] CfError),

    #[error("Output error: {0}")]
    Output(String),
}

impl AppError {
    /// Process exit code for the batch runner (sysexits.h values)
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::SourceUnreadable { .. } => 66,
            AppError::MalformedRow { .. } | AppError::Engine(_) => 65,
            AppError::TargetNotFound(_) => 64,
            AppError::Config(_) => 78,
            AppError::Output(_) => 74,
        }
    }
}

impl From<envy::Error> for AppError {
    fn from(err: envy::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Output(err.to_string())
    }
}
