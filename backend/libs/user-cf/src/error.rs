use thiserror::Error;

pub type Result<T> = std::result::Result<T, CfError>;

/// Failures raised by the similarity and prediction engines.
///
/// Every variant is a precondition failure: the computation is deterministic,
/// so none of them is worth retrying.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CfError {
    #[error("Shape mismatch: {context} has {found} columns, expected {expected}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid rating for user index {user} at item {item}: {value}")]
    InvalidRating { user: usize, item: usize, value: f64 },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Degenerate variance between user {a} and user {b}")]
    DegenerateVariance { a: usize, b: usize },

    #[error("Invalid neighbor count: requested {requested}, available {available}")]
    InvalidNeighborCount { requested: usize, available: usize },

    #[error("Invalid request size: requested {requested}, available {available}")]
    InvalidRequestSize { requested: usize, available: usize },

    #[error("Unknown user index {index} (matrix has {user_count} users)")]
    UnknownUser { index: usize, user_count: usize },
}
