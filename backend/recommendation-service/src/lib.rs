pub mod config;
pub mod error;
pub mod loader;
pub mod services;

pub use config::{Config, LogFormat, OutputFormat};
pub use error::{AppError, Result};
pub use loader::{CsvRatingSource, RatingSource};
pub use services::{RecommendationPipeline, RecommendationReport, RecommendationRequest, TargetUser};
