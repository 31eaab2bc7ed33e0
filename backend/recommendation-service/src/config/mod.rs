use crate::error::{AppError, Result};
use crate::services::{RecommendationRequest, TargetUser};
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use user_cf::{Execution, PredictionMode};
use validator::Validate;

/// Prefix shared by every environment variable this service reads
pub const ENV_PREFIX: &str = "RECOMMENDER_";

/// Report rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "plain" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Log line format for tracing-subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Unknown log format: {}", other)),
        }
    }
}

/// Raw environment values, `RECOMMENDER_` prefix stripped
#[derive(Debug, Clone, Deserialize, Validate)]
struct EnvConfig {
    #[serde(default = "default_ratings_path")]
    #[validate(length(min = 1))]
    ratings_path: String,

    #[serde(default = "default_target_user_index")]
    target_user_index: usize,

    #[serde(default)]
    target_user_id: Option<i64>,

    #[serde(default = "default_neighbor_count")]
    #[validate(range(min = 1))]
    neighbor_count: usize,

    #[serde(default = "default_top_items")]
    #[validate(range(min = 1))]
    top_items: usize,

    #[serde(default = "default_prediction_modes")]
    prediction_modes: String,

    #[serde(default)]
    parallel: bool,

    #[serde(default = "default_format")]
    output_format: String,

    #[serde(default = "default_format")]
    log_format: String,
}

fn default_ratings_path() -> String {
    "data/user-movie.csv".to_string()
}

fn default_target_user_index() -> usize {
    4
}

fn default_neighbor_count() -> usize {
    5
}

fn default_top_items() -> usize {
    6
}

fn default_prediction_modes() -> String {
    "raw,normalized".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

/// Batch runner configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub ratings_path: PathBuf,
    pub target: TargetUser,
    pub neighbor_count: usize,
    pub top_items: usize,
    pub prediction_modes: Vec<PredictionMode>,
    pub execution: Execution,
    pub output_format: OutputFormat,
    pub log_format: LogFormat,
}

impl Config {
    /// Load from the process environment (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let raw: EnvConfig = envy::prefixed(ENV_PREFIX).from_env()?;
        Self::from_raw(raw)
    }

    /// Load from explicit key/value pairs; keys carry the `RECOMMENDER_` prefix
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let raw: EnvConfig = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: EnvConfig) -> Result<Self> {
        raw.validate()?;

        let prediction_modes = parse_modes(&raw.prediction_modes)?;
        let output_format = raw.output_format.parse().map_err(AppError::Config)?;
        let log_format = raw.log_format.parse().map_err(AppError::Config)?;

        let target = match raw.target_user_id {
            Some(id) => TargetUser::Id(id),
            None => TargetUser::Index(raw.target_user_index),
        };

        let execution = if raw.parallel {
            Execution::Parallel
        } else {
            Execution::Sequential
        };

        Ok(Self {
            ratings_path: PathBuf::from(raw.ratings_path),
            target,
            neighbor_count: raw.neighbor_count,
            top_items: raw.top_items,
            prediction_modes,
            execution,
            output_format,
            log_format,
        })
    }

    pub fn request(&self) -> RecommendationRequest {
        RecommendationRequest {
            target: self.target,
            neighbor_count: self.neighbor_count,
            top_items: self.top_items,
            modes: self.prediction_modes.clone(),
            execution: self.execution,
        }
    }
}

/// Comma separated modes, duplicates dropped, order kept
fn parse_modes(value: &str) -> Result<Vec<PredictionMode>> {
    let mut modes = Vec::new();
    for part in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let mode: PredictionMode = part.parse().map_err(AppError::Config)?;
        if !modes.contains(&mode) {
            modes.push(mode);
        }
    }

    if modes.is_empty() {
        return Err(AppError::Config(
            "PREDICTION_MODES must name at least one mode".to_string(),
        ));
    }

    Ok(modes)
}
