// ============================================
// Rating matrix loader
// ============================================
//
// CSV layout:
//
//   user,Alien,Brazil,Casablanca      <- header: id column label, then item names
//   1,5,3,                            <- user id, then one rating per item
//   2,4,0,2                              (empty cell or 0 = not rated)
//
// Every data row must have exactly as many columns as the header.

use crate::error::{AppError, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use tracing::{info, warn};
use user_cf::{ItemCatalog, RatingMatrix, User};

/// Anything that can produce a rating matrix and its item catalog
pub trait RatingSource {
    /// Human readable origin, used in logs and error messages
    fn describe(&self) -> String;

    fn load(&self) -> Result<(RatingMatrix, ItemCatalog)>;
}

/// Ratings stored in a CSV file on disk
#[derive(Debug, Clone)]
pub struct CsvRatingSource {
    path: PathBuf,
}

impl CsvRatingSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RatingSource for CsvRatingSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<(RatingMatrix, ItemCatalog)> {
        let file = File::open(&self.path).map_err(|e| AppError::SourceUnreadable {
            source_name: self.describe(),
            message: e.to_string(),
        })?;

        parse_ratings(&self.describe(), file)
    }
}

/// Parse a ratings CSV from any reader
pub fn parse_ratings<R: Read>(source_name: &str, reader: R) -> Result<(RatingMatrix, ItemCatalog)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| csv_error(source_name, e))?
        .clone();

    if headers.len() < 2 {
        return Err(AppError::MalformedRow {
            line: 1,
            reason: "header needs a user id column and at least one item column".to_string(),
        });
    }

    let catalog: ItemCatalog = headers.iter().skip(1).collect();
    let mut users = Vec::new();
    let mut seen_ids = HashSet::new();

    for record in csv_reader.records() {
        let record = record.map_err(|e| csv_error(source_name, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() != headers.len() {
            return Err(AppError::MalformedRow {
                line,
                reason: format!(
                    "expected {} columns, found {}",
                    headers.len(),
                    record.len()
                ),
            });
        }

        let id: i64 = record[0].parse().map_err(|_| AppError::MalformedRow {
            line,
            reason: format!("invalid user id '{}'", &record[0]),
        })?;

        if !seen_ids.insert(id) {
            warn!(user_id = id, line, "Duplicate user id in ratings source");
        }

        let ratings = record
            .iter()
            .skip(1)
            .zip(catalog.names())
            .map(|(cell, item)| parse_rating(cell, item, line))
            .collect::<Result<Vec<_>>>()?;

        users.push(User::new(id, ratings));
    }

    let matrix = RatingMatrix::with_catalog(users, &catalog)?;

    info!(
        source = source_name,
        user_count = matrix.user_count(),
        item_count = catalog.len(),
        "Rating matrix loaded"
    );

    Ok((matrix, catalog))
}

fn parse_rating(cell: &str, item: &str, line: u64) -> Result<Option<f64>> {
    if cell.is_empty() {
        return Ok(None);
    }

    let value: f64 = cell.parse().map_err(|_| AppError::MalformedRow {
        line,
        reason: format!("invalid rating '{}' for item '{}'", cell, item),
    })?;

    if !value.is_finite() {
        return Err(AppError::MalformedRow {
            line,
            reason: format!("non-finite rating '{}' for item '{}'", cell, item),
        });
    }

    Ok(if value == 0.0 { None } else { Some(value) })
}

fn csv_error(source_name: &str, err: csv::Error) -> AppError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    match err.kind() {
        csv::ErrorKind::Io(_) => AppError::SourceUnreadable {
            source_name: source_name.to_string(),
            message: err.to_string(),
        },
        _ => AppError::MalformedRow {
            line,
            reason: err.to_string(),
        },
    }
}
