// ============================================
// Neighbor-weighted rating prediction
// ============================================
//
// For each item i, over the selected neighbors that rated i:
//
//   Raw:        pred_i = Σ (r_n,i × sim_n) / Σ sim_n
//   Normalized: pred_i = avg(target) + Σ ((r_n,i − avg(n)) × sim_n) / Σ sim_n
//
// Both modes share one accumulation loop; the mode only supplies the
// per-neighbor contribution and the baseline added at the end.

use crate::error::{CfError, Result};
use crate::models::{ItemCatalog, Neighbor, PredictedItem, RatingMatrix};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Neighbor weights summing closer to zero than this leave the item unpredictable
pub const MIN_WEIGHT_SUM: f64 = 1e-9;

/// Prediction variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionMode {
    /// Similarity-weighted average of the neighbors' ratings
    Raw,
    /// Weighted average of the neighbors' deviations from their own mean,
    /// shifted onto the target's mean
    Normalized,
}

impl PredictionMode {
    fn contribution(self, rating: f64, neighbor_average: f64) -> f64 {
        match self {
            PredictionMode::Raw => rating,
            PredictionMode::Normalized => rating - neighbor_average,
        }
    }

    fn baseline(self, target_average: f64) -> f64 {
        match self {
            PredictionMode::Raw => 0.0,
            PredictionMode::Normalized => target_average,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionMode::Raw => "raw",
            PredictionMode::Normalized => "normalized",
        }
    }
}

impl fmt::Display for PredictionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredictionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw" | "not-normalized" | "plain" => Ok(PredictionMode::Raw),
            "normalized" | "norm" | "mean-centered" => Ok(PredictionMode::Normalized),
            other => Err(format!("Unknown prediction mode: {}", other)),
        }
    }
}

/// Predict the target's rating for every item at least one neighbor rated.
///
/// Items no neighbor rated are not predictable and are left out, as are
/// items whose neighbor weights sum to less than [`MIN_WEIGHT_SUM`] in
/// magnitude. Neighbors with a non-finite similarity are ignored and a
/// non-finite result is never emitted. Negative similarities are applied
/// as-is. Output follows catalog order.
pub fn predict(
    target: usize,
    neighbors: &[Neighbor],
    matrix: &RatingMatrix,
    averages: &[f64],
    mode: PredictionMode,
) -> Result<Vec<PredictedItem>> {
    matrix.user(target)?;
    if averages.len() != matrix.user_count() {
        return Err(CfError::ShapeMismatch {
            context: "average ratings".to_string(),
            expected: matrix.user_count(),
            found: averages.len(),
        });
    }
    for neighbor in neighbors {
        matrix.user(neighbor.index)?;
    }

    let users = matrix.users();
    let baseline = mode.baseline(averages[target]);
    let mut predictions = Vec::with_capacity(matrix.item_count());
    let mut dropped = 0usize;

    for item in 0..matrix.item_count() {
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        let mut contributors = 0usize;

        for neighbor in neighbors.iter().filter(|n| n.similarity.is_finite()) {
            if let Some(rating) = users[neighbor.index].rating(item) {
                numerator += mode.contribution(rating, averages[neighbor.index]) * neighbor.similarity;
                denominator += neighbor.similarity;
                contributors += 1;
            }
        }

        if contributors == 0 {
            continue;
        }
        let score = baseline + numerator / denominator;
        if denominator.abs() < MIN_WEIGHT_SUM || !score.is_finite() {
            dropped += 1;
            continue;
        }

        predictions.push(PredictedItem { item, score });
    }

    debug!(
        target_index = target,
        mode = %mode,
        predictable = predictions.len(),
        dropped,
        item_count = matrix.item_count(),
        "Predictions computed"
    );

    Ok(predictions)
}

/// Sort predictions by score descending (ties by item index) and keep `n`
pub fn rank_predictions(predictions: &[PredictedItem], n: usize) -> Result<Vec<PredictedItem>> {
    if n > predictions.len() {
        return Err(CfError::InvalidRequestSize {
            requested: n,
            available: predictions.len(),
        });
    }

    let mut ranked = predictions.to_vec();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.item.cmp(&b.item))
    });
    ranked.truncate(n);

    Ok(ranked)
}

/// Names of the `n` best predicted items
pub fn top_items(predictions: &[PredictedItem], n: usize, catalog: &ItemCatalog) -> Result<Vec<String>> {
    let ranked = rank_predictions(predictions, n)?;

    let names = ranked
        .iter()
        .map(|p| {
            catalog
                .name(p.item)
                .map(str::to_string)
                .ok_or_else(|| CfError::ShapeMismatch {
                    context: "item catalog".to_string(),
                    expected: p.item + 1,
                    found: catalog.len(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(requested = n, returned = names.len(), "Top items ranked");

    Ok(names)
}
