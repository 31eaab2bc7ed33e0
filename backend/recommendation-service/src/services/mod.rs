//! Recommendation pipeline
//!
//! load → similarity → neighbors → predict (per mode) → rank
//!
//! Pure batch computation: any error aborts the run and nothing is retried.

pub mod report;

pub use report::{ModeRecommendations, NeighborEntry, RankedItem, RecommendationReport};

use crate::error::{AppError, Result};
use crate::loader::RatingSource;
use tracing::info;
use user_cf::{
    compute_similarities, predict, rank_predictions, top_neighbors, CfError, Execution,
    ItemCatalog, PredictedItem, PredictionMode, RatingMatrix,
};

/// Who to recommend for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetUser {
    /// Position in the rating matrix
    Index(usize),
    /// Stable user id from the source
    Id(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRequest {
    pub target: TargetUser,
    pub neighbor_count: usize,
    pub top_items: usize,
    pub modes: Vec<PredictionMode>,
    pub execution: Execution,
}

pub struct RecommendationPipeline<S: RatingSource> {
    source: S,
}

impl<S: RatingSource> RecommendationPipeline<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn run(&self, request: &RecommendationRequest) -> Result<RecommendationReport> {
        let (matrix, catalog) = self.source.load()?;
        matrix.ensure_catalog(&catalog)?;

        info!(
            source = %self.source.describe(),
            user_count = matrix.user_count(),
            item_count = matrix.item_count(),
            "Ratings ready"
        );

        recommend(&matrix, &catalog, request)
    }
}

/// Run the similarity and prediction stages over an in-memory matrix
pub fn recommend(
    matrix: &RatingMatrix,
    catalog: &ItemCatalog,
    request: &RecommendationRequest,
) -> Result<RecommendationReport> {
    matrix.ensure_catalog(catalog)?;
    let target = resolve_target(matrix, request.target)?;
    let target_user = matrix.user(target)?;

    let model = compute_similarities(matrix, request.execution)?;
    let row = model.row(target)?;
    let neighbors = top_neighbors(target, request.neighbor_count, row)?;

    info!(
        target_user_id = target_user.id(),
        target_index = target,
        neighbors = neighbors.len(),
        "Neighbors selected"
    );

    let neighbor_entries = neighbors
        .iter()
        .map(|n| {
            Ok(NeighborEntry {
                index: n.index,
                user_id: matrix.user(n.index)?.id(),
                similarity: n.similarity,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut recommendations = Vec::with_capacity(request.modes.len());
    for &mode in &request.modes {
        let predictions = predict(target, &neighbors, matrix, model.averages(), mode)?;
        let ranked = rank_predictions(&predictions, request.top_items)?;

        let items = ranked_items(&ranked, catalog)?;

        info!(
            mode = %mode,
            predictable_items = predictions.len(),
            returned = items.len(),
            "Items ranked"
        );

        recommendations.push(ModeRecommendations {
            mode,
            predictable_items: predictions.len(),
            items,
        });
    }

    Ok(RecommendationReport {
        target_user_id: target_user.id(),
        target_index: target,
        target_average: model.average(target)?,
        user_count: matrix.user_count(),
        item_count: matrix.item_count(),
        similarities: row.scores(),
        neighbors: neighbor_entries,
        recommendations,
    })
}

fn ranked_items(ranked: &[PredictedItem], catalog: &ItemCatalog) -> Result<Vec<RankedItem>> {
    ranked
        .iter()
        .map(|p| {
            let name = catalog.name(p.item).ok_or_else(|| CfError::ShapeMismatch {
                context: "item catalog".to_string(),
                expected: p.item + 1,
                found: catalog.len(),
            })?;
            Ok(RankedItem {
                item_index: p.item,
                name: name.to_string(),
                score: p.score,
            })
        })
        .collect()
}

fn resolve_target(matrix: &RatingMatrix, target: TargetUser) -> Result<usize> {
    match target {
        TargetUser::Index(index) if index < matrix.user_count() => Ok(index),
        TargetUser::Index(index) => Err(AppError::TargetNotFound(format!(
            "index {} (matrix has {} users)",
            index,
            matrix.user_count()
        ))),
        TargetUser::Id(id) => matrix
            .index_of(id)
            .ok_or_else(|| AppError::TargetNotFound(format!("user id {}", id))),
    }
}
