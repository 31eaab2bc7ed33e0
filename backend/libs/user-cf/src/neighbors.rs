use crate::error::{CfError, Result};
use crate::models::Neighbor;
use crate::similarity::SimilarityRow;
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Select the `n` users most similar to `target`.
///
/// The target's own slot, pairs with an undefined similarity and non-finite
/// scores are never candidates. Ordering is by similarity descending, ties by index ascending,
/// so the result does not depend on how the row was produced.
///
/// `n` must lie in `1..=row.len() - 1`. When undefined pairs leave fewer than
/// `n` candidates the shorter list is returned.
pub fn top_neighbors(target: usize, n: usize, row: &SimilarityRow) -> Result<Vec<Neighbor>> {
    let user_count = row.len();
    if target >= user_count {
        return Err(CfError::UnknownUser {
            index: target,
            user_count,
        });
    }

    let available = user_count - 1;
    if n == 0 || n > available {
        return Err(CfError::InvalidNeighborCount {
            requested: n,
            available,
        });
    }

    let mut candidates: Vec<Neighbor> = row
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != target)
        .filter_map(|(index, cell)| {
            cell.score()
                .filter(|s| s.is_finite())
                .map(|similarity| Neighbor { index, similarity })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.index.cmp(&b.index))
    });

    if candidates.len() < n {
        warn!(
            target_index = target,
            requested = n,
            defined = candidates.len(),
            "Fewer neighbors with a defined similarity than requested"
        );
    }

    candidates.truncate(n);

    debug!(
        target_index = target,
        neighbors = candidates.len(),
        "Top neighbors selected"
    );

    Ok(candidates)
}
