// ============================================
// Pearson Similarity Engine
// ============================================
//
// For every ordered user pair (A, B), restricted to the items both rated:
//
//   sim(A, B) = Σ (A_i − avg(A)) (B_i − avg(B))
//               ─────────────────────────────────────────────
//               sqrt(Σ (A_i − avg(A))²) · sqrt(Σ (B_i − avg(B))²)
//
// avg(U) is taken over all of U's rated items, not just the co-rated ones.
// The matrix is preallocated row by row and each row is filled by exactly
// one computation, so rows can be produced in parallel without locking.

use crate::error::{CfError, Result};
use crate::models::RatingMatrix;
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Similarity between two users
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Similarity {
    /// Pearson coefficient, stored as computed (no clamping)
    Score(f64),
    /// The pair shares no rated item
    NoCoRatedItems,
    /// One side's co-rated ratings all sit on its mean
    ZeroVariance,
    /// Deviations too large for the sums to stay finite in `f64`
    NonFinite,
}

impl Similarity {
    pub fn score(&self) -> Option<f64> {
        match self {
            Similarity::Score(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Similarity::Score(_))
    }

    /// Convert to a score, surfacing undefined pairs as errors
    pub fn into_result(self, a: usize, b: usize) -> Result<f64> {
        match self {
            Similarity::Score(value) => Ok(value),
            Similarity::NoCoRatedItems => Err(CfError::InsufficientData(format!(
                "users {} and {} have no co-rated items",
                a, b
            ))),
            Similarity::ZeroVariance | Similarity::NonFinite => {
                Err(CfError::DegenerateVariance { a, b })
            }
        }
    }
}

/// How the outer loop over users is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Execution {
    #[default]
    Sequential,
    /// One rayon task per output row
    Parallel,
}

/// Similarities from one user to every user, self slot included
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityRow {
    cells: Vec<Similarity>,
}

impl SimilarityRow {
    pub fn new(cells: Vec<Similarity>) -> Self {
        Self { cells }
    }

    /// Row of defined scores, convenient for callers that computed them elsewhere
    pub fn from_scores(scores: &[f64]) -> Self {
        Self::new(scores.iter().map(|&s| Similarity::Score(s)).collect())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Similarity> {
        self.cells.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Similarity> {
        self.cells.iter()
    }

    /// Scores with undefined cells as `None`
    pub fn scores(&self) -> Vec<Option<f64>> {
        self.cells.iter().map(Similarity::score).collect()
    }
}

/// Output of the similarity engine: per-user averages plus the full matrix
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityModel {
    averages: Vec<f64>,
    rows: Vec<SimilarityRow>,
}

impl SimilarityModel {
    pub fn averages(&self) -> &[f64] {
        &self.averages
    }

    pub fn average(&self, user: usize) -> Result<f64> {
        self.averages
            .get(user)
            .copied()
            .ok_or(CfError::UnknownUser {
                index: user,
                user_count: self.averages.len(),
            })
    }

    pub fn rows(&self) -> &[SimilarityRow] {
        &self.rows
    }

    pub fn row(&self, user: usize) -> Result<&SimilarityRow> {
        self.rows.get(user).ok_or(CfError::UnknownUser {
            index: user,
            user_count: self.rows.len(),
        })
    }

    /// Similarity of `a` to `b`; undefined pairs come back as errors
    pub fn similarity(&self, a: usize, b: usize) -> Result<f64> {
        let cell = self.row(a)?.get(b).ok_or(CfError::UnknownUser {
            index: b,
            user_count: self.rows.len(),
        })?;
        cell.into_result(a, b)
    }

    pub fn user_count(&self) -> usize {
        self.rows.len()
    }
}

/// Mean rating of every user over the items they rated.
///
/// A user who rated nothing has no mean; that fails with `InsufficientData`.
pub fn average_ratings(matrix: &RatingMatrix) -> Result<Vec<f64>> {
    matrix
        .users()
        .iter()
        .enumerate()
        .map(|(index, user)| {
            user.average().ok_or_else(|| {
                CfError::InsufficientData(format!(
                    "user {} (index {}) has no rated items",
                    user.id(),
                    index
                ))
            })
        })
        .collect()
}

/// Pearson correlation of two aligned rating vectors over their co-rated items.
///
/// Items are visited in catalog order so the accumulation is reproducible.
pub fn pearson(a: &[Option<f64>], avg_a: f64, b: &[Option<f64>], avg_b: f64) -> Similarity {
    let mut numerator = 0.0;
    let mut variance_a = 0.0;
    let mut variance_b = 0.0;
    let mut co_rated = 0usize;

    for (ra, rb) in a.iter().zip(b) {
        if let (Some(x), Some(y)) = (ra, rb) {
            let dev_a = x - avg_a;
            let dev_b = y - avg_b;
            numerator += dev_a * dev_b;
            variance_a += dev_a * dev_a;
            variance_b += dev_b * dev_b;
            co_rated += 1;
        }
    }

    if co_rated == 0 {
        return Similarity::NoCoRatedItems;
    }
    if !(numerator.is_finite() && variance_a.is_finite() && variance_b.is_finite()) {
        return Similarity::NonFinite;
    }
    if variance_a == 0.0 || variance_b == 0.0 {
        return Similarity::ZeroVariance;
    }

    let score = numerator / (variance_a.sqrt() * variance_b.sqrt());
    if score.is_finite() {
        Similarity::Score(score)
    } else {
        Similarity::NonFinite
    }
}

/// Compute averages and the full user × user similarity matrix.
///
/// Fails with `InsufficientData` if any user has no rated item. Undefined
/// pairs are kept in the matrix as explicit `Similarity` markers.
pub fn compute_similarities(matrix: &RatingMatrix, execution: Execution) -> Result<SimilarityModel> {
    let averages = average_ratings(matrix)?;
    let user_count = matrix.user_count();
    let users = matrix.users();

    let mut rows: Vec<SimilarityRow> = (0..user_count)
        .map(|_| SimilarityRow::new(vec![Similarity::NoCoRatedItems; user_count]))
        .collect();

    let fill_row = |(a, row): (usize, &mut SimilarityRow)| {
        let ratings_a = users[a].ratings();
        for (b, cell) in row.cells.iter_mut().enumerate() {
            *cell = pearson(ratings_a, averages[a], users[b].ratings(), averages[b]);
        }
        debug!(user_index = a, "Similarity row computed");
    };

    match execution {
        Execution::Sequential => rows.iter_mut().enumerate().for_each(fill_row),
        Execution::Parallel => rows.par_iter_mut().enumerate().for_each(fill_row),
    }

    let undefined_pairs = rows
        .iter()
        .enumerate()
        .flat_map(|(a, row)| {
            row.iter()
                .enumerate()
                .filter(move |(b, cell)| a != *b && !cell.is_defined())
        })
        .count();

    if undefined_pairs > 0 {
        warn!(
            undefined_pairs,
            "Some user pairs have no defined similarity and will never be neighbors"
        );
    }

    info!(
        user_count,
        item_count = matrix.item_count(),
        execution = ?execution,
        "Pearson similarity matrix computed"
    );

    Ok(SimilarityModel { averages, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn matrix(rows: &[&[f64]]) -> RatingMatrix {
        let item_count = rows.first().map(|r| r.len()).unwrap_or(0);
        let users = rows
            .iter()
            .enumerate()
            .map(|(i, r)| User::from_dense(i as i64, r))
            .collect();
        RatingMatrix::new(users, item_count).unwrap()
    }

    #[test]
    fn test_worked_example_matches_hand_computation() {
        let m = matrix(&[&[5.0, 3.0, 0.0, 1.0], &[4.0, 3.0, 1.0, 1.0]]);
        let model = compute_similarities(&m, Execution::Sequential).unwrap();

        // avg(U0) = 9 / 3, avg(U1) = 9 / 4
        let avg0 = 3.0;
        let avg1 = 2.25;
        assert!((model.average(0).unwrap() - avg0).abs() < 1e-9);
        assert!((model.average(1).unwrap() - avg1).abs() < 1e-9);

        // Co-rated items {0, 1, 3}
        let a = [5.0, 3.0, 1.0];
        let b = [4.0, 3.0, 1.0];
        let mut cov = 0.0;
        let mut var_a = 0.0;
        let mut var_b = 0.0;
        for (x, y) in a.iter().zip(b.iter()) {
            cov += (x - avg0) * (y - avg1);
            var_a += (x - avg0) * (x - avg0);
            var_b += (y - avg1) * (y - avg1);
        }
        assert!((cov - 6.0).abs() < 1e-9);
        assert!((var_a - 8.0).abs() < 1e-9);
        assert!((var_b - 5.1875).abs() < 1e-9);

        let expected = cov / (var_a.sqrt() * var_b.sqrt());
        assert!((model.similarity(0, 1).unwrap() - expected).abs() < 1e-9);
        assert!((model.similarity(1, 0).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_all_missing_user_is_insufficient_data() {
        let m = matrix(&[&[5.0, 3.0], &[0.0, 0.0]]);
        let err = compute_similarities(&m, Execution::Sequential).unwrap_err();
        assert!(matches!(err, CfError::InsufficientData(_)));
    }

    #[test]
    fn test_disjoint_users_have_no_co_rated_items() {
        let m = matrix(&[&[5.0, 3.0, 0.0, 0.0], &[0.0, 0.0, 4.0, 2.0]]);
        let model = compute_similarities(&m, Execution::Sequential).unwrap();

        assert_eq!(model.row(0).unwrap().get(1), Some(Similarity::NoCoRatedItems));
        assert!(matches!(
            model.similarity(0, 1),
            Err(CfError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_flat_ratings_are_degenerate() {
        // U0 rates everything 3, so every deviation is zero
        let m = matrix(&[&[3.0, 3.0, 3.0], &[1.0, 4.0, 5.0]]);
        let model = compute_similarities(&m, Execution::Sequential).unwrap();

        assert_eq!(model.row(0).unwrap().get(1), Some(Similarity::ZeroVariance));
        assert_eq!(
            model.similarity(1, 0),
            Err(CfError::DegenerateVariance { a: 1, b: 0 })
        );
    }

    #[test]
    fn test_opposite_raters_are_negatively_correlated() {
        let m = matrix(&[&[5.0, 1.0, 3.0], &[1.0, 5.0, 3.0]]);
        let model = compute_similarities(&m, Execution::Sequential).unwrap();

        assert!((model.similarity(0, 1).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_self_slot_is_populated() {
        let m = matrix(&[&[5.0, 1.0, 3.0], &[1.0, 5.0, 3.0]]);
        let model = compute_similarities(&m, Execution::Sequential).unwrap();

        assert_eq!(model.row(0).unwrap().len(), 2);
        assert!((model.similarity(0, 0).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_parallel_matches_sequential_bit_for_bit() {
        let m = matrix(&[
            &[5.0, 3.0, 0.0, 1.0, 4.0],
            &[4.0, 0.0, 0.0, 1.0, 5.0],
            &[1.0, 1.0, 0.0, 5.0, 0.0],
            &[1.0, 0.0, 0.0, 4.0, 2.0],
            &[0.0, 1.0, 5.0, 4.0, 3.0],
        ]);

        let sequential = compute_similarities(&m, Execution::Sequential).unwrap();
        let parallel = compute_similarities(&m, Execution::Parallel).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_overflowing_deviations_are_not_scores() {
        let m = matrix(&[
            &[1e200, -1e200, 1e200],
            &[-1e200, 1e200, -1e200],
            &[1.0, 2.0, 3.0],
        ]);
        let model = compute_similarities(&m, Execution::Sequential).unwrap();

        let row = model.row(0).unwrap();
        assert!(row.iter().all(|cell| *cell == Similarity::NonFinite));
        assert_eq!(model.row(2).unwrap().get(0), Some(Similarity::NonFinite));
        assert_eq!(
            model.similarity(0, 1),
            Err(CfError::DegenerateVariance { a: 0, b: 1 })
        );
        assert!((model.similarity(2, 2).unwrap() - 1.0).abs() < 1e-12);

        let neighbors = crate::neighbors::top_neighbors(0, 2, row).unwrap();
        assert!(neighbors.is_empty());
    }

    #[test]
    fn test_into_result_maps_markers_to_errors() {
        assert_eq!(Similarity::Score(0.5).into_result(0, 1), Ok(0.5));
        assert!(matches!(
            Similarity::NoCoRatedItems.into_result(0, 1),
            Err(CfError::InsufficientData(_))
        ));
        assert_eq!(
            Similarity::ZeroVariance.into_result(2, 3),
            Err(CfError::DegenerateVariance { a: 2, b: 3 })
        );
        assert_eq!(
            Similarity::NonFinite.into_result(2, 3),
            Err(CfError::DegenerateVariance { a: 2, b: 3 })
        );
    }
}
