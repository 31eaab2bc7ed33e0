//! User-based collaborative filtering with Pearson similarity
//!
//! This library provides the numerical core of the recommendation pipeline:
//! - **Similarity**: Pearson correlation for every user pair over co-rated items,
//!   plus each user's mean rating
//! - **Neighbors**: deterministic top-N selection from a similarity row
//! - **Prediction**: raw and mean-normalized neighbor-weighted predictions
//! - **Ranking**: top-N items by predicted score
//!
//! Undefined similarities (no co-rated items, zero variance) are kept as
//! explicit markers instead of NaN so they can never leak into a ranking.
//!
//! # Example
//!
//! ```rust
//! use user_cf::{
//!     compute_similarities, predict, top_items, top_neighbors, Execution, ItemCatalog,
//!     PredictionMode, RatingMatrix, User,
//! };
//!
//! let catalog: ItemCatalog = ["Alien", "Brazil", "Casablanca"].into_iter().collect();
//! let users = vec![
//!     User::from_dense(1, &[5.0, 3.0, 0.0]),
//!     User::from_dense(2, &[4.0, 2.0, 5.0]),
//!     User::from_dense(3, &[1.0, 5.0, 2.0]),
//! ];
//! let matrix = RatingMatrix::with_catalog(users, &catalog).unwrap();
//!
//! let model = compute_similarities(&matrix, Execution::Sequential).unwrap();
//! let neighbors = top_neighbors(0, 1, model.row(0).unwrap()).unwrap();
//! let predictions = predict(0, &neighbors, &matrix, model.averages(), PredictionMode::Normalized).unwrap();
//! let best = top_items(&predictions, 1, &catalog).unwrap();
//!
//! assert_eq!(neighbors[0].index, 1);
//! assert_eq!(best.len(), 1);
//! ```

pub mod error;
pub mod models;
pub mod neighbors;
pub mod prediction;
pub mod similarity;

// Re-export main types for convenience
pub use error::{CfError, Result};
pub use models::{ItemCatalog, Neighbor, PredictedItem, RatingMatrix, User};
pub use neighbors::top_neighbors;
pub use prediction::{predict, rank_predictions, top_items, PredictionMode, MIN_WEIGHT_SUM};
pub use similarity::{
    average_ratings, compute_similarities, pearson, Execution, Similarity, SimilarityModel,
    SimilarityRow,
};
