use crate::error::{CfError, Result};
use serde::Serialize;

/// A single user's ratings, one slot per catalog item.
///
/// `None` means "not rated". A genuine score of zero cannot be expressed:
/// `0.0` is stored as unrated whichever constructor builds the user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: i64,
    ratings: Vec<Option<f64>>,
}

impl User {
    pub fn new(id: i64, ratings: Vec<Option<f64>>) -> Self {
        let ratings = ratings
            .into_iter()
            .map(|r| r.filter(|&v| v != 0.0))
            .collect();
        Self { id, ratings }
    }

    /// Build a user from a dense row where `0.0` marks an unrated item
    pub fn from_dense(id: i64, ratings: &[f64]) -> Self {
        let ratings = ratings
            .iter()
            .map(|&r| if r == 0.0 { None } else { Some(r) })
            .collect();
        Self { id, ratings }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn ratings(&self) -> &[Option<f64>] {
        &self.ratings
    }

    pub fn rating(&self, item: usize) -> Option<f64> {
        self.ratings.get(item).copied().flatten()
    }

    /// Mean of the rated items, `None` when the user rated nothing
    pub fn average(&self) -> Option<f64> {
        let (sum, count) = self
            .ratings
            .iter()
            .flatten()
            .fold((0.0, 0usize), |(sum, count), r| (sum + r, count + 1));

        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }
}

/// Users × items rating matrix.
///
/// Construction rejects ragged rows and non-finite ratings, so every
/// `RatingMatrix` in circulation is rectangular.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingMatrix {
    users: Vec<User>,
    item_count: usize,
}

impl RatingMatrix {
    pub fn new(users: Vec<User>, item_count: usize) -> Result<Self> {
        for (index, user) in users.iter().enumerate() {
            if user.ratings.len() != item_count {
                return Err(CfError::ShapeMismatch {
                    context: format!("ratings of user {} (index {})", user.id, index),
                    expected: item_count,
                    found: user.ratings.len(),
                });
            }

            if let Some((item, value)) = user
                .ratings
                .iter()
                .enumerate()
                .find_map(|(item, r)| r.filter(|v| !v.is_finite()).map(|v| (item, v)))
            {
                return Err(CfError::InvalidRating {
                    user: index,
                    item,
                    value,
                });
            }
        }

        Ok(Self { users, item_count })
    }

    /// Build a matrix whose item count is taken from the catalog
    pub fn with_catalog(users: Vec<User>, catalog: &ItemCatalog) -> Result<Self> {
        Self::new(users, catalog.len())
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user(&self, index: usize) -> Result<&User> {
        self.users.get(index).ok_or(CfError::UnknownUser {
            index,
            user_count: self.users.len(),
        })
    }

    /// Position of the user carrying `id`, if any
    pub fn index_of(&self, id: i64) -> Option<usize> {
        self.users.iter().position(|u| u.id == id)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Fail with `ShapeMismatch` unless the catalog lines up with the columns
    pub fn ensure_catalog(&self, catalog: &ItemCatalog) -> Result<()> {
        if catalog.len() != self.item_count {
            return Err(CfError::ShapeMismatch {
                context: "item catalog".to_string(),
                expected: self.item_count,
                found: catalog.len(),
            });
        }
        Ok(())
    }
}

/// Ordered item names; position `i` names column `i` of the matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemCatalog {
    names: Vec<String>,
}

impl ItemCatalog {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl<S: Into<String>> FromIterator<S> for ItemCatalog {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// A selected neighbor: matrix index of the user and its similarity to the target
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub index: usize,
    pub similarity: f64,
}

/// Predicted rating for one catalog item
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictedItem {
    pub item: usize,
    pub score: f64,
}
