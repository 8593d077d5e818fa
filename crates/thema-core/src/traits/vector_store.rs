use async_trait::async_trait;

use crate::errors::ThemaResult;
use crate::review::{ReviewCatalog, ReviewId};

/// Vector-database collaborator: supplies the embedded review set that
/// seeds the cluster builder and answers nearest-neighbor queries.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// All embedded reviews in the store.
    async fn all_reviews(&self) -> ThemaResult<ReviewCatalog>;

    /// Nearest-neighbor review ids with distances for a query vector,
    /// closest first.
    async fn nearest(&self, query: &[f32], limit: usize) -> ThemaResult<Vec<(ReviewId, f64)>>;
}
