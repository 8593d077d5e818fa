//! Representative selector: a group's members ordered closest-first by
//! centroid distance.

use thema_core::errors::{ThemaError, ThemaResult};
use thema_core::models::Group;
use thema_core::review::{ReviewCatalog, ReviewId};

use crate::geometry::{cosine_distance, order_by_distance};

/// The `k` members nearest the group centroid, closest first, ties broken
/// by review id. Pure function of membership and centroid — callers must
/// recompute after any membership change, never cache across one.
pub fn representatives(
    group: &Group,
    catalog: &ReviewCatalog,
    k: usize,
) -> ThemaResult<Vec<(ReviewId, f64)>> {
    let mut pairs = Vec::with_capacity(group.members.len());
    for id in &group.members {
        let review = catalog.get(id).ok_or_else(|| ThemaError::PartitionViolation {
            details: format!("group {} references unknown review {id}", group.id),
        })?;
        pairs.push((id.clone(), cosine_distance(&review.embedding, &group.centroid)));
    }

    let mut ordered = order_by_distance(pairs);
    ordered.truncate(k);
    Ok(ordered)
}
