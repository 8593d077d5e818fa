use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::review::ReviewId;

/// Group identifier. Sequential, never random — terminal states must be
/// byte-identical across runs with identical inputs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g-{}", self.0)
    }
}

/// Relevance verdict applied by the Annotating phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relevance {
    Unjudged,
    Relevant,
    Irrelevant,
}

/// Which refinement operation last touched a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Seeded,
    Annotated,
    Merged,
    Split,
    Reassigned,
}

/// A judge-produced summary plus the membership digest it was computed
/// from. The summary is *current* only while the digest still matches the
/// group's membership — the staleness test behind Summarizing idempotence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Short free-text summary of the group's theme.
    pub text: String,
    /// Relevance verdict returned alongside the summary.
    pub relevant: bool,
    /// blake3 hex digest of the sorted member ids at summary time.
    pub members_digest: String,
}

/// A thematic group of reviews: mutable aggregate with derived geometry.
///
/// Invariant (held by `RefinementState`): a review id appears in at most
/// one group or the unclustered pool, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    /// Member review ids. Non-empty while the group is active.
    pub members: BTreeSet<ReviewId>,
    /// Mean embedding of the members. Recomputed on membership change.
    pub centroid: Vec<f32>,
    /// Mean member-to-centroid distance. Recomputed with the centroid.
    pub mean_distance: f64,
    pub relevance: Relevance,
    /// Nullable until the judge annotates the group.
    pub summary: Option<GroupSummary>,
    pub provenance: Provenance,
}

impl Group {
    /// Create a group with empty geometry; the builder fills centroid and
    /// mean distance before the group is handed out.
    pub fn new(id: GroupId, members: BTreeSet<ReviewId>) -> Self {
        Self {
            id,
            members,
            centroid: Vec::new(),
            mean_distance: 0.0,
            relevance: Relevance::Unjudged,
            summary: None,
            provenance: Provenance::Seeded,
        }
    }

    /// blake3 digest of the sorted member ids. BTreeSet iteration is
    /// already sorted, so the digest is deterministic.
    pub fn members_digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for id in &self.members {
            hasher.update(id.as_str().as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Whether the stored summary still describes the present membership.
    pub fn summary_current(&self) -> bool {
        self.summary
            .as_ref()
            .is_some_and(|s| s.members_digest == self.members_digest())
    }

    pub fn is_relevant(&self) -> bool {
        self.relevance == Relevance::Relevant
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
