use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::JudgeError;
use crate::models::GroupId;
use crate::review::ReviewId;

/// One representative review, passed to the judge as evidence. The judge
/// never sees full memberships — evidence is always the representative
/// selector's bounded output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepresentativeReview {
    pub id: ReviewId,
    pub title: String,
    pub body: String,
    pub rating: f32,
}

/// Summarization request for one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub group: GroupId,
    pub representatives: Vec<RepresentativeReview>,
}

/// Summary plus relevance verdict, produced together by the judge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryVerdict {
    pub summary: String,
    pub relevant: bool,
}

/// Merge proposal: two relevant groups whose centroids sit below the
/// similarity threshold, with both summaries as evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeProposal {
    pub left: GroupId,
    pub right: GroupId,
    pub left_summary: String,
    pub right_summary: String,
    pub centroid_distance: f64,
}

/// Split proposal: a group whose mean intra-group distance exceeds the
/// cohesion threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitProposal {
    pub group: GroupId,
    pub summary: String,
    pub mean_distance: f64,
    pub size: usize,
}

/// Reassignment proposal: a pooled review and its nearest group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReassignProposal {
    pub review: ReviewId,
    pub title: String,
    pub body: String,
    pub group: GroupId,
    pub group_summary: String,
    pub centroid_distance: f64,
}

/// The judge's structured outcome for a proposal. A tagged result —
/// callers branch on the tag, never on type identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn is_accept(self) -> bool {
        self == Decision::Accept
    }
}

/// The LLM judge collaborator, typed per call kind.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Produce a short summary and relevance verdict from representative
    /// evidence.
    async fn summarize(&self, req: &SummaryRequest) -> Result<SummaryVerdict, JudgeError>;

    /// Accept or reject a proposed merge.
    async fn review_merge(&self, proposal: &MergeProposal) -> Result<Decision, JudgeError>;

    /// Accept or reject a proposed split.
    async fn review_split(&self, proposal: &SplitProposal) -> Result<Decision, JudgeError>;

    /// Accept or reject moving a pooled review into its nearest group.
    async fn review_reassignment(
        &self,
        proposal: &ReassignProposal,
    ) -> Result<Decision, JudgeError>;
}
