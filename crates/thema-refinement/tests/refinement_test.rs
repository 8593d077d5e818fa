//! End-to-end refinement scenarios against scripted judges.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use thema_clustering::{refresh_geometry, ClusterOutput};
use thema_core::config::{RefinementConfig, ThemaConfig};
use thema_core::errors::{JudgeError, ThemaError};
use thema_core::models::{AppliedOp, Group, GroupId, Relevance, Termination};
use thema_core::review::{Review, ReviewCatalog, ReviewId};
use thema_core::traits::{
    Decision, Judge, MergeProposal, ReassignProposal, SplitProposal, SummaryRequest,
    SummaryVerdict,
};
use thema_refinement::RefinementEngine;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn review(id: &str, title: &str, embedding: Vec<f32>) -> Review {
    Review {
        id: ReviewId::new(id),
        created_at: Utc::now(),
        reviewer_name: "reviewer".into(),
        review_title: title.into(),
        review_details: format!("details for {title}"),
        review_rating: 3.0,
        url: String::new(),
        embedding,
    }
}

fn catalog_of(reviews: Vec<Review>) -> ReviewCatalog {
    reviews.into_iter().map(|r| (r.id.clone(), r)).collect()
}

/// Seed a partition by hand: one group per id list, geometry refreshed
/// from the catalog, plus an optional pool.
fn seed_partition(
    catalog: &ReviewCatalog,
    groups: &[&[&str]],
    pool: &[&str],
) -> ClusterOutput {
    let mut out_groups = std::collections::BTreeMap::new();
    for (n, ids) in groups.iter().enumerate() {
        let members: BTreeSet<ReviewId> = ids.iter().map(|s| ReviewId::new(*s)).collect();
        let mut group = Group::new(GroupId(n as u64), members);
        refresh_geometry(&mut group, catalog).unwrap();
        out_groups.insert(group.id, group);
    }
    ClusterOutput {
        groups: out_groups,
        pool: pool.iter().map(|s| ReviewId::new(*s)).collect(),
    }
}

/// Summarizes by title keyword and merges groups that share the
/// "shipping" theme. Splits are rejected, reassignments accepted.
struct ThemedJudge;

#[async_trait]
impl Judge for ThemedJudge {
    async fn summarize(&self, req: &SummaryRequest) -> Result<SummaryVerdict, JudgeError> {
        let shipping = req
            .representatives
            .iter()
            .filter(|r| r.title.contains("shipping"))
            .count();
        let summary = if shipping * 2 >= req.representatives.len() {
            "shipping delays"
        } else {
            "product quality"
        };
        Ok(SummaryVerdict {
            summary: summary.into(),
            relevant: true,
        })
    }

    async fn review_merge(&self, proposal: &MergeProposal) -> Result<Decision, JudgeError> {
        if proposal.left_summary.contains("shipping") && proposal.right_summary.contains("shipping")
        {
            Ok(Decision::Accept)
        } else {
            Ok(Decision::Reject)
        }
    }

    async fn review_split(&self, _proposal: &SplitProposal) -> Result<Decision, JudgeError> {
        Ok(Decision::Reject)
    }

    async fn review_reassignment(
        &self,
        _proposal: &ReassignProposal,
    ) -> Result<Decision, JudgeError> {
        Ok(Decision::Accept)
    }
}

/// 12 reviews in three seeded groups; two of them share the shipping
/// theme and sit nearly on top of each other.
fn shipping_scenario() -> (ReviewCatalog, ClusterOutput) {
    let mut reviews = Vec::new();
    for i in 0..4 {
        reviews.push(review(
            &format!("r-a{i}"),
            "slow shipping",
            vec![1.0, 0.0, 0.01 * i as f32],
        ));
        reviews.push(review(
            &format!("r-b{i}"),
            "shipping took weeks",
            vec![0.95, 0.05, 0.01 * i as f32],
        ));
        reviews.push(review(
            &format!("r-c{i}"),
            "poor quality",
            vec![0.0, 1.0, 0.01 * i as f32],
        ));
    }
    let catalog = catalog_of(reviews);
    let seed = seed_partition(
        &catalog,
        &[
            &["r-a0", "r-a1", "r-a2", "r-a3"],
            &["r-b0", "r-b1", "r-b2", "r-b3"],
            &["r-c0", "r-c1", "r-c2", "r-c3"],
        ],
        &[],
    );
    (catalog, seed)
}

#[tokio::test]
async fn near_duplicate_theme_groups_are_merged() {
    init_tracing();
    let (catalog, seed) = shipping_scenario();
    let engine = RefinementEngine::new(Arc::new(ThemedJudge), ThemaConfig::default());

    let state = engine.refine(seed, &catalog).await.unwrap();

    assert_eq!(state.termination, Some(Termination::Converged));
    assert_eq!(state.groups.len(), 2);

    let mut sizes: Vec<usize> = state.groups.values().map(|g| g.len()).collect();
    sizes.sort();
    assert_eq!(sizes, vec![4, 8]);

    // The merged group got a fresh id past the seeded range and fresh
    // geometry over all 8 members.
    let merged = &state.groups[&GroupId(3)];
    assert_eq!(merged.len(), 8);
    assert_eq!(merged.centroid.len(), 3);
    assert_eq!(merged.relevance, Relevance::Relevant);
    assert!(merged.summary_current());

    assert!(state.op_log.iter().any(|op| matches!(
        op,
        AppliedOp::Merged { absorbed, .. } if absorbed == &vec![GroupId(0), GroupId(1)]
    )));
    assert!(state.verify_partition(&catalog).is_ok());
}

#[tokio::test]
async fn identical_inputs_give_byte_identical_terminal_states() {
    let (catalog, seed_a) = shipping_scenario();
    let (_, seed_b) = shipping_scenario();

    let a = RefinementEngine::new(Arc::new(ThemedJudge), ThemaConfig::default())
        .refine(seed_a, &catalog)
        .await
        .unwrap();
    let b = RefinementEngine::new(Arc::new(ThemedJudge), ThemaConfig::default())
        .refine(seed_b, &catalog)
        .await
        .unwrap();

    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[tokio::test]
async fn accepting_judges_only_shrink_the_partition() {
    // Two near-duplicate shipping groups, one distinct group, and two
    // pooled reviews the judge will accept. Groups plus pooled reviews
    // may only go down when every accepted op is a merge or reassignment.
    let mut reviews = Vec::new();
    for i in 0..3 {
        reviews.push(review(
            &format!("r-a{i}"),
            "slow shipping",
            vec![1.0, 0.0, 0.01 * i as f32],
        ));
        reviews.push(review(
            &format!("r-b{i}"),
            "shipping woes",
            vec![0.96, 0.04, 0.01 * i as f32],
        ));
        reviews.push(review(
            &format!("r-c{i}"),
            "bad firmware",
            vec![0.0, 1.0, 0.01 * i as f32],
        ));
    }
    reviews.push(review("r-p0", "firmware bug", vec![0.05, 1.0, 0.0]));
    reviews.push(review("r-p1", "crashes daily", vec![0.0, 0.95, 0.05]));
    let catalog = catalog_of(reviews);

    let seed = seed_partition(
        &catalog,
        &[
            &["r-a0", "r-a1", "r-a2"],
            &["r-b0", "r-b1", "r-b2"],
            &["r-c0", "r-c1", "r-c2"],
        ],
        &["r-p0", "r-p1"],
    );
    let seeded_total = seed.groups.len() + seed.pool.len();

    let engine = RefinementEngine::new(Arc::new(ThemedJudge), ThemaConfig::default());
    let state = engine.refine(seed, &catalog).await.unwrap();

    assert_eq!(state.termination, Some(Termination::Converged));
    let terminal_total = state.groups.len() + state.pool.len();
    assert!(terminal_total < seeded_total);
    assert_eq!(state.groups.len(), 2);
    assert!(state.pool.is_empty());
    assert!(state.verify_partition(&catalog).is_ok());
}

/// Accepts every split, rejects everything else.
struct SplitHappyJudge;

#[async_trait]
impl Judge for SplitHappyJudge {
    async fn summarize(&self, _req: &SummaryRequest) -> Result<SummaryVerdict, JudgeError> {
        Ok(SummaryVerdict {
            summary: "mixed feedback".into(),
            relevant: true,
        })
    }

    async fn review_merge(&self, _p: &MergeProposal) -> Result<Decision, JudgeError> {
        Ok(Decision::Reject)
    }

    async fn review_split(&self, _p: &SplitProposal) -> Result<Decision, JudgeError> {
        Ok(Decision::Accept)
    }

    async fn review_reassignment(&self, _p: &ReassignProposal) -> Result<Decision, JudgeError> {
        Ok(Decision::Reject)
    }
}

#[tokio::test]
async fn incohesive_groups_are_split_into_cohesive_replacements() {
    init_tracing();
    // Two well-separated themes seeded into a single wide group.
    let mut reviews = Vec::new();
    for i in 0..3 {
        reviews.push(review(
            &format!("r-a{i}"),
            "slow shipping",
            vec![1.0, 0.01 * i as f32],
        ));
        reviews.push(review(
            &format!("r-b{i}"),
            "poor quality",
            vec![-0.5, 0.87 + 0.01 * i as f32],
        ));
    }
    let catalog = catalog_of(reviews);
    let seed = seed_partition(
        &catalog,
        &[&["r-a0", "r-a1", "r-a2", "r-b0", "r-b1", "r-b2"]],
        &[],
    );

    let engine = RefinementEngine::new(Arc::new(SplitHappyJudge), ThemaConfig::default());
    let state = engine.refine(seed, &catalog).await.unwrap();

    assert_eq!(state.termination, Some(Termination::Converged));
    assert_eq!(state.groups.len(), 2);
    assert!(state.op_log.iter().any(|op| matches!(
        op,
        AppliedOp::Split { source, replacements }
            if *source == GroupId(0) && replacements.len() == 2
    )));

    // The replacements carry fresh ids, separate the two themes, and
    // were re-summarized after the split invalidated their summaries.
    for group in state.groups.values() {
        assert!(group.id.0 > 0);
        assert_eq!(group.len(), 3);
        assert!(group.mean_distance < 0.1, "replacements are cohesive");
        assert!(group.summary_current());
        assert_eq!(group.relevance, Relevance::Relevant);
    }
    assert!(state.verify_partition(&catalog).is_ok());
}

/// Summarizes by title keyword, merges shipping groups, and accepts a
/// reassignment only when the proposal's group summary names shipping;
/// records the summary evidence every proposal carried.
struct EvidenceJudge {
    summaries_seen: Mutex<Vec<String>>,
}

#[async_trait]
impl Judge for EvidenceJudge {
    async fn summarize(&self, req: &SummaryRequest) -> Result<SummaryVerdict, JudgeError> {
        let shipping = req
            .representatives
            .iter()
            .filter(|r| r.title.contains("shipping"))
            .count();
        let summary = if shipping * 2 >= req.representatives.len() {
            "shipping delays"
        } else {
            "product quality"
        };
        Ok(SummaryVerdict {
            summary: summary.into(),
            relevant: true,
        })
    }

    async fn review_merge(&self, proposal: &MergeProposal) -> Result<Decision, JudgeError> {
        if proposal.left_summary.contains("shipping") && proposal.right_summary.contains("shipping")
        {
            Ok(Decision::Accept)
        } else {
            Ok(Decision::Reject)
        }
    }

    async fn review_split(&self, _p: &SplitProposal) -> Result<Decision, JudgeError> {
        Ok(Decision::Reject)
    }

    async fn review_reassignment(&self, p: &ReassignProposal) -> Result<Decision, JudgeError> {
        self.summaries_seen
            .lock()
            .unwrap()
            .push(p.group_summary.clone());
        if p.group_summary.contains("shipping") {
            Ok(Decision::Accept)
        } else {
            Ok(Decision::Reject)
        }
    }
}

#[tokio::test]
async fn reassignment_waits_for_fresh_summaries_after_a_merge() {
    // Two near-duplicate shipping groups merge in the first iteration,
    // which invalidates the merged group's summary. The pooled shipping
    // review must not be offered to that group until it has been
    // re-summarized, so no proposal ever carries empty evidence.
    let mut reviews = Vec::new();
    for i in 0..3 {
        reviews.push(review(
            &format!("r-a{i}"),
            "slow shipping",
            vec![1.0, 0.0, 0.01 * i as f32],
        ));
        reviews.push(review(
            &format!("r-b{i}"),
            "shipping woes",
            vec![0.96, 0.04, 0.01 * i as f32],
        ));
        reviews.push(review(
            &format!("r-c{i}"),
            "poor quality",
            vec![0.0, 1.0, 0.01 * i as f32],
        ));
    }
    reviews.push(review("r-p0", "shipping upgrade", vec![0.97, 0.03, 0.0]));
    let catalog = catalog_of(reviews);
    let seed = seed_partition(
        &catalog,
        &[
            &["r-a0", "r-a1", "r-a2"],
            &["r-b0", "r-b1", "r-b2"],
            &["r-c0", "r-c1", "r-c2"],
        ],
        &["r-p0"],
    );

    let judge = Arc::new(EvidenceJudge {
        summaries_seen: Mutex::new(Vec::new()),
    });
    let engine = RefinementEngine::new(judge.clone(), ThemaConfig::default());
    let state = engine.refine(seed, &catalog).await.unwrap();

    assert_eq!(state.termination, Some(Termination::Converged));

    // Iteration 1 offers the review to the quality group (the only one
    // with a current summary) and is refused; iteration 2 offers the
    // re-summarized merged group and is accepted.
    assert_eq!(
        *judge.summaries_seen.lock().unwrap(),
        vec!["product quality".to_string(), "shipping delays".to_string()]
    );
    assert!(state.groups[&GroupId(3)]
        .members
        .contains(&ReviewId::new("r-p0")));
    assert!(state.pool.is_empty());
    assert!(state.verify_partition(&catalog).is_ok());
}

/// Counts summarize calls per group; accepts every reassignment.
struct CountingJudge {
    summaries: Mutex<std::collections::BTreeMap<GroupId, u32>>,
}

impl CountingJudge {
    fn new() -> Self {
        Self {
            summaries: Mutex::new(std::collections::BTreeMap::new()),
        }
    }

    fn count(&self, id: GroupId) -> u32 {
        self.summaries.lock().unwrap().get(&id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Judge for CountingJudge {
    async fn summarize(&self, req: &SummaryRequest) -> Result<SummaryVerdict, JudgeError> {
        *self.summaries.lock().unwrap().entry(req.group).or_insert(0) += 1;
        Ok(SummaryVerdict {
            summary: "a theme".into(),
            relevant: true,
        })
    }

    async fn review_merge(&self, _p: &MergeProposal) -> Result<Decision, JudgeError> {
        Ok(Decision::Reject)
    }

    async fn review_split(&self, _p: &SplitProposal) -> Result<Decision, JudgeError> {
        Ok(Decision::Reject)
    }

    async fn review_reassignment(&self, _p: &ReassignProposal) -> Result<Decision, JudgeError> {
        Ok(Decision::Accept)
    }
}

#[tokio::test]
async fn unchanged_groups_are_never_resummarized() {
    let catalog = catalog_of(vec![
        review("r-a0", "battery drains", vec![1.0, 0.0, 0.0]),
        review("r-a1", "battery dies fast", vec![1.0, 0.02, 0.0]),
        review("r-b0", "great screen", vec![0.0, 1.0, 0.0]),
        review("r-b1", "love the display", vec![0.0, 1.0, 0.02]),
        review("r-p0", "battery swelled", vec![1.0, 0.1, 0.0]),
    ]);
    let seed = seed_partition(&catalog, &[&["r-a0", "r-a1"], &["r-b0", "r-b1"]], &["r-p0"]);

    let judge = Arc::new(CountingJudge::new());
    let engine = RefinementEngine::new(judge.clone(), ThemaConfig::default());
    let state = engine.refine(seed, &catalog).await.unwrap();

    assert_eq!(state.termination, Some(Termination::Converged));
    assert_eq!(state.iteration, 2);

    // The pooled review joined group 0, forcing exactly one
    // re-summarization there. Group 1 never changed.
    assert!(state.groups[&GroupId(0)]
        .members
        .contains(&ReviewId::new("r-p0")));
    assert_eq!(judge.count(GroupId(0)), 2);
    assert_eq!(judge.count(GroupId(1)), 1);
    assert!(state.pool.is_empty());
}

/// Summarizes promptly but never answers reassignment proposals.
struct StallingReassignJudge;

#[async_trait]
impl Judge for StallingReassignJudge {
    async fn summarize(&self, _req: &SummaryRequest) -> Result<SummaryVerdict, JudgeError> {
        Ok(SummaryVerdict {
            summary: "a theme".into(),
            relevant: true,
        })
    }

    async fn review_merge(&self, _p: &MergeProposal) -> Result<Decision, JudgeError> {
        Ok(Decision::Reject)
    }

    async fn review_split(&self, _p: &SplitProposal) -> Result<Decision, JudgeError> {
        Ok(Decision::Reject)
    }

    async fn review_reassignment(&self, _p: &ReassignProposal) -> Result<Decision, JudgeError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Decision::Accept)
    }
}

#[tokio::test(start_paused = true)]
async fn timed_out_reassignments_count_as_rejections() {
    let catalog = catalog_of(vec![
        review("r-a0", "noisy fan", vec![1.0, 0.0]),
        review("r-a1", "fan rattles", vec![1.0, 0.05]),
        review("r-p0", "whirring sound", vec![0.9, 0.1]),
    ]);
    let seed = seed_partition(&catalog, &[&["r-a0", "r-a1"]], &["r-p0"]);

    let config = ThemaConfig {
        refinement: RefinementConfig {
            max_reassign_attempts: 2,
            ..RefinementConfig::default()
        },
        ..ThemaConfig::default()
    };
    let engine = RefinementEngine::new(Arc::new(StallingReassignJudge), config);
    let state = engine.refine(seed, &catalog).await.unwrap();

    assert_eq!(state.termination, Some(Termination::Converged));
    assert!(state
        .pool
        .unassignable
        .contains(&ReviewId::new("r-p0")));
    assert!(state.pool.pending.is_empty());
    assert!(state.op_log.iter().any(|op| matches!(
        op,
        AppliedOp::MarkedUnassignable { review } if review.as_str() == "r-p0"
    )));
    assert!(state.verify_partition(&catalog).is_ok());
}

/// Every call fails with a transient outage.
struct DownJudge;

#[async_trait]
impl Judge for DownJudge {
    async fn summarize(&self, _req: &SummaryRequest) -> Result<SummaryVerdict, JudgeError> {
        Err(JudgeError::Unavailable {
            reason: "connection refused".into(),
        })
    }

    async fn review_merge(&self, _p: &MergeProposal) -> Result<Decision, JudgeError> {
        Err(JudgeError::Unavailable {
            reason: "connection refused".into(),
        })
    }

    async fn review_split(&self, _p: &SplitProposal) -> Result<Decision, JudgeError> {
        Err(JudgeError::Unavailable {
            reason: "connection refused".into(),
        })
    }

    async fn review_reassignment(&self, _p: &ReassignProposal) -> Result<Decision, JudgeError> {
        Err(JudgeError::Unavailable {
            reason: "connection refused".into(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn sustained_judge_outage_aborts_the_run() {
    let catalog = catalog_of(vec![
        review("r-a0", "cracked case", vec![1.0, 0.0]),
        review("r-a1", "arrived broken", vec![1.0, 0.05]),
    ]);
    let seed = seed_partition(&catalog, &[&["r-a0", "r-a1"]], &[]);

    let config = ThemaConfig {
        refinement: RefinementConfig {
            judge_retries: 1,
            ..RefinementConfig::default()
        },
        ..ThemaConfig::default()
    };
    let engine = RefinementEngine::new(Arc::new(DownJudge), config);
    let state = engine.refine(seed, &catalog).await.unwrap();

    match state.termination {
        Some(Termination::Aborted { ref detail }) => {
            assert!(detail.contains("unavailable"), "unexpected detail: {detail}");
        }
        ref other => panic!("expected abort, got {other:?}"),
    }
    // Groups survive an abort untouched.
    assert_eq!(state.groups.len(), 1);
    assert!(state.verify_partition(&catalog).is_ok());
}

#[tokio::test]
async fn cancellation_before_the_first_phase_aborts_cleanly() {
    let (catalog, seed) = shipping_scenario();
    let engine = RefinementEngine::new(Arc::new(ThemedJudge), ThemaConfig::default());

    engine.cancel_handle().cancel();
    let state = engine.refine(seed, &catalog).await.unwrap();

    assert_eq!(
        state.termination,
        Some(Termination::Aborted {
            detail: "cancelled by caller".into()
        })
    );
    assert_eq!(state.iteration, 0);
    assert!(state.op_log.is_empty());
    assert_eq!(state.groups.len(), 3);
}

/// Blocks on the first summarize call until the test ends.
struct BlockingJudge;

#[async_trait]
impl Judge for BlockingJudge {
    async fn summarize(&self, _req: &SummaryRequest) -> Result<SummaryVerdict, JudgeError> {
        std::future::pending::<()>().await;
        unreachable!()
    }

    async fn review_merge(&self, _p: &MergeProposal) -> Result<Decision, JudgeError> {
        Ok(Decision::Reject)
    }

    async fn review_split(&self, _p: &SplitProposal) -> Result<Decision, JudgeError> {
        Ok(Decision::Reject)
    }

    async fn review_reassignment(&self, _p: &ReassignProposal) -> Result<Decision, JudgeError> {
        Ok(Decision::Reject)
    }
}

#[tokio::test]
async fn a_second_concurrent_run_is_refused() {
    let (catalog, seed_a) = shipping_scenario();
    let (_, seed_b) = shipping_scenario();

    let engine = Arc::new(RefinementEngine::new(
        Arc::new(BlockingJudge),
        ThemaConfig::default(),
    ));

    let background = {
        let engine = Arc::clone(&engine);
        let catalog = catalog.clone();
        tokio::spawn(async move {
            let _ = engine.refine(seed_a, &catalog).await;
        })
    };
    tokio::task::yield_now().await;

    let err = engine.refine(seed_b, &catalog).await.unwrap_err();
    assert!(matches!(err, ThemaError::AlreadyRunning));

    background.abort();
}
