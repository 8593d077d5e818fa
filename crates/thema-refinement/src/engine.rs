//! The refinement orchestrator: a single-run loop that drives the
//! Summarizing, Consolidating, and Reassigning phases to a terminal state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use thema_clustering::ClusterOutput;
use thema_core::config::ThemaConfig;
use thema_core::constants::JUDGE_OUTAGE_ITERATIONS;
use thema_core::errors::{ThemaError, ThemaResult};
use thema_core::models::{RefinementState, Termination, UnclusteredPool};
use thema_core::review::ReviewCatalog;
use thema_core::traits::Judge;

use crate::phases::{consolidate, reassign, summarize, PhaseStats};

/// Cooperative cancellation for a running refinement. Checked at phase
/// boundaries only; a cancelled run terminates `Aborted` with every
/// fully-applied phase intact.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Drives a seeded group set through iterative judge-supervised
/// refinement until convergence, the iteration cap, or an abort.
pub struct RefinementEngine {
    judge: Arc<dyn Judge>,
    config: ThemaConfig,
    is_running: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
}

/// Clears the running flag when a run exits, normally or by error.
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl RefinementEngine {
    pub fn new(judge: Arc<dyn Judge>, config: ThemaConfig) -> Self {
        Self {
            judge,
            config,
            is_running: Arc::new(AtomicBool::new(false)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            flag: Arc::clone(&self.cancelled),
        }
    }

    /// Refine a freshly built partition to a terminal state.
    ///
    /// At most one run per engine at a time; a second concurrent call
    /// fails fast with `AlreadyRunning`. The partition invariant is
    /// verified after every mutating phase, and the returned state always
    /// carries a termination reason.
    pub async fn refine(
        &self,
        seed: ClusterOutput,
        catalog: &ReviewCatalog,
    ) -> ThemaResult<RefinementState> {
        if self
            .is_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ThemaError::AlreadyRunning);
        }
        let _guard = RunGuard(Arc::clone(&self.is_running));

        let mut state =
            RefinementState::new(seed.groups, UnclusteredPool::new(seed.pool));
        state.verify_partition(catalog)?;

        let refinement = &self.config.refinement;
        let mut outage_streak: u32 = 0;

        let termination = loop {
            if let Some(t) = self.cancelled_termination() {
                break t;
            }
            if state.iteration >= refinement.max_iterations {
                break Termination::MaxIterationsReached;
            }
            state.iteration += 1;
            info!(
                iteration = state.iteration,
                groups = state.groups.len(),
                pending = state.pool.pending.len(),
                "refinement iteration started"
            );

            let summarized =
                summarize::run(&mut state, catalog, &self.judge, refinement).await?;
            if let Some(t) = self.phase_boundary(&summarized, &mut outage_streak) {
                break t;
            }

            let consolidated =
                consolidate::run(&mut state, catalog, &self.judge, &self.config).await?;
            state.verify_partition(catalog)?;
            if let Some(t) = self.phase_boundary(&consolidated, &mut outage_streak) {
                break t;
            }

            let reassigned =
                reassign::run(&mut state, catalog, &self.judge, refinement).await?;
            state.verify_partition(catalog)?;
            if let Some(t) = self.phase_boundary(&reassigned, &mut outage_streak) {
                break t;
            }

            let structural = consolidated.accepted + reassigned.accepted;
            let settled = state.groups.values().all(|g| g.summary_current());
            if structural == 0 && state.pool.is_drained() && settled {
                break Termination::Converged;
            }
        };

        info!(
            iteration = state.iteration,
            groups = state.groups.len(),
            unassignable = state.pool.unassignable.len(),
            ?termination,
            "refinement finished"
        );
        state.termination = Some(termination);
        state.verify_partition(catalog)?;
        Ok(state)
    }

    fn cancelled_termination(&self) -> Option<Termination> {
        self.cancelled.load(Ordering::SeqCst).then(|| {
            warn!("refinement cancelled");
            Termination::Aborted {
                detail: "cancelled by caller".into(),
            }
        })
    }

    /// Outage accounting and cancellation, applied after every phase.
    /// Phases that issued no judge calls neither extend nor reset the
    /// outage streak.
    fn phase_boundary(&self, stats: &PhaseStats, outage_streak: &mut u32) -> Option<Termination> {
        if stats.total_outage() {
            *outage_streak += 1;
            warn!(streak = *outage_streak, "judge unreachable for an entire phase");
            if *outage_streak >= JUDGE_OUTAGE_ITERATIONS {
                return Some(Termination::Aborted {
                    detail: format!(
                        "judge unavailable for {outage_streak} consecutive phases"
                    ),
                });
            }
        } else if stats.calls > 0 {
            *outage_streak = 0;
        }
        self.cancelled_termination()
    }
}
