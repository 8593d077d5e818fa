//! Cluster-count selection: the knee (maximum-curvature) point of a
//! count-vs-quality curve, via normalized second differences.

use thema_core::errors::ClusterError;

/// Outcome of knee selection. `Fallback` signals a degenerate curve —
/// the caller gets the configured default count plus the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KneeOutcome {
    Knee(usize),
    Fallback { count: usize, reason: String },
}

impl KneeOutcome {
    pub fn count(&self) -> usize {
        match self {
            KneeOutcome::Knee(c) => *c,
            KneeOutcome::Fallback { count, .. } => *count,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, KneeOutcome::Fallback { .. })
    }
}

/// Pick the knee of a quality curve over a contiguous candidate range.
///
/// For each interior candidate `i` the normalized second difference
/// `(q[i−1] − 2·q[i] + q[i+1]) / max(|q[i]|, ε)` is computed; the
/// candidate maximizing it is the knee. Fewer than 3 candidates, or a
/// curve with no positive interior maximum, is degenerate: the fallback
/// count is returned and a `DegenerateCurveWarning` is logged.
pub fn select_count(
    counts: &[usize],
    quality: &[f64],
    fallback: usize,
) -> Result<KneeOutcome, ClusterError> {
    if counts.is_empty() {
        return Err(ClusterError::EmptyInput {
            operation: "select_count".into(),
        });
    }
    if counts.len() != quality.len() {
        return Err(ClusterError::DimensionMismatch {
            expected: counts.len(),
            actual: quality.len(),
        });
    }
    if counts.len() < 2 {
        return Err(ClusterError::InsufficientData {
            needed: 2,
            got: counts.len(),
        });
    }
    if counts.windows(2).any(|w| w[1] != w[0] + 1) {
        return Err(ClusterError::ClusteringFailed {
            reason: "candidate counts must be contiguous ascending".into(),
        });
    }

    if counts.len() < 3 {
        let reason = format!("only {} candidates, no interior point", counts.len());
        tracing::warn!(%reason, fallback, "DegenerateCurveWarning: falling back to default count");
        return Ok(KneeOutcome::Fallback {
            count: fallback,
            reason,
        });
    }

    let mut best: Option<(usize, f64)> = None;
    for i in 1..counts.len() - 1 {
        let second_diff = quality[i - 1] - 2.0 * quality[i] + quality[i + 1];
        let normalized = second_diff / quality[i].abs().max(f64::EPSILON);
        // Strict comparison keeps the smallest count on ties.
        if best.map_or(true, |(_, b)| normalized > b) {
            best = Some((counts[i], normalized));
        }
    }

    match best {
        Some((count, curvature)) if curvature > 0.0 => {
            tracing::debug!(count, curvature, "knee selected");
            Ok(KneeOutcome::Knee(count))
        }
        _ => {
            let reason = "curve is monotone with no interior maximum".to_string();
            tracing::warn!(%reason, fallback, "DegenerateCurveWarning: falling back to default count");
            Ok(KneeOutcome::Fallback {
                count: fallback,
                reason,
            })
        }
    }
}
