//! Markdown rendering of a terminal refinement state.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use tracing::info;

use thema_clustering::representatives;
use thema_core::constants::DEFAULT_REPRESENTATIVES;
use thema_core::errors::{ThemaError, ThemaResult};
use thema_core::models::{Group, RefinementState, Relevance, Termination};
use thema_core::review::{Review, ReviewCatalog};
use thema_core::traits::ReportSink;

const MAX_CELL_CHARS: usize = 100;

/// Render the state as a markdown document.
///
/// `generated_at` is a parameter rather than `Utc::now()` so identical
/// states render to identical documents.
pub fn render_report(
    state: &RefinementState,
    catalog: &ReviewCatalog,
    source: &str,
    generated_at: DateTime<Utc>,
) -> ThemaResult<String> {
    let mut relevant: Vec<&Group> = state.relevant_groups().collect();
    let irrelevant: Vec<&Group> = state
        .groups
        .values()
        .filter(|g| g.relevance == Relevance::Irrelevant)
        .collect();
    // Groups without a verdict (aborted or cap-terminated runs) are
    // reported separately from the judged-irrelevant ones.
    let unjudged: Vec<&Group> = state
        .groups
        .values()
        .filter(|g| g.relevance == Relevance::Unjudged)
        .collect();

    // Worst-rated themes first; group id breaks exact-average ties.
    let mut rated: Vec<(f64, &Group)> = Vec::with_capacity(relevant.len());
    for group in relevant.drain(..) {
        rated.push((average_rating(group, catalog)?, group));
    }
    rated.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.id.cmp(&b.1.id)));

    let mut doc = String::new();
    let _ = writeln!(doc, "# Thematic Group Report for {source}\n");
    let _ = writeln!(
        doc,
        "*Generated on: {}*\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let _ = writeln!(doc, "## Overview\n");
    let _ = writeln!(doc, "- **Source**: {source}");
    let _ = writeln!(doc, "- **Total reviews**: {}", catalog.len());
    let _ = writeln!(doc, "- **Relevant groups**: {}", rated.len());
    let _ = writeln!(doc, "- **Irrelevant groups**: {}", irrelevant.len());
    let _ = writeln!(doc, "- **Unjudged groups**: {}", unjudged.len());
    let _ = writeln!(
        doc,
        "- **Unassignable reviews**: {}",
        state.pool.unassignable.len()
    );
    let _ = writeln!(doc, "- **Iterations**: {}", state.iteration);
    let _ = writeln!(doc, "- **Outcome**: {}\n", termination_line(state));

    let _ = writeln!(
        doc,
        "## Groups (sorted by average rating, worst to best)\n"
    );
    let total = rated.len();
    for (position, (avg_rating, group)) in rated.iter().enumerate() {
        render_group(&mut doc, group, catalog, position + 1, total, *avg_rating)?;
    }

    if !irrelevant.is_empty() {
        let _ = writeln!(doc, "## Irrelevant Groups\n");
        let _ = writeln!(
            doc,
            "*{} groups were judged irrelevant; their reviews are retained.*\n",
            irrelevant.len()
        );
        for group in &irrelevant {
            let theme = group
                .summary
                .as_ref()
                .map(|s| s.text.as_str())
                .unwrap_or("no summary");
            let _ = writeln!(
                doc,
                "- **{}** ({}): {} reviews",
                group.id,
                escape_cell(theme),
                group.len()
            );
        }
        let _ = writeln!(doc);
    }

    if !unjudged.is_empty() {
        let _ = writeln!(doc, "## Unjudged Groups\n");
        let _ = writeln!(
            doc,
            "*{} groups had no relevance verdict when the run ended.*\n",
            unjudged.len()
        );
        for group in &unjudged {
            let _ = writeln!(doc, "- **{}**: {} reviews", group.id, group.len());
        }
        let _ = writeln!(doc);
    }

    if !state.pool.is_empty() {
        render_pool(&mut doc, state, catalog)?;
    }

    Ok(doc)
}

/// Render and hand the document to a sink.
pub fn write_report(
    state: &RefinementState,
    catalog: &ReviewCatalog,
    source: &str,
    generated_at: DateTime<Utc>,
    sink: &mut dyn ReportSink,
) -> ThemaResult<()> {
    let doc = render_report(state, catalog, source, generated_at)?;
    info!(source, bytes = doc.len(), "report rendered");
    sink.emit(&doc)
}

fn render_group(
    doc: &mut String,
    group: &Group,
    catalog: &ReviewCatalog,
    position: usize,
    total: usize,
    avg_rating: f64,
) -> ThemaResult<()> {
    let theme = group
        .summary
        .as_ref()
        .map(|s| s.text.as_str())
        .unwrap_or("no summary");
    let _ = writeln!(doc, "### Group {position}/{total} ({})\n", group.id);
    let _ = writeln!(doc, "**Theme**: {}\n", escape_cell(theme));
    let _ = writeln!(doc, "- **Reviews**: {}", group.len());
    let _ = writeln!(doc, "- **Mean distance**: {:.4}", group.mean_distance);
    let _ = writeln!(doc, "- **Average rating**: {avg_rating:.1}/5\n");

    let _ = writeln!(doc, "#### Most Representative Reviews\n");
    let _ = writeln!(doc, "| ID | Rating | Distance | Title | Content |");
    let _ = writeln!(doc, "| --- | --- | --- | --- | --- |");
    for (id, distance) in representatives(group, catalog, DEFAULT_REPRESENTATIVES)? {
        let review = lookup(catalog, &id)?;
        let _ = writeln!(
            doc,
            "| {id} | {:.1}/5 | {distance:.4} | {} | {} |",
            review.review_rating,
            escape_cell(&review.review_title),
            truncate_cell(&review.review_details),
        );
    }
    let _ = writeln!(doc);
    Ok(())
}

fn render_pool(
    doc: &mut String,
    state: &RefinementState,
    catalog: &ReviewCatalog,
) -> ThemaResult<()> {
    let _ = writeln!(doc, "## Unassigned Reviews\n");
    let _ = writeln!(
        doc,
        "*{} reviews were not assigned to any group ({} unassignable).*\n",
        state.pool.len(),
        state.pool.unassignable.len()
    );
    let _ = writeln!(doc, "| ID | Status | Rating | Title | Content |");
    let _ = writeln!(doc, "| --- | --- | --- | --- | --- |");

    let pending = state.pool.pending.keys().map(|id| (id, "pending"));
    let unassignable = state.pool.unassignable.iter().map(|id| (id, "unassignable"));
    for (id, status) in pending.chain(unassignable) {
        let review = lookup(catalog, id)?;
        let _ = writeln!(
            doc,
            "| {id} | {status} | {:.1}/5 | {} | {} |",
            review.review_rating,
            escape_cell(&review.review_title),
            truncate_cell(&review.review_details),
        );
    }
    let _ = writeln!(doc);
    Ok(())
}

fn termination_line(state: &RefinementState) -> String {
    match &state.termination {
        Some(Termination::Converged) => "converged".into(),
        Some(Termination::MaxIterationsReached) => "iteration cap reached".into(),
        Some(Termination::Aborted { detail }) => format!("aborted ({detail})"),
        None => "not terminal".into(),
    }
}

fn average_rating(group: &Group, catalog: &ReviewCatalog) -> ThemaResult<f64> {
    let mut sum = 0.0f64;
    for id in &group.members {
        sum += f64::from(lookup(catalog, id)?.review_rating);
    }
    Ok(sum / group.members.len() as f64)
}

fn lookup<'a>(catalog: &'a ReviewCatalog, id: &thema_core::ReviewId) -> ThemaResult<&'a Review> {
    catalog.get(id).ok_or_else(|| ThemaError::PartitionViolation {
        details: format!("report references unknown review {id}"),
    })
}

/// Pipes and newlines break markdown table cells.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn truncate_cell(text: &str) -> String {
    let escaped = escape_cell(text);
    if escaped.chars().count() > MAX_CELL_CHARS {
        let head: String = escaped.chars().take(MAX_CELL_CHARS - 3).collect();
        format!("{head}...")
    } else {
        escaped
    }
}
