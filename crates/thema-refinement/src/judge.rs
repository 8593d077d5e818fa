//! LLM-backed judge: prompt construction, schema-constrained calls, and
//! verdict parsing over a raw `LlmClient`.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use thema_core::errors::JudgeError;
use thema_core::traits::{
    Decision, Judge, LlmClient, MergeProposal, ReassignProposal, SplitProposal, SummaryRequest,
    SummaryVerdict,
};

/// Judge implementation that delegates every call to a structured-output
/// LLM client.
///
/// A response that fails to parse is retried exactly once with a stricter
/// prompt; a second malformed response surfaces as
/// `JudgeError::MalformedOutput` and the caller's rejection policy takes
/// over.
pub struct LlmJudge {
    client: Arc<dyn LlmClient>,
}

impl LlmJudge {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    fn summary_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "summary": { "type": "string" },
                "relevant": { "type": "boolean" }
            },
            "required": ["summary", "relevant"],
            "additionalProperties": false
        })
    }

    fn decision_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "decision": { "type": "string", "enum": ["accept", "reject"] }
            },
            "required": ["decision"],
            "additionalProperties": false
        })
    }

    /// Call the client, reprompting once if the response does not parse.
    async fn call_parsed<T, P>(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        parse: P,
    ) -> Result<T, JudgeError>
    where
        P: Fn(serde_json::Value) -> Result<T, JudgeError>,
    {
        match parse(self.client.complete_structured(prompt, schema).await?) {
            Ok(value) => Ok(value),
            Err(first) => {
                warn!(client = self.client.name(), error = %first, "malformed judge output, reprompting once");
                let strict = format!(
                    "{prompt}\n\nYour previous answer did not match the required schema. \
                     Respond with ONLY a JSON object matching the schema, no prose."
                );
                parse(self.client.complete_structured(&strict, schema).await?)
            }
        }
    }
}

fn parse_summary(value: serde_json::Value) -> Result<SummaryVerdict, JudgeError> {
    serde_json::from_value(value).map_err(|e| JudgeError::MalformedOutput {
        detail: format!("summary verdict: {e}"),
    })
}

fn parse_decision(value: serde_json::Value) -> Result<Decision, JudgeError> {
    #[derive(serde::Deserialize)]
    struct Wire {
        decision: Decision,
    }
    serde_json::from_value::<Wire>(value)
        .map(|w| w.decision)
        .map_err(|e| JudgeError::MalformedOutput {
            detail: format!("decision: {e}"),
        })
}

fn summary_prompt(req: &SummaryRequest) -> String {
    let mut prompt = String::from(
        "You are reviewing a group of customer reviews that were clustered together.\n\
         Write a one-sentence summary of the group's shared theme, and judge whether\n\
         the theme is relevant product feedback (as opposed to spam, shipping-carrier\n\
         noise, or off-topic content).\n\nRepresentative reviews:\n",
    );
    for rep in &req.representatives {
        let _ = writeln!(
            prompt,
            "- [{:.1}/5] {}: {}",
            rep.rating, rep.title, rep.body
        );
    }
    prompt
}

fn merge_prompt(p: &MergeProposal) -> String {
    format!(
        "Two review groups have very similar centroids (distance {:.3}).\n\
         Group A: {}\nGroup B: {}\n\n\
         Should they be merged into one group? Accept only if they describe the\n\
         same underlying theme.",
        p.centroid_distance, p.left_summary, p.right_summary
    )
}

fn split_prompt(p: &SplitProposal) -> String {
    format!(
        "A review group of {} reviews is unusually spread out (mean member-to-centroid\n\
         distance {:.3}).\nGroup theme: {}\n\n\
         Should it be split into tighter subgroups? Accept only if the theme plausibly\n\
         covers more than one distinct topic.",
        p.size, p.mean_distance, p.summary
    )
}

fn reassign_prompt(p: &ReassignProposal) -> String {
    format!(
        "An unclustered review is nearest to an existing group (centroid distance {:.3}).\n\
         Group theme: {}\nReview title: {}\nReview body: {}\n\n\
         Should the review join the group? Accept only if it fits the theme.",
        p.centroid_distance, p.group_summary, p.title, p.body
    )
}

#[async_trait]
impl Judge for LlmJudge {
    async fn summarize(&self, req: &SummaryRequest) -> Result<SummaryVerdict, JudgeError> {
        self.call_parsed(&summary_prompt(req), &Self::summary_schema(), parse_summary)
            .await
    }

    async fn review_merge(&self, proposal: &MergeProposal) -> Result<Decision, JudgeError> {
        self.call_parsed(&merge_prompt(proposal), &Self::decision_schema(), parse_decision)
            .await
    }

    async fn review_split(&self, proposal: &SplitProposal) -> Result<Decision, JudgeError> {
        self.call_parsed(&split_prompt(proposal), &Self::decision_schema(), parse_decision)
            .await
    }

    async fn review_reassignment(
        &self,
        proposal: &ReassignProposal,
    ) -> Result<Decision, JudgeError> {
        self.call_parsed(
            &reassign_prompt(proposal),
            &Self::decision_schema(),
            parse_decision,
        )
        .await
    }
}
