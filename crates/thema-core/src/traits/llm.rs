use async_trait::async_trait;

use crate::errors::JudgeError;

/// Raw LLM transport surface: prompt in, schema-constrained JSON out.
///
/// Request signing, provider selection, and HTTP-level retries live behind
/// this trait, outside the workspace. Malformed output is a recoverable
/// `JudgeError::MalformedOutput`, never a crash.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete a prompt into a JSON value matching `schema`.
    async fn complete_structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, JudgeError>;

    /// Human-readable client name (provider/model).
    fn name(&self) -> &str;
}
