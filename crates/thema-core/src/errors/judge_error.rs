/// Errors from the LLM judge collaborator.
///
/// All variants are recoverable at the phase level: `Unavailable` is
/// retried with backoff, `Timeout` and `MalformedOutput` are treated as
/// rejections under the conservative default policy.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("judge unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("judge call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("malformed judge output: {detail}")]
    MalformedOutput { detail: String },
}
