use thiserror::Error;

/// Failure modes of a judge query.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// The judge itself reported failure, still failing after retries were
    /// exhausted. Carries the judge's own comment.
    #[error("judge rejected request: {comment}")]
    Rejected { comment: String },

    /// Transport-level failure, distinct from a judge-reported one. Not
    /// retried: the caller decides whether to try again on its next pass.
    #[error("judge transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
