use thiserror::Error;
use uuid::Uuid;

use judge::JudgeError;

/// Application-level error type for duel operations.
#[derive(Debug, Error)]
pub enum DuelError {
    /// Bad duel configuration or request field. User-facing, non-retryable;
    /// duel state is unchanged.
    #[error("{0}")]
    Validation(String),

    /// Join with a handle already playing in this duel.
    #[error("Duplicate Handles")]
    DuplicateHandle,

    /// Join on a duel that already has two players.
    #[error("Duel Full")]
    RoomFull,

    /// The judge could not confirm the handle exists.
    #[error("Invalid Handle")]
    InvalidHandle,

    /// Submission from a uid that is not one of the two players.
    #[error("You are not recognized as a duel participant")]
    NotAParticipant,

    #[error("duel {0} not found")]
    NotFound(Uuid),

    /// Judge exhausted its retries or hit a transport failure. The current
    /// pass is skipped and retried on the next interval; never fatal to a duel.
    #[error("judge unavailable: {0}")]
    JudgeUnavailable(#[from] JudgeError),

    /// Not enough unsolved, in-range problems to start the duel. Fatal to
    /// this start attempt only; the duel stays READY.
    #[error("only {available} eligible problems for a duel of {requested}")]
    ConfigurationExhausted { available: usize, requested: u32 },

    /// Concurrent update raced on the same duel record. Callers retry with a
    /// fresh read; never silently dropped.
    #[error("conflicting concurrent update")]
    Conflict,

    /// The submission relay failed to forward a solution.
    #[error("submission relay error: {0}")]
    Relay(String),
}
