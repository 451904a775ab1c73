pub mod client;
pub mod error;
pub mod types;

pub use client::{CodeforcesClient, JudgeClient};
pub use error::JudgeError;
pub use types::{CatalogProblem, Contest, Submission, User, Verdict};
