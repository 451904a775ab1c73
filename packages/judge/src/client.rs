use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::JudgeError;
use crate::types::{CatalogProblem, Contest, Submission, User, Verdict};

/// Read-only queries against the external judge. The polling cadence and
/// retry policy live behind this trait so the orchestration core never has
/// to know which judge it is talking to.
#[async_trait]
pub trait JudgeClient: Send + Sync {
    /// Resolve a handle to an account, or fail if the judge does not know it.
    async fn check_handle(&self, handle: &str) -> Result<User, JudgeError>;

    /// Full submission history for a handle, newest first (judge order).
    async fn user_submissions(&self, handle: &str) -> Result<Vec<Submission>, JudgeError>;

    /// The judge's full problem catalog.
    async fn problem_list(&self) -> Result<Vec<CatalogProblem>, JudgeError>;

    /// The judge's contest list.
    async fn contest_list(&self) -> Result<Vec<Contest>, JudgeError>;
}

/// Codeforces REST API response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: EnvelopeStatus,
    comment: Option<String>,
    result: Option<T>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum EnvelopeStatus {
    Ok,
    Failed,
}

/// Wire shape of one `user.status` entry before flattening.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSubmission {
    problem: WireProblem,
    creation_time_seconds: i64,
    #[serde(default)]
    verdict: Option<Verdict>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProblem {
    #[serde(default)]
    contest_id: Option<i64>,
    index: String,
    name: String,
    #[serde(default)]
    rating: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ProblemsetResult {
    problems: Vec<CatalogProblem>,
}

/// Judge client for the Codeforces API.
pub struct CodeforcesClient {
    http: reqwest::Client,
    base_url: String,
    max_attempts: u32,
    rate_limit_pause: Duration,
}

impl CodeforcesClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://codeforces.com/api";

    pub fn new(
        base_url: impl Into<String>,
        max_attempts: u32,
        rate_limit_pause: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            max_attempts: max_attempts.max(1),
            rate_limit_pause,
        }
    }

    /// Run one judge query with the bounded retry policy: up to
    /// `max_attempts` tries, a rate-limit response (HTTP 503) pauses before
    /// the next try, a FAILED envelope is retried immediately and returned
    /// as-is once attempts run out. Transport errors propagate at once.
    async fn query<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, JudgeError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let mut last_comment = String::from("judge returned no result");

        for attempt in 1..=self.max_attempts {
            let response = self.http.get(&url).query(params).send().await?;

            if response.status() == StatusCode::SERVICE_UNAVAILABLE {
                warn!(path, attempt, "judge rate limit hit, pausing");
                last_comment = "limit exceeded".into();
                tokio::time::sleep(self.rate_limit_pause).await;
                continue;
            }

            let envelope: Envelope<T> = response.json().await?;
            if envelope.status == EnvelopeStatus::Ok
                && let Some(result) = envelope.result
            {
                return Ok(result);
            }
            if let Some(comment) = envelope.comment {
                last_comment = comment;
            }
            debug!(path, attempt, comment = %last_comment, "judge query failed");
        }

        Err(JudgeError::Rejected {
            comment: last_comment,
        })
    }
}

#[async_trait]
impl JudgeClient for CodeforcesClient {
    async fn check_handle(&self, handle: &str) -> Result<User, JudgeError> {
        let users: Vec<User> = self.query("user.info", &[("handles", handle)]).await?;
        users.into_iter().next().ok_or_else(|| JudgeError::Rejected {
            comment: format!("handle {handle} not found"),
        })
    }

    async fn user_submissions(&self, handle: &str) -> Result<Vec<Submission>, JudgeError> {
        let raw: Vec<WireSubmission> = self.query("user.status", &[("handle", handle)]).await?;
        Ok(flatten_submissions(raw))
    }

    async fn problem_list(&self) -> Result<Vec<CatalogProblem>, JudgeError> {
        let result: ProblemsetResult = self.query("problemset.problems", &[]).await?;
        Ok(result.problems)
    }

    async fn contest_list(&self) -> Result<Vec<Contest>, JudgeError> {
        self.query("contest.list", &[]).await
    }
}

/// Flatten nested wire submissions, dropping entries without a rated,
/// contest-bound problem.
fn flatten_submissions(raw: Vec<WireSubmission>) -> Vec<Submission> {
    raw.into_iter()
        .filter_map(|sub| {
            let contest_id = sub.problem.contest_id?;
            let rating = sub.problem.rating?;
            Some(Submission {
                contest_id,
                index: sub.problem.index,
                name: sub.problem.name,
                rating,
                creation_time_seconds: sub.creation_time_seconds,
                verdict: sub.verdict,
            })
        })
        .collect()
}
