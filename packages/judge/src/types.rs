use std::fmt;

use serde::{Deserialize, Serialize};

/// Judge verdict for a single submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// Full acceptance.
    #[serde(rename = "OK")]
    Ok,
    /// Still being judged. Neither counts as an attempt nor affects score.
    #[serde(rename = "TESTING")]
    Testing,
    /// Any other final verdict (wrong answer, TLE, compile error, ...).
    #[serde(other, rename = "REJECTED")]
    Rejected,
}

impl Verdict {
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Self::Testing)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::Testing => "TESTING",
            Self::Rejected => "REJECTED",
        })
    }
}

/// A judge account, as returned by handle lookup.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub handle: String,
    #[serde(default)]
    pub rating: Option<i64>,
}

/// One entry of a user's submission history, flattened from the judge's
/// nested `{problem, verdict}` wire shape. Entries without a problem rating
/// never reach this type; unrated problems do not participate in scoring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub contest_id: i64,
    pub index: String,
    pub name: String,
    pub rating: i64,
    pub creation_time_seconds: i64,
    /// `None` when the judge has not produced a verdict yet.
    pub verdict: Option<Verdict>,
}

/// A problem from the judge's catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProblem {
    #[serde(default)]
    pub contest_id: Option<i64>,
    pub index: String,
    pub name: String,
    #[serde(default)]
    pub rating: Option<i64>,
}

/// A contest from the judge's contest list.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contest {
    pub id: i64,
    pub name: String,
    pub phase: String,
}
