use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a duel. Transitions are forward-only:
/// WAITING -> READY -> ONGOING -> FINISHED.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DuelStatus {
    Waiting,
    Ready,
    Ongoing,
    Finished,
}

impl DuelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Ready => "READY",
            Self::Ongoing => "ONGOING",
            Self::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for DuelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The judge hosting a duel's problems. Membership in this enum is the
/// platform validity check; only Codeforces has a working judge client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "CF")]
    Cf,
    #[serde(rename = "AT")]
    At,
    #[serde(rename = "LC")]
    Lc,
}

/// A participant. Index 0 in `Duel::players` is the owner/creator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub handle: String,
    pub uid: String,
}

/// Player position within a duel, used to index per-problem scoring state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    One,
    Two,
}

impl Slot {
    pub const BOTH: [Slot; 2] = [Slot::One, Slot::Two];

    pub const fn index(self) -> usize {
        match self {
            Slot::One => 0,
            Slot::Two => 1,
        }
    }
}

/// Per-player scoring state for one assigned problem.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemState {
    /// 0 until the first accepted verdict, then frozen at a positive value.
    pub score: f64,
    /// Non-pending submissions seen so far. Rebuilt from scratch on every
    /// reconciliation pass while the problem is unsolved.
    pub attempts: u32,
}

/// One assigned task. Identity and `points` are fixed at assignment time.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuelProblem {
    pub contest_id: i64,
    pub index: String,
    pub name: String,
    pub rating: i64,
    /// Maximum awardable score: `rating - rating_min + 100`.
    pub points: i64,
    pub slots: [ProblemState; 2],
}

impl DuelProblem {
    pub fn state(&self, slot: Slot) -> &ProblemState {
        &self.slots[slot.index()]
    }

    pub fn state_mut(&mut self, slot: Slot) -> &mut ProblemState {
        &mut self.slots[slot.index()]
    }

    pub fn solved(&self, slot: Slot) -> bool {
        self.state(slot).score > 0.0
    }
}

/// Aggregate score and solve count for one player. Derived: recomputed on
/// every reconciliation pass, never hand-edited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub score: f64,
    pub solves: u32,
}

/// Final result of a finished duel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "UPPERCASE")]
pub enum DuelOutcome {
    Won { winner: String },
    Tie,
}

/// Creation parameters for a new duel.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuelRequest {
    pub platform: Platform,
    pub owner_handle: String,
    pub owner_uid: String,
    pub problem_count: u32,
    pub rating_min: i64,
    pub rating_max: i64,
    pub time_limit_minutes: i64,
}

/// Root aggregate for one duel session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Duel {
    pub id: Uuid,
    pub status: DuelStatus,
    pub platform: Platform,
    pub players: Vec<Player>,
    pub problem_count: u32,
    pub rating_min: i64,
    pub rating_max: i64,
    pub time_limit_minutes: i64,
    /// Set exactly once, on the READY -> ONGOING transition.
    pub start_time: Option<DateTime<Utc>>,
    /// Assigned exactly once, when the duel starts.
    pub problems: Vec<DuelProblem>,
    pub totals: [Totals; 2],
    /// Set if and only if the duel is FINISHED.
    pub outcome: Option<DuelOutcome>,
    /// Bumped by the store on every accepted write; guards read-modify-write
    /// races between the two scheduler loops.
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl Duel {
    pub fn new(req: &DuelRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: DuelStatus::Waiting,
            platform: req.platform,
            players: vec![Player {
                handle: req.owner_handle.clone(),
                uid: req.owner_uid.clone(),
            }],
            problem_count: req.problem_count,
            rating_min: req.rating_min,
            rating_max: req.rating_max,
            time_limit_minutes: req.time_limit_minutes,
            start_time: None,
            problems: Vec::new(),
            totals: [Totals::default(); 2],
            outcome: None,
            version: 0,
            created_at: Utc::now(),
        }
    }

    /// Session length in wall-clock terms.
    pub fn max_duration(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.time_limit_minutes * 60_000)
    }

    /// The slot occupied by `uid`, if it belongs to one of the players.
    pub fn player_slot(&self, uid: &str) -> Option<Slot> {
        match self.players.iter().position(|p| p.uid == uid) {
            Some(0) => Some(Slot::One),
            Some(1) => Some(Slot::Two),
            _ => None,
        }
    }

    pub fn totals(&self, slot: Slot) -> Totals {
        self.totals[slot.index()]
    }

    /// True once the player has solved every assigned problem.
    pub fn solved_out(&self, slot: Slot) -> bool {
        self.problem_count > 0 && self.totals[slot.index()].solves == self.problem_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DuelRequest {
        DuelRequest {
            platform: Platform::Cf,
            owner_handle: "alice".into(),
            owner_uid: "uid-1".into(),
            problem_count: 3,
            rating_min: 1000,
            rating_max: 1400,
            time_limit_minutes: 30,
        }
    }

    #[test]
    fn new_duel_starts_waiting_with_owner_only() {
        let duel = Duel::new(&request());
        assert_eq!(duel.status, DuelStatus::Waiting);
        assert_eq!(duel.players.len(), 1);
        assert_eq!(duel.players[0].handle, "alice");
        assert!(duel.start_time.is_none());
        assert!(duel.outcome.is_none());
        assert!(duel.problems.is_empty());
    }

    #[test]
    fn status_order_is_monotonic() {
        assert!(DuelStatus::Waiting < DuelStatus::Ready);
        assert!(DuelStatus::Ready < DuelStatus::Ongoing);
        assert!(DuelStatus::Ongoing < DuelStatus::Finished);
    }

    #[test]
    fn player_slot_resolves_by_uid() {
        let mut duel = Duel::new(&request());
        duel.players.push(Player {
            handle: "bob".into(),
            uid: "uid-2".into(),
        });
        assert_eq!(duel.player_slot("uid-1"), Some(Slot::One));
        assert_eq!(duel.player_slot("uid-2"), Some(Slot::Two));
        assert_eq!(duel.player_slot("uid-3"), None);
    }

    #[test]
    fn max_duration_converts_minutes() {
        let duel = Duel::new(&request());
        assert_eq!(duel.max_duration(), TimeDelta::minutes(30));
    }

    #[test]
    fn outcome_serializes_with_tagged_shape() {
        let won = serde_json::to_value(DuelOutcome::Won {
            winner: "alice".into(),
        })
        .unwrap();
        assert_eq!(won["outcome"], "WON");
        assert_eq!(won["winner"], "alice");

        let tie = serde_json::to_value(DuelOutcome::Tie).unwrap();
        assert_eq!(tie["outcome"], "TIE");
    }

    #[test]
    fn platform_rejects_unknown_codes() {
        assert!(serde_json::from_str::<Platform>("\"CF\"").is_ok());
        assert!(serde_json::from_str::<Platform>("\"XX\"").is_err());
    }
}
