use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use judge::JudgeClient;

use crate::error::DuelError;
use crate::event::{DuelEvent, EventSink};
use crate::model::{Duel, DuelOutcome, DuelRequest, DuelStatus, Player, Slot};
use crate::scoring;
use crate::selector;
use crate::store::DuelStore;

pub const MIN_PROBLEM_COUNT: u32 = 1;
pub const MAX_PROBLEM_COUNT: u32 = 10;
pub const MIN_RATING: i64 = 800;
pub const MAX_RATING: i64 = 3000;
pub const MIN_TIME_LIMIT_MINUTES: i64 = 5;
pub const MAX_TIME_LIMIT_MINUTES: i64 = 180;

/// Outbound seam to whatever submits code on a player's behalf. Opaque: the
/// core only cares whether the forward succeeded.
#[async_trait]
pub trait SubmissionRelay: Send + Sync {
    async fn submit(&self, contest_id: i64, index: &str, content: &str) -> anyhow::Result<()>;
}

/// One player's solution for an assigned problem, as received from the
/// gateway.
#[derive(Clone, Debug, Deserialize)]
pub struct ProblemSubmission {
    /// 1-based position in the duel's problem list.
    pub number: usize,
    pub content: String,
}

/// The duel state machine. Owns every mutation of duel records: the
/// scheduler loops and the gateway both go through these operations, and
/// nothing else writes a duel.
///
/// Transition-requesting operations called in the wrong state return
/// `Ok(None)` rather than an error, because concurrent clients race to
/// trigger the same transition.
pub struct DuelService {
    store: Arc<dyn DuelStore>,
    judge: Arc<dyn JudgeClient>,
    relay: Arc<dyn SubmissionRelay>,
    events: Arc<dyn EventSink>,
}

impl DuelService {
    pub fn new(
        store: Arc<dyn DuelStore>,
        judge: Arc<dyn JudgeClient>,
        relay: Arc<dyn SubmissionRelay>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            judge,
            relay,
            events,
        }
    }

    /// Validate creation parameters. Platform membership is enforced by the
    /// `Platform` type at the deserialization boundary; the remaining
    /// predicates mirror the judge's rating scale and sane session lengths.
    pub async fn validate_request(&self, req: &DuelRequest) -> Result<(), DuelError> {
        if self.judge.check_handle(&req.owner_handle).await.is_err() {
            return Err(DuelError::InvalidHandle);
        }
        if !(MIN_PROBLEM_COUNT..=MAX_PROBLEM_COUNT).contains(&req.problem_count) {
            return Err(DuelError::Validation("Invalid Problem Count".into()));
        }
        if req.rating_min > req.rating_max
            || req.rating_min < MIN_RATING
            || req.rating_max > MAX_RATING
        {
            return Err(DuelError::Validation("Invalid Ratings".into()));
        }
        if !(MIN_TIME_LIMIT_MINUTES..=MAX_TIME_LIMIT_MINUTES).contains(&req.time_limit_minutes) {
            return Err(DuelError::Validation("Invalid Time Limit".into()));
        }
        Ok(())
    }

    /// Create a WAITING duel with the owner as player one.
    pub async fn create(&self, req: DuelRequest) -> Result<Duel, DuelError> {
        self.validate_request(&req).await?;
        let duel = Duel::new(&req);
        self.store.insert(duel.clone()).await?;
        info!(duel_id = %duel.id, owner = %req.owner_handle, "duel created");
        Ok(duel)
    }

    pub async fn find(&self, id: Uuid) -> Result<Duel, DuelError> {
        self.store.find(id).await
    }

    /// Second player joins: WAITING -> READY. Returns `Ok(None)` when the
    /// duel is not WAITING (lost race, no-op).
    pub async fn join(&self, id: Uuid, handle: &str, uid: &str) -> Result<Option<Duel>, DuelError> {
        let duel = self.store.find(id).await?;
        if duel.status != DuelStatus::Waiting {
            return Ok(None);
        }
        self.validate_join(&duel, handle).await?;

        let updated = self
            .update_duel(id, |duel| {
                if duel.status != DuelStatus::Waiting {
                    return Ok(false);
                }
                // Revalidated inside the write loop: two joins can race past
                // the check above.
                if duel.players.len() >= 2 {
                    return Err(DuelError::RoomFull);
                }
                if duel.players[0].handle == handle {
                    return Err(DuelError::DuplicateHandle);
                }
                duel.players.push(Player {
                    handle: handle.into(),
                    uid: uid.into(),
                });
                duel.status = DuelStatus::Ready;
                Ok(true)
            })
            .await?;

        if updated.is_some() {
            info!(duel_id = %id, handle, "player joined");
            self.events
                .emit(DuelEvent::StatusChange {
                    duel_id: id,
                    new_status: DuelStatus::Ready,
                })
                .await;
        }
        Ok(updated)
    }

    async fn validate_join(&self, duel: &Duel, handle: &str) -> Result<(), DuelError> {
        if duel.players.len() >= 2 {
            return Err(DuelError::RoomFull);
        }
        if duel.players[0].handle == handle {
            return Err(DuelError::DuplicateHandle);
        }
        if self.judge.check_handle(handle).await.is_err() {
            return Err(DuelError::InvalidHandle);
        }
        Ok(())
    }

    /// READY -> ONGOING: assign problems, record the start time, announce
    /// the session. Returns `Ok(None)` when the duel is not READY. On a
    /// selector failure the duel stays READY and the error surfaces to the
    /// starter.
    pub async fn start(&self, id: Uuid) -> Result<Option<Duel>, DuelError> {
        let duel = self.store.find(id).await?;
        if duel.status != DuelStatus::Ready {
            return Ok(None);
        }
        let [owner, challenger] = duel.players.as_slice() else {
            return Ok(None);
        };
        let problems = selector::select_problems(
            self.judge.as_ref(),
            [owner.handle.as_str(), challenger.handle.as_str()],
            duel.problem_count,
            duel.rating_min,
            duel.rating_max,
        )
        .await?;

        let start_time = Utc::now();
        let updated = self
            .update_duel(id, |duel| {
                if duel.status != DuelStatus::Ready {
                    return Ok(false);
                }
                duel.status = DuelStatus::Ongoing;
                duel.start_time = Some(start_time);
                duel.problems = problems.clone();
                Ok(true)
            })
            .await?;

        let Some(started) = updated else {
            return Ok(None);
        };
        info!(
            duel_id = %id,
            problems = started.problems.len(),
            time_limit_minutes = started.time_limit_minutes,
            "duel started"
        );
        self.events
            .emit(DuelEvent::StatusChange {
                duel_id: id,
                new_status: DuelStatus::Ongoing,
            })
            .await;
        self.events
            .emit(DuelEvent::ProblemChange { duel_id: id })
            .await;
        self.events
            .emit(DuelEvent::TimeLeft {
                duel_id: id,
                seconds_left: started.time_limit_minutes * 60,
            })
            .await;
        Ok(Some(started))
    }

    /// Forward a player's solution to the submission relay. Never touches
    /// scores: the authoritative verdict arrives through reconciliation.
    pub async fn submit_problem(
        &self,
        id: Uuid,
        uid: &str,
        submission: ProblemSubmission,
    ) -> Result<(), DuelError> {
        let duel = self.store.find(id).await?;
        if duel.player_slot(uid).is_none() {
            warn!(duel_id = %id, uid, "submission from unrecognized uid");
            self.events
                .emit(DuelEvent::ProblemSubmittedError {
                    duel_id: id,
                    uid: uid.into(),
                    message: DuelError::NotAParticipant.to_string(),
                })
                .await;
            return Err(DuelError::NotAParticipant);
        }
        let problem = submission
            .number
            .checked_sub(1)
            .and_then(|i| duel.problems.get(i))
            .ok_or_else(|| DuelError::Validation("Invalid Problem Number".into()))?;

        match self
            .relay
            .submit(problem.contest_id, &problem.index, &submission.content)
            .await
        {
            Ok(()) => {
                info!(duel_id = %id, uid, problem = %problem.index, "solution forwarded");
                self.events
                    .emit(DuelEvent::ProblemSubmittedSuccess {
                        duel_id: id,
                        uid: uid.into(),
                    })
                    .await;
                Ok(())
            }
            Err(e) => {
                warn!(duel_id = %id, uid, error = %e, "solution forwarding failed");
                self.events
                    .emit(DuelEvent::ProblemSubmittedError {
                        duel_id: id,
                        uid: uid.into(),
                        message: e.to_string(),
                    })
                    .await;
                Err(DuelError::Relay(e.to_string()))
            }
        }
    }

    /// One reconciliation pass: poll both players' histories, replay them
    /// through the scoring engine, persist the scoreboard and aggregates.
    /// Returns `Ok(None)` unless the duel is ONGOING. A judge failure
    /// surfaces as `JudgeUnavailable` and leaves the duel untouched.
    pub async fn reconcile(&self, id: Uuid) -> Result<Option<Duel>, DuelError> {
        let duel = self.store.find(id).await?;
        if duel.status != DuelStatus::Ongoing {
            return Ok(None);
        }
        let [owner, challenger] = duel.players.as_slice() else {
            return Ok(None);
        };
        let histories = [
            self.judge.user_submissions(&owner.handle).await?,
            self.judge.user_submissions(&challenger.handle).await?,
        ];

        self.update_duel(id, |duel| {
            if duel.status != DuelStatus::Ongoing {
                return Ok(false);
            }
            for slot in Slot::BOTH {
                scoring::apply_history(&mut duel.problems, slot, &histories[slot.index()]);
                duel.totals[slot.index()] = scoring::aggregate(&duel.problems, slot);
            }
            Ok(true)
        })
        .await
    }

    /// Terminal transition: ONGOING -> FINISHED. Idempotent — both scheduler
    /// loops may race into it; only the first caller writes the outcome, the
    /// loser observes a non-ONGOING status and gets `Ok(None)`.
    pub async fn finish(&self, id: Uuid) -> Result<Option<Duel>, DuelError> {
        if self.store.find(id).await?.status != DuelStatus::Ongoing {
            return Ok(None);
        }
        // Final pass; a judge outage here must not block termination.
        if let Err(e) = self.reconcile(id).await {
            warn!(duel_id = %id, error = %e, "final reconciliation failed, scoring as-is");
        }
        let updated = self
            .update_duel(id, |duel| {
                if duel.status != DuelStatus::Ongoing {
                    return Ok(false);
                }
                duel.outcome = Some(decide_outcome(duel));
                duel.status = DuelStatus::Finished;
                Ok(true)
            })
            .await?;

        if let Some(finished) = &updated {
            info!(duel_id = %id, outcome = ?finished.outcome, "duel finished");
            self.events
                .emit(DuelEvent::StatusChange {
                    duel_id: id,
                    new_status: DuelStatus::Finished,
                })
                .await;
        }
        Ok(updated)
    }

    /// Read-modify-write with conflict retry. The closure refuses the write
    /// by returning an error, or skips it (no-op) by returning `Ok(false)`.
    async fn update_duel<F>(&self, id: Uuid, mut mutate: F) -> Result<Option<Duel>, DuelError>
    where
        F: FnMut(&mut Duel) -> Result<bool, DuelError>,
    {
        loop {
            let mut duel = self.store.find(id).await?;
            if !mutate(&mut duel)? {
                return Ok(None);
            }
            match self.store.update(duel).await {
                Ok(updated) => return Ok(Some(updated)),
                Err(DuelError::Conflict) => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Scoreboard comparison: higher aggregate wins, equal totals tie.
fn decide_outcome(duel: &Duel) -> DuelOutcome {
    let one = duel.totals(Slot::One).score;
    let two = duel.totals(Slot::Two).score;
    if one > two {
        DuelOutcome::Won {
            winner: duel.players[0].handle.clone(),
        }
    } else if two > one {
        DuelOutcome::Won {
            winner: duel.players[1].handle.clone(),
        }
    } else {
        DuelOutcome::Tie
    }
}
