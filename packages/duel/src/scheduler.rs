use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::error::DuelError;
use crate::event::{DuelEvent, EventSink};
use crate::model::{Duel, Slot};
use crate::service::DuelService;

/// Runs the two periodic loops of every ONGOING duel and owns their
/// cancellation tokens. The registry is the only place loop handles live;
/// an entry is removed exactly once, when its duel leaves ONGOING.
pub struct SessionScheduler {
    service: Arc<DuelService>,
    events: Arc<dyn EventSink>,
    config: SchedulerConfig,
    sessions: DashMap<Uuid, CancellationToken>,
}

impl SessionScheduler {
    pub fn new(
        service: Arc<DuelService>,
        events: Arc<dyn EventSink>,
        config: SchedulerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            service,
            events,
            config,
            sessions: DashMap::new(),
        })
    }

    /// Gateway entry point for the `start` action: run the READY -> ONGOING
    /// transition and, if this call won it, spawn the session loops.
    pub async fn start_duel(self: &Arc<Self>, id: Uuid) -> Result<Option<Duel>, DuelError> {
        let Some(duel) = self.service.start(id).await? else {
            return Ok(None);
        };
        self.spawn_session(&duel);
        Ok(Some(duel))
    }

    /// Re-attach loops to a duel that is already ONGOING, e.g. after a
    /// process restart. Loops for a non-ONGOING duel exit on their first tick.
    pub fn resume(self: &Arc<Self>, duel: &Duel) {
        self.spawn_session(duel);
    }

    fn spawn_session(self: &Arc<Self>, duel: &Duel) {
        let token = CancellationToken::new();
        if let Some(stale) = self.sessions.insert(duel.id, token.clone()) {
            warn!(duel_id = %duel.id, "replacing live session registration");
            stale.cancel();
        }

        let started_at = duel.start_time.unwrap_or_else(Utc::now);
        let max_duration = duel.max_duration();

        let scheduler = Arc::clone(self);
        let id = duel.id;
        let reconcile_token = token.clone();
        tokio::spawn(async move { scheduler.reconcile_loop(id, reconcile_token).await });

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            scheduler
                .countdown_loop(id, started_at, max_duration, token)
                .await
        });

        info!(duel_id = %duel.id, "session loops started");
    }

    /// Poll the judge and recompute scores until the duel is decided. The
    /// tick body runs inline, so passes for one duel never overlap.
    async fn reconcile_loop(self: Arc<Self>, id: Uuid, token: CancellationToken) {
        let mut interval =
            tokio::time::interval(Duration::from_millis(self.config.reconcile_interval_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }

            match self.service.reconcile(id).await {
                Ok(Some(duel)) => {
                    if Slot::BOTH.iter().any(|&slot| duel.solved_out(slot)) {
                        self.finish_duel(id).await;
                        break;
                    }
                }
                // The duel left ONGOING through another path.
                Ok(None) => {
                    self.stop_session(id);
                    break;
                }
                Err(DuelError::NotFound(_)) => {
                    self.stop_session(id);
                    break;
                }
                // Skipped pass; the next interval retries.
                Err(e) => {
                    warn!(duel_id = %id, error = %e, "reconciliation tick failed");
                }
            }
        }
    }

    /// Emit the remaining time every tick and finish the duel when the
    /// session's wall-clock budget is spent.
    async fn countdown_loop(
        self: Arc<Self>,
        id: Uuid,
        started_at: DateTime<Utc>,
        max_duration: TimeDelta,
        token: CancellationToken,
    ) {
        let mut interval =
            tokio::time::interval(Duration::from_millis(self.config.countdown_interval_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }

            let elapsed = Utc::now() - started_at;
            if elapsed >= max_duration {
                self.events.emit(DuelEvent::TimeUp { duel_id: id }).await;
                self.finish_duel(id).await;
                break;
            }
            let seconds_left = (max_duration - elapsed).num_milliseconds().saturating_add(999).div_euclid(1000);
            self.events
                .emit(DuelEvent::TimeLeft {
                    duel_id: id,
                    seconds_left,
                })
                .await;
        }
    }

    /// Terminal path shared by both loops. `DuelService::finish` is
    /// idempotent, so the loops may race into this freely; whoever arrives
    /// second observes a no-op and the session is torn down once.
    async fn finish_duel(&self, id: Uuid) {
        match self.service.finish(id).await {
            Ok(Some(_)) => {}
            // The other loop won the race.
            Ok(None) => {}
            Err(e) => error!(duel_id = %id, error = %e, "failed to finish duel"),
        }
        self.stop_session(id);
    }

    /// Cancel and forget a duel's loops. Removal from the registry is
    /// exactly-once; a second call finds nothing to do.
    pub fn stop_session(&self, id: Uuid) {
        if let Some((_, token)) = self.sessions.remove(&id) {
            token.cancel();
            info!(duel_id = %id, "session loops stopped");
        }
    }

    /// Number of duels with live loops.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}
