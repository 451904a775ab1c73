use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::model::DuelStatus;

/// Outbound lifecycle events, delivered to clients by the realtime gateway.
/// At-least-once; no ordering is guaranteed across duels. Join and create
/// rejections are not events: they are returned as errors to the requesting
/// caller, which relays them to that client only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum DuelEvent {
    StatusChange {
        duel_id: Uuid,
        new_status: DuelStatus,
    },
    ProblemChange {
        duel_id: Uuid,
    },
    TimeLeft {
        duel_id: Uuid,
        seconds_left: i64,
    },
    /// Terminal countdown event ("Time's up.").
    TimeUp {
        duel_id: Uuid,
    },
    ProblemSubmittedSuccess {
        duel_id: Uuid,
        uid: String,
    },
    ProblemSubmittedError {
        duel_id: Uuid,
        uid: String,
        message: String,
    },
}

/// Delivery seam towards the realtime gateway.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: DuelEvent);
}

/// Sink that forwards events into an unbounded channel.
pub struct ChannelSink {
    tx: UnboundedSender<DuelEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<DuelEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&self, event: DuelEvent) {
        // No receiver means no subscribers; events are fire-and-forget.
        let _ = self.tx.send(event);
    }
}
