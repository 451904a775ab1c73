//! Orchestration core for timed head-to-head competitive-programming duels.
//!
//! The realtime gateway maps inbound player actions onto [`service::DuelService`]
//! operations (`create`, `join`, `submit_problem`) and onto
//! [`scheduler::SessionScheduler::start_duel`]; outbound lifecycle events come
//! back through the [`event::EventSink`] seam. Persistence and the external
//! judge are collaborators behind [`store::DuelStore`] and [`judge::JudgeClient`].

pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod scheduler;
pub mod scoring;
pub mod selector;
pub mod service;
pub mod store;

pub use error::DuelError;
pub use model::{Duel, DuelStatus};
