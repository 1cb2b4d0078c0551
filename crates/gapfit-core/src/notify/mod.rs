//! Notification policy, history, and the decision rule engine.
//!
//! This module provides:
//! - [`NotificationPolicy`] -- user-owned level and quiet-hours configuration
//! - [`NotificationHistoryStore`] -- durable log of sends and feedback
//! - [`NotificationRuleEngine`] -- the ordered gate that decides whether a
//!   notification of a given kind may fire now

mod history;
mod policy;
mod rules;

pub use history::{
    ignore_rate, response_rate, MemoryHistoryStore, NotificationHistoryStore, NotificationKind,
    NotificationRecord, RecordMutation, MAX_HISTORY_RECORDS,
};
pub use policy::{recommend_level, NotificationPolicy, PolicyLevel};
pub use rules::{DecisionContext, NotificationRule, NotificationRuleEngine};
