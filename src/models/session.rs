use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::WatchTask;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    /// Identity precondition not yet satisfied.
    Gate,
    Playing,
    Completed,
    Violation,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Gate => "Gate",
            SessionPhase::Playing => "Playing",
            SessionPhase::Completed => "Completed",
            SessionPhase::Violation => "Violation",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Violation)
    }
}

/// Snapshot of one watch attempt, emitted to the embedding layer on every
/// phase change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchSession {
    pub id: String,
    pub task: WatchTask,
    pub phase: SessionPhase,
    pub violation_reason: Option<String>,
    pub started_at: DateTime<Utc>,
    pub verified_secs: f64,
    pub remaining_secs: f64,
}
