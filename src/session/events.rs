use serde::Serialize;

use crate::models::WatchSession;

/// Inbound signals from the integrity components into the state machine.
/// Every component reports through one channel; the first violation in an
/// attempt wins and later ones are no-ops until retry.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionSignal {
    /// Verified watch-time met the completion threshold at end-of-stream.
    Completion,
    /// Integrity violation with a user-facing reason, shown verbatim.
    Violation { reason: String },
    /// The viewing surface lost visibility or input focus.
    FocusLost,
    /// The viewing surface regained visibility and focus.
    FocusRestored,
    /// The player stopped reporting position; fatal to this attempt.
    PlayerFault { message: String },
}

/// Outbound notifications to the embedding layer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    PhaseChanged { session: WatchSession },
    #[serde(rename_all = "camelCase")]
    Heartbeat {
        verified_secs: f64,
        remaining_secs: f64,
        watched_pct: f64,
    },
    #[serde(rename_all = "camelCase")]
    FocusWarning { remaining_allowances: u32 },
    FocusRecovered,
}

/// Sink for session events; the embedding layer decides how to render or
/// forward them.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SessionEvent);
}
