use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{SessionPhase, WatchSession, WatchTask};

/// Internal mutable state of one watch session. Transition methods return
/// whether they applied, so callers can make the first violation win and
/// treat the rest as no-ops.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub task: WatchTask,
    pub phase: SessionPhase,
    pub violation_reason: Option<String>,
    pub started_at: DateTime<Utc>,
    pub opened: bool,
    pub player_ready: bool,
    pub player_playing: bool,
    pub reward_claimed: bool,
    pub closed: bool,
}

impl SessionState {
    pub fn new(task: WatchTask) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            task,
            phase: SessionPhase::Gate,
            violation_reason: None,
            started_at: Utc::now(),
            opened: false,
            player_ready: false,
            player_playing: false,
            reward_claimed: false,
            closed: false,
        }
    }

    /// Gate cleared by the external identity step.
    pub fn enter_playing(&mut self) -> bool {
        if self.phase != SessionPhase::Gate {
            return false;
        }
        self.phase = SessionPhase::Playing;
        true
    }

    /// Completion is only reachable from `Playing`.
    pub fn complete(&mut self) -> bool {
        if self.phase != SessionPhase::Playing {
            return false;
        }
        self.phase = SessionPhase::Completed;
        true
    }

    /// First violation wins; anything after it in the same attempt is a
    /// no-op until retry.
    pub fn accept_violation(&mut self, reason: &str) -> bool {
        if self.phase != SessionPhase::Playing {
            return false;
        }
        self.phase = SessionPhase::Violation;
        self.violation_reason = Some(reason.to_string());
        true
    }

    /// Explicit retry path back to the identity gate.
    pub fn retry_to_gate(&mut self) -> bool {
        if self.phase != SessionPhase::Violation {
            return false;
        }
        self.phase = SessionPhase::Gate;
        self.violation_reason = None;
        self.player_playing = false;
        true
    }

    pub fn snapshot(&self, verified_secs: f64, remaining_secs: f64) -> WatchSession {
        WatchSession {
            id: self.session_id.clone(),
            task: self.task.clone(),
            phase: self.phase,
            violation_reason: self.violation_reason.clone(),
            started_at: self.started_at,
            verified_secs,
            remaining_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> WatchTask {
        WatchTask {
            id: "task-1".to_string(),
            title: "Watch me".to_string(),
            channel_name: "channel".to_string(),
            video_id: "vid".to_string(),
            duration_seconds: 180,
            reward_amount: 25.0,
        }
    }

    #[test]
    fn lifecycle_is_one_directional() {
        let mut state = SessionState::new(task());
        assert_eq!(state.phase, SessionPhase::Gate);

        assert!(state.enter_playing());
        assert!(!state.enter_playing());
        assert_eq!(state.phase, SessionPhase::Playing);

        assert!(state.complete());
        assert_eq!(state.phase, SessionPhase::Completed);

        // Terminal: no violation, no replay, no retry.
        assert!(!state.accept_violation("nope"));
        assert!(!state.enter_playing());
        assert!(!state.retry_to_gate());
        assert_eq!(state.phase, SessionPhase::Completed);
    }

    #[test]
    fn first_violation_wins() {
        let mut state = SessionState::new(task());
        state.enter_playing();

        assert!(state.accept_violation("Skip attempt detected"));
        assert!(!state.accept_violation("Excessive pausing during the video"));
        assert_eq!(
            state.violation_reason.as_deref(),
            Some("Skip attempt detected")
        );
    }

    #[test]
    fn retry_returns_to_gate_and_clears_the_reason() {
        let mut state = SessionState::new(task());
        state.enter_playing();
        state.accept_violation("Skip attempt detected");

        assert!(state.retry_to_gate());
        assert_eq!(state.phase, SessionPhase::Gate);
        assert_eq!(state.violation_reason, None);

        // Retry is only valid from a violation.
        assert!(!state.retry_to_gate());
    }

    #[test]
    fn snapshot_carries_the_live_counters() {
        let mut state = SessionState::new(task());
        state.enter_playing();
        let snapshot = state.snapshot(42.0, 138.0);
        assert_eq!(snapshot.phase, SessionPhase::Playing);
        assert_eq!(snapshot.verified_secs, 42.0);
        assert_eq!(snapshot.remaining_secs, 138.0);
        assert_eq!(snapshot.task.id, "task-1");
    }
}
