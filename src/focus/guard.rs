use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;

use crate::session::events::SessionSignal;

pub const REASON_LEFT_TAB: &str = "You left the tab too many times during the video";

/// Platform attention transitions. Document visibility and window focus
/// are independent channels: a single-monitor setup can blur the window
/// without hiding the document, so both must be watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusSignal {
    DocumentHidden,
    DocumentVisible,
    WindowBlurred,
    WindowFocused,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusConfig {
    /// Focus losses beyond this count trip a violation.
    pub max_focus_losses: u32,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            max_focus_losses: 3,
        }
    }
}

#[derive(Debug)]
struct FocusState {
    document_visible: bool,
    window_focused: bool,
    loss_count: u32,
    active: bool,
}

impl FocusState {
    fn is_focused(&self) -> bool {
        self.document_visible && self.window_focused
    }
}

/// Detects when the viewer's attention leaves the video during an active
/// session. Losses are counted on focused-to-unfocused transitions of the
/// combined channel state; restoration requires each negative channel's
/// own positive signal. The guard never touches the player itself.
///
/// Cloning yields another handle over the same state.
#[derive(Clone)]
pub struct FocusGuard {
    config: FocusConfig,
    state: Arc<Mutex<FocusState>>,
    signals: UnboundedSender<SessionSignal>,
}

impl FocusGuard {
    pub fn new(config: FocusConfig, signals: UnboundedSender<SessionSignal>) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(FocusState {
                document_visible: true,
                window_focused: true,
                loss_count: 0,
                active: false,
            })),
            signals,
        }
    }

    /// Gate observation on session activity. While inactive the guard
    /// ignores every signal.
    pub async fn set_active(&self, active: bool) {
        self.state.lock().await.active = active;
    }

    pub async fn observe(&self, signal: FocusSignal) {
        let mut guard = self.state.lock().await;
        if !guard.active {
            return;
        }

        let was_focused = guard.is_focused();
        match signal {
            FocusSignal::DocumentHidden => guard.document_visible = false,
            FocusSignal::DocumentVisible => guard.document_visible = true,
            FocusSignal::WindowBlurred => guard.window_focused = false,
            FocusSignal::WindowFocused => guard.window_focused = true,
        }
        let now_focused = guard.is_focused();

        if was_focused && !now_focused {
            guard.loss_count += 1;
            let count = guard.loss_count;
            drop(guard);

            let _ = self.signals.send(SessionSignal::FocusLost);
            // Exactly once, at the first crossing; the guard keeps
            // counting afterwards and the caller decides what terminal
            // means.
            if count == self.config.max_focus_losses + 1 {
                let _ = self.signals.send(SessionSignal::Violation {
                    reason: REASON_LEFT_TAB.to_string(),
                });
            }
        } else if !was_focused && now_focused {
            drop(guard);
            let _ = self.signals.send(SessionSignal::FocusRestored);
        }
    }

    /// Zero the loss counter and mark the surface focused. Callable at
    /// any time; has no side effects on listeners.
    pub async fn reset(&self) {
        let mut guard = self.state.lock().await;
        guard.loss_count = 0;
        guard.document_visible = true;
        guard.window_focused = true;
    }

    pub async fn is_focused(&self) -> bool {
        self.state.lock().await.is_focused()
    }

    pub async fn loss_count(&self) -> u32 {
        self.state.lock().await.loss_count
    }

    /// Exits the viewer has left before the next loss trips a violation.
    pub async fn remaining_allowances(&self) -> u32 {
        let count = self.state.lock().await.loss_count;
        self.config.max_focus_losses.saturating_sub(count)
    }
}
