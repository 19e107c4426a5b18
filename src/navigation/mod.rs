//! Advisory unload interception. While a session is active the guard
//! installs a confirmation message on the platform surface; it can only
//! prompt, never prevent, and it never feeds the state machine.

use std::sync::Arc;

use tokio::sync::Mutex;

pub const DEFAULT_UNLOAD_MESSAGE: &str =
    "If you leave now, the task will be cancelled and you will not receive the reward. Are you sure?";

/// Platform seam for the unload-confirmation mechanism.
pub trait UnloadSurface: Send + Sync {
    fn install_prompt(&self, message: &str);
    fn clear_prompt(&self);
}

/// Cloning yields another handle over the same guard state.
#[derive(Clone)]
pub struct NavigationGuard {
    surface: Arc<dyn UnloadSurface>,
    message: String,
    active: Arc<Mutex<bool>>,
}

impl NavigationGuard {
    pub fn new(surface: Arc<dyn UnloadSurface>, message: Option<String>) -> Self {
        Self {
            surface,
            message: message.unwrap_or_else(|| DEFAULT_UNLOAD_MESSAGE.to_string()),
            active: Arc::new(Mutex::new(false)),
        }
    }

    /// Install or clear the prompt. Transition-edge only; repeated calls
    /// with the same value do not touch the surface again.
    pub async fn set_active(&self, active: bool) {
        let mut guard = self.active.lock().await;
        if *guard == active {
            return;
        }
        *guard = active;
        if active {
            self.surface.install_prompt(&self.message);
        } else {
            self.surface.clear_prompt();
        }
    }

    pub async fn is_active(&self) -> bool {
        *self.active.lock().await
    }
}
