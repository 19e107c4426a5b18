//! Control surface over the embedded video player.
//!
//! The engine never talks to a concrete player SDK; the embedding layer
//! wraps whatever it hosts (an iframe player, a native view) behind
//! [`PlayerHandle`] and forwards the player's event stream to the session
//! controller.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Creation-time lockdown flags for the hosted player. The defaults
/// disable every control a viewer could use to scrub, skip, or obscure
/// the video.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerOptions {
    pub autoplay: bool,
    pub show_controls: bool,
    pub enable_keyboard: bool,
    pub allow_fullscreen: bool,
    pub show_related: bool,
    pub show_overlays: bool,
    pub inline_playback: bool,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            autoplay: true,
            show_controls: false,
            enable_keyboard: false,
            allow_fullscreen: false,
            show_related: false,
            show_overlays: false,
            inline_playback: true,
        }
    }
}

/// Player lifecycle notifications, forwarded by the embedding layer via
/// `SessionController::handle_player_event`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    /// Player finished initializing and can report its duration.
    Ready { duration_secs: f64 },
    Playing,
    Paused,
    Buffering,
    Ended,
}

/// Handle over the hosted player instance. All methods are fallible; a
/// player that cannot report its position is a session-fatal fault, never
/// something to paper over with fabricated progress.
pub trait PlayerHandle: Send + Sync {
    fn current_position(&self) -> Result<f64>;
    fn duration(&self) -> Result<f64>;
    fn play(&self) -> Result<()>;
    fn pause(&self) -> Result<()>;
    fn seek_to(&self, secs: f64) -> Result<()>;
    fn destroy(&self) -> Result<()>;
}
