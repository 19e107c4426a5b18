//! Watch-session integrity enforcement for reward-gated video playback.
//!
//! The engine sits between a hosted video player, the platform's
//! focus/visibility events, and the identity/ledger backend services. It
//! measures genuine watch-time from raw position samples, detects
//! skip/seek abuse and attention loss, and drives one session through
//! gate, playing, completed, and violation with an explicit retry path.
//!
//! The embedding layer owns rendering and the concrete player SDK; it
//! hands the engine trait objects for the player, identity, ledger, and
//! unload surfaces, forwards player and focus events, and listens for
//! session events.

pub mod focus;
pub mod models;
pub mod navigation;
pub mod player;
pub mod progress;
pub mod services;
pub mod session;
pub mod settings;
mod utils;

pub use focus::{FocusConfig, FocusGuard, FocusSignal};
pub use models::{SessionPhase, WatchSession, WatchTask};
pub use navigation::{NavigationGuard, UnloadSurface};
pub use player::{PlayerEvent, PlayerHandle, PlayerOptions};
pub use progress::{ProgressConfig, ProgressMonitor, SampleVerdict, WatchAccumulator};
pub use services::{
    ClaimError, DeviceAttestor, DeviceVerdict, IdentityGateway, RewardLedger,
};
pub use session::{
    EventSink, SessionController, SessionDeps, SessionEvent, SessionSignal,
};
pub use settings::{IntegrityTunables, SettingsStore};
