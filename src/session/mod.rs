pub mod controller;
pub mod events;
pub mod state;

pub use controller::{SessionController, SessionDeps};
pub use events::{EventSink, SessionEvent, SessionSignal};
pub use state::SessionState;
