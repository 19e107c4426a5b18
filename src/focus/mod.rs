pub mod guard;

pub use guard::{FocusConfig, FocusGuard, FocusSignal};
