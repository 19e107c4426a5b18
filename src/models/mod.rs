pub mod session;
pub mod task;

pub use session::{SessionPhase, WatchSession};
pub use task::WatchTask;
