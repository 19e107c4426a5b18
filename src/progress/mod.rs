pub mod accumulator;
pub mod config;
pub mod monitor;

pub use accumulator::{SampleVerdict, WatchAccumulator};
pub use config::ProgressConfig;
pub use monitor::ProgressMonitor;
