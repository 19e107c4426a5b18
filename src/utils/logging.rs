//! Logging macros gated on a module-level `ENABLE_LOGS` flag, so chatty
//! modules (the sampling loop in particular) can be silenced wholesale
//! without touching call sites.
//!
//! A module that uses them declares the flag once:
//! ```rust
//! const ENABLE_LOGS: bool = true;
//! ```
//! and then calls the macros, which are exported at the crate root:
//! ```rust,ignore
//! use crate::{log_info, log_warn};
//! log_info!("tick {}", n);
//! ```

/// Info-level logging, compiled against the calling module's `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Warn-level logging, compiled against the calling module's `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Error-level logging, compiled against the calling module's `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
