//! External collaborators the engine consumes as opaque trait objects:
//! the identity/auth service, the reward ledger, and the device
//! attestation capability. None of their internals are modeled here.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity/auth service. Linking is redirect-based; `begin_link` starts
/// the flow and the outcome is observed out-of-process (the embedding
/// layer calls back into the session once the redirect completes).
pub trait IdentityGateway: Send + Sync {
    /// Whether the current identity already carries the required external
    /// account link (read from session metadata).
    fn is_account_linked(&self) -> bool;

    fn begin_link(&self) -> Result<()>;
}

/// Claim failure, surfaced to the user unchanged. Rejecting duplicates is
/// the ledger's responsibility, not the engine's.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error("this task was already completed")]
    AlreadyClaimed,
    #[error("{0}")]
    Backend(String),
}

/// Reward ledger. The engine's only outbound effect on completion is a
/// single claim call carrying the task id.
pub trait RewardLedger: Send + Sync {
    fn claim(&self, task_id: &str) -> Result<(), ClaimError>;
}

/// Verdict from the external device-fingerprint capability. The
/// fingerprint is an opaque identifier; how it is derived is out of
/// scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceVerdict {
    pub fingerprint: String,
    pub is_fraud: bool,
    pub reason: Option<String>,
}

pub trait DeviceAttestor: Send + Sync {
    fn attest(&self) -> Result<DeviceVerdict>;
}
