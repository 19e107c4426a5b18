use serde::{Deserialize, Serialize};

/// Tunable thresholds for playback integrity checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressConfig {
    /// Interval between playback position samples, in milliseconds.
    pub sample_interval_ms: u64,

    /// Position delta above which a sample counts as an anomalous jump.
    pub jump_threshold_secs: f64,

    /// Largest delta still counted as normal playback advance. Deltas
    /// between this and `jump_threshold_secs` are borderline: ignored but
    /// not punished.
    pub max_normal_advance_secs: f64,

    /// Looser jump threshold applied while the player reports buffering.
    /// Deliberately a separate knob from `jump_threshold_secs`; the pair
    /// is tunable, not a verified constant.
    pub buffering_seek_threshold_secs: f64,

    /// Verified watch percentage required at end-of-stream.
    pub completion_threshold_pct: f64,

    /// Pause events beyond this count trip a violation.
    pub max_pause_events: u32,

    /// Heartbeat event cadence, in sampling ticks.
    pub heartbeat_every_ticks: u32,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 500,
            jump_threshold_secs: 2.0,
            max_normal_advance_secs: 1.5,
            buffering_seek_threshold_secs: 3.0,
            completion_threshold_pct: 90.0,
            max_pause_events: 5,
            heartbeat_every_ticks: 10,
        }
    }
}
