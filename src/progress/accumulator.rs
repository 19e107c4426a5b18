use super::config::ProgressConfig;

/// Outcome of classifying one playback sample against the last accepted
/// time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleVerdict {
    /// First sample of the attempt; recorded as the baseline, nothing
    /// classified.
    First,
    /// Normal playback advance; the delta was folded into verified time.
    Advanced(f64),
    /// Non-advancing or borderline sample; baseline moved, nothing
    /// accumulated.
    Stalled,
    /// Anomalous jump in either direction. The baseline is deliberately
    /// NOT advanced; it is the corrective seek-back target.
    Jump { delta: f64 },
}

/// Verified watch-time bookkeeping for one attempt. `verified_secs` is
/// monotonically non-decreasing until `reset`.
#[derive(Debug, Clone, Default)]
pub struct WatchAccumulator {
    verified_secs: f64,
    last_accepted: Option<f64>,
    pause_count: u32,
}

impl WatchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verified_secs(&self) -> f64 {
        self.verified_secs
    }

    /// Last accepted player position, if any sample has been recorded.
    pub fn last_accepted(&self) -> Option<f64> {
        self.last_accepted
    }

    pub fn pause_count(&self) -> u32 {
        self.pause_count
    }

    /// Classify `source_time` against the last accepted sample and fold
    /// it into the verified total when it looks like steady playback.
    pub fn observe(&mut self, source_time: f64, config: &ProgressConfig) -> SampleVerdict {
        let Some(prev) = self.last_accepted else {
            self.last_accepted = Some(source_time);
            return SampleVerdict::First;
        };

        let delta = source_time - prev;

        if delta.abs() > config.jump_threshold_secs {
            return SampleVerdict::Jump { delta };
        }

        self.last_accepted = Some(source_time);

        if delta > 0.0 && delta <= config.max_normal_advance_secs {
            self.verified_secs += delta;
            SampleVerdict::Advanced(delta)
        } else {
            SampleVerdict::Stalled
        }
    }

    pub fn note_pause(&mut self) -> u32 {
        self.pause_count += 1;
        self.pause_count
    }

    pub fn watched_pct(&self, target_secs: f64) -> f64 {
        if target_secs <= 0.0 {
            return 0.0;
        }
        self.verified_secs / target_secs * 100.0
    }

    pub fn remaining_secs(&self, target_secs: f64) -> f64 {
        (target_secs - self.verified_secs).max(0.0)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
