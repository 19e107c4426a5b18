use serde::{Deserialize, Serialize};

/// Descriptor of one watchable task as handed over by the embedding layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchTask {
    pub id: String,
    pub title: String,
    pub channel_name: String,
    pub video_id: String,
    pub duration_seconds: u32,
    pub reward_amount: f64,
}

impl WatchTask {
    pub fn target_duration_secs(&self) -> f64 {
        f64::from(self.duration_seconds)
    }
}
