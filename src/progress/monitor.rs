use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::player::PlayerHandle;
use crate::session::events::{EventSink, SessionEvent, SessionSignal};

use super::accumulator::{SampleVerdict, WatchAccumulator};
use super::config::ProgressConfig;

// Set to false to silence the per-tick sampling logs in this module.
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const REASON_SKIP_DETECTED: &str = "Skip attempt detected";
pub const REASON_TIME_MANIPULATION: &str = "Video time manipulation detected";
pub const REASON_EXCESSIVE_PAUSING: &str = "Excessive pausing during the video";

struct MonitorState {
    accumulator: WatchAccumulator,
    /// Set while a corrective seek we issued is settling; keeps the
    /// buffering check from tripping on our own seek. Cleared on the next
    /// classified sample.
    corrective_seek_in_flight: bool,
    /// Once set, the accumulator is frozen until `reset`.
    finished: bool,
}

/// Converts raw player position samples into a tamper-resistant measure
/// of genuine watch-time and reports skip/seek abuse.
///
/// Cloning yields another handle over the same attempt state.
#[derive(Clone)]
pub struct ProgressMonitor {
    target_secs: f64,
    config: ProgressConfig,
    player: Arc<dyn PlayerHandle>,
    signals: UnboundedSender<SessionSignal>,
    events: Arc<dyn EventSink>,
    state: Arc<Mutex<MonitorState>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    cancel: Arc<Mutex<Option<CancellationToken>>>,
}

impl ProgressMonitor {
    pub fn new(
        target_secs: f64,
        config: ProgressConfig,
        player: Arc<dyn PlayerHandle>,
        signals: UnboundedSender<SessionSignal>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        if target_secs <= 0.0 {
            bail!("target duration must be greater than zero");
        }

        Ok(Self {
            target_secs,
            config,
            player,
            signals,
            events,
            state: Arc::new(Mutex::new(MonitorState {
                accumulator: WatchAccumulator::new(),
                corrective_seek_in_flight: false,
                finished: false,
            })),
            ticker: Arc::new(Mutex::new(None)),
            cancel: Arc::new(Mutex::new(None)),
        })
    }

    /// Begin (or resume) sampling. Idempotent while a ticker is already
    /// running for this attempt, so a focus-restore resume cannot
    /// double-accumulate.
    pub async fn start(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = &*ticker_guard {
            if !handle.is_finished() {
                return;
            }
        }
        if self.state.lock().await.finished {
            return;
        }

        let token = CancellationToken::new();
        *self.cancel.lock().await = Some(token.clone());

        let monitor = self.clone();
        *ticker_guard = Some(tokio::spawn(async move {
            monitor.sampling_loop(token).await;
        }));
    }

    async fn sampling_loop(&self, cancel: CancellationToken) {
        let mut ticker =
            tokio::time::interval(Duration::from_millis(self.config.sample_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks: u32 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let position = match self.player.current_position() {
                        Ok(position) => position,
                        Err(err) => {
                            let _ = self.signals.send(SessionSignal::PlayerFault {
                                message: format!("player stopped reporting position: {err}"),
                            });
                            break;
                        }
                    };

                    let (verdict, seek_target) = {
                        let mut guard = self.state.lock().await;
                        if guard.finished {
                            break;
                        }
                        let verdict = guard.accumulator.observe(position, &self.config);
                        match verdict {
                            SampleVerdict::Jump { .. } => {
                                // Baseline stays on the last accepted time;
                                // flag the seek before issuing it so the
                                // buffering check cannot re-trip on it.
                                guard.corrective_seek_in_flight = true;
                                (verdict, guard.accumulator.last_accepted())
                            }
                            _ => {
                                guard.corrective_seek_in_flight = false;
                                (verdict, None)
                            }
                        }
                    };

                    if let SampleVerdict::Jump { delta } = verdict {
                        log_warn!(
                            "anomalous jump of {delta:.1}s at position {position:.1}s"
                        );
                        let _ = self.signals.send(SessionSignal::Violation {
                            reason: REASON_SKIP_DETECTED.to_string(),
                        });
                        if let Some(target) = seek_target {
                            if let Err(err) = self.player.seek_to(target) {
                                log_warn!("corrective seek to {target:.1}s failed: {err:#}");
                            }
                        }
                    }

                    ticks = ticks.wrapping_add(1);
                    if self.config.heartbeat_every_ticks > 0
                        && ticks % self.config.heartbeat_every_ticks == 0
                    {
                        let (verified, remaining, pct) = {
                            let guard = self.state.lock().await;
                            (
                                guard.accumulator.verified_secs(),
                                guard.accumulator.remaining_secs(self.target_secs),
                                guard.accumulator.watched_pct(self.target_secs),
                            )
                        };
                        self.events.emit(SessionEvent::Heartbeat {
                            verified_secs: verified,
                            remaining_secs: remaining,
                            watched_pct: pct,
                        });
                    }
                }
                _ = cancel.cancelled() => {
                    break;
                }
            }
        }
    }

    /// A pause was observed. Stops sampling until the next `start` and
    /// reports excessive pausing past the allowance. The violation is a
    /// signal, not a stop; the monitor keeps serving the attempt.
    pub async fn note_pause(&self) {
        self.halt_ticker().await;
        let count = {
            let mut guard = self.state.lock().await;
            if guard.finished {
                return;
            }
            guard.accumulator.note_pause()
        };
        log_info!("pause {count} recorded");
        if count > self.config.max_pause_events {
            let _ = self.signals.send(SessionSignal::Violation {
                reason: REASON_EXCESSIVE_PAUSING.to_string(),
            });
        }
    }

    /// Buffering can mask a seek that never shows up as a steady-state
    /// jump; compare against the baseline with the looser threshold.
    pub async fn check_buffering_seek(&self) {
        let baseline = {
            let guard = self.state.lock().await;
            if guard.finished || guard.corrective_seek_in_flight {
                return;
            }
            guard.accumulator.last_accepted()
        };
        let Some(baseline) = baseline else {
            return;
        };

        let position = match self.player.current_position() {
            Ok(position) => position,
            Err(err) => {
                let _ = self.signals.send(SessionSignal::PlayerFault {
                    message: format!("player stopped reporting position: {err}"),
                });
                return;
            }
        };

        if (position - baseline).abs() > self.config.buffering_seek_threshold_secs {
            log_warn!(
                "seek during buffering: position {position:.1}s vs baseline {baseline:.1}s"
            );
            self.state.lock().await.corrective_seek_in_flight = true;
            let _ = self.signals.send(SessionSignal::Violation {
                reason: REASON_TIME_MANIPULATION.to_string(),
            });
            if let Err(err) = self.player.seek_to(baseline) {
                log_warn!("corrective seek to {baseline:.1}s failed: {err:#}");
            }
        }
    }

    /// Natural end-of-stream: stop sampling and decide the attempt from
    /// the accumulator as it stands right now.
    pub async fn finish(&self) {
        self.halt_ticker().await;
        let pct = {
            let mut guard = self.state.lock().await;
            if guard.finished {
                return;
            }
            guard.finished = true;
            guard.accumulator.watched_pct(self.target_secs)
        };

        if pct >= self.config.completion_threshold_pct {
            log_info!("attempt completed with {pct:.1}% verified watch-time");
            let _ = self.signals.send(SessionSignal::Completion);
        } else {
            let _ = self.signals.send(SessionSignal::Violation {
                reason: format!("Video was not watched completely ({pct:.0}%)"),
            });
        }
    }

    /// Stop sampling and freeze the accumulator until `reset`.
    pub async fn halt(&self) {
        self.halt_ticker().await;
        self.state.lock().await.finished = true;
    }

    /// Zero the attempt state for a retry. The monitor instance is reused
    /// across attempts; only its state starts over.
    pub async fn reset(&self) {
        self.halt_ticker().await;
        let mut guard = self.state.lock().await;
        guard.accumulator.reset();
        guard.corrective_seek_in_flight = false;
        guard.finished = false;
    }

    pub async fn verified_secs(&self) -> f64 {
        self.state.lock().await.accumulator.verified_secs()
    }

    pub async fn remaining_secs(&self) -> f64 {
        self.state
            .lock()
            .await
            .accumulator
            .remaining_secs(self.target_secs)
    }

    pub async fn watched_pct(&self) -> f64 {
        self.state
            .lock()
            .await
            .accumulator
            .watched_pct(self.target_secs)
    }

    pub async fn pause_count(&self) -> u32 {
        self.state.lock().await.accumulator.pause_count()
    }

    async fn halt_ticker(&self) {
        if let Some(token) = self.cancel.lock().await.take() {
            token.cancel();
        }
        if let Some(handle) = self.ticker.lock().await.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use tokio::sync::mpsc;

    use super::*;

    /// Player that serves a scripted queue of positions, then keeps
    /// returning the last one. Corrective seeks overwrite the current
    /// position and drop the rest of the script.
    struct ScriptedPlayer {
        queue: StdMutex<Vec<f64>>,
        current: StdMutex<f64>,
        seeks: StdMutex<Vec<f64>>,
        fail_position: StdMutex<bool>,
    }

    impl ScriptedPlayer {
        fn with_samples(samples: Vec<f64>) -> Arc<Self> {
            let mut queue = samples;
            queue.reverse();
            Arc::new(Self {
                queue: StdMutex::new(queue),
                current: StdMutex::new(0.0),
                seeks: StdMutex::new(Vec::new()),
                fail_position: StdMutex::new(false),
            })
        }

        fn drained(&self) -> bool {
            self.queue.lock().unwrap().is_empty()
        }

        fn seeks(&self) -> Vec<f64> {
            self.seeks.lock().unwrap().clone()
        }

        fn fail_next_position(&self) {
            *self.fail_position.lock().unwrap() = true;
        }
    }

    impl PlayerHandle for ScriptedPlayer {
        fn current_position(&self) -> Result<f64> {
            if *self.fail_position.lock().unwrap() {
                bail!("player handle is gone");
            }
            let mut current = self.current.lock().unwrap();
            if let Some(next) = self.queue.lock().unwrap().pop() {
                *current = next;
            }
            Ok(*current)
        }

        fn duration(&self) -> Result<f64> {
            Ok(0.0)
        }

        fn play(&self) -> Result<()> {
            Ok(())
        }

        fn pause(&self) -> Result<()> {
            Ok(())
        }

        fn seek_to(&self, secs: f64) -> Result<()> {
            self.seeks.lock().unwrap().push(secs);
            *self.current.lock().unwrap() = secs;
            self.queue.lock().unwrap().clear();
            Ok(())
        }

        fn destroy(&self) -> Result<()> {
            Ok(())
        }
    }

    struct NullSink;

    impl EventSink for NullSink {
        fn emit(&self, _event: SessionEvent) {}
    }

    fn monitor_with(
        target_secs: f64,
        player: Arc<ScriptedPlayer>,
    ) -> (
        ProgressMonitor,
        mpsc::UnboundedReceiver<SessionSignal>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor = ProgressMonitor::new(
            target_secs,
            ProgressConfig::default(),
            player,
            tx,
            Arc::new(NullSink),
        )
        .unwrap();
        (monitor, rx)
    }

    async fn drain_script(player: &ScriptedPlayer) {
        while !player.drained() {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        // One more interval so the last queued sample gets classified.
        tokio::time::sleep(Duration::from_millis(600)).await;
    }

    #[test]
    fn rejects_non_positive_target() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let player = ScriptedPlayer::with_samples(vec![]);
        assert!(ProgressMonitor::new(
            0.0,
            ProgressConfig::default(),
            player,
            tx,
            Arc::new(NullSink)
        )
        .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn accumulates_steady_playback_and_completes_on_ended() {
        let samples: Vec<f64> = (0..=20).map(|i| f64::from(i) * 0.5).collect();
        let player = ScriptedPlayer::with_samples(samples);
        let (monitor, mut rx) = monitor_with(10.0, player.clone());

        monitor.start().await;
        drain_script(&player).await;
        monitor.finish().await;

        assert_eq!(rx.try_recv().ok(), Some(SessionSignal::Completion));
        assert!((monitor.verified_secs().await - 10.0).abs() < 1e-6);
        assert_eq!(monitor.remaining_secs().await, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn jump_fires_violation_and_corrects_position_once() {
        let player =
            ScriptedPlayer::with_samples(vec![100.0, 100.5, 101.0, 111.0]);
        let (monitor, mut rx) = monitor_with(200.0, player.clone());

        monitor.start().await;
        drain_script(&player).await;
        // A few extra ticks against the corrected position must not
        // re-trip the detector.
        tokio::time::sleep(Duration::from_secs(2)).await;
        monitor.halt().await;

        assert_eq!(
            rx.try_recv().ok(),
            Some(SessionSignal::Violation {
                reason: REASON_SKIP_DETECTED.to_string()
            })
        );
        assert!(rx.try_recv().is_err(), "only one violation expected");
        assert_eq!(player.seeks(), vec![101.0]);
        assert!((monitor.verified_secs().await - 1.0).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent_while_running() {
        let samples: Vec<f64> = (0..=10).map(|i| f64::from(i) * 0.5).collect();
        let player = ScriptedPlayer::with_samples(samples);
        let (monitor, _rx) = monitor_with(60.0, player.clone());

        monitor.start().await;
        monitor.start().await;
        monitor.start().await;
        drain_script(&player).await;
        monitor.halt().await;

        // A second ticker would have consumed the script twice as fast
        // and produced doubled deltas; the total must be exactly 5s.
        assert!((monitor.verified_secs().await - 5.0).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn sixth_pause_trips_excessive_pausing() {
        let player = ScriptedPlayer::with_samples(vec![]);
        let (monitor, mut rx) = monitor_with(60.0, player);

        for _ in 0..5 {
            monitor.note_pause().await;
        }
        assert!(rx.try_recv().is_err(), "five pauses are still allowed");

        monitor.note_pause().await;
        assert_eq!(
            rx.try_recv().ok(),
            Some(SessionSignal::Violation {
                reason: REASON_EXCESSIVE_PAUSING.to_string()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn insufficient_watch_reports_percentage_on_ended() {
        let samples: Vec<f64> = (0..=200).map(|i| f64::from(i) * 0.5).collect();
        let player = ScriptedPlayer::with_samples(samples);
        let (monitor, mut rx) = monitor_with(180.0, player.clone());

        monitor.start().await;
        drain_script(&player).await;
        monitor.finish().await;

        // 100s verified of a 180s target is about 56%.
        match rx.try_recv() {
            Ok(SessionSignal::Violation { reason }) => {
                assert!(reason.contains("56%"), "unexpected reason: {reason}");
            }
            other => panic!("expected violation, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn buffering_seek_check_uses_looser_threshold() {
        let player = ScriptedPlayer::with_samples(vec![40.0, 40.5]);
        let (monitor, mut rx) = monitor_with(120.0, player.clone());

        monitor.start().await;
        drain_script(&player).await;
        // Stop the ticker without freezing the attempt; only the
        // buffering check should observe the positions below.
        monitor.note_pause().await;
        assert!(rx.try_recv().is_err());

        // 2.5s off the baseline: inside the buffering allowance.
        *player.current.lock().unwrap() = 43.0;
        monitor.check_buffering_seek().await;
        assert!(rx.try_recv().is_err());

        // 5s off the baseline: a seek hidden behind buffering.
        *player.current.lock().unwrap() = 45.5;
        monitor.check_buffering_seek().await;
        assert_eq!(
            rx.try_recv().ok(),
            Some(SessionSignal::Violation {
                reason: REASON_TIME_MANIPULATION.to_string()
            })
        );
        assert_eq!(player.seeks(), vec![40.5]);
    }

    #[tokio::test(start_paused = true)]
    async fn position_fault_surfaces_instead_of_fabricating_progress() {
        let player = ScriptedPlayer::with_samples(vec![1.0]);
        let (monitor, mut rx) = monitor_with(60.0, player.clone());

        monitor.start().await;
        drain_script(&player).await;
        player.fail_next_position();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let mut saw_fault = false;
        while let Ok(signal) = rx.try_recv() {
            if matches!(signal, SessionSignal::PlayerFault { .. }) {
                saw_fault = true;
            }
        }
        assert!(saw_fault);
    }

    #[tokio::test(start_paused = true)]
    async fn halt_stops_mutation_and_reset_reopens() {
        let samples: Vec<f64> = (0..=4).map(|i| f64::from(i) * 0.5).collect();
        let player = ScriptedPlayer::with_samples(samples);
        let (monitor, _rx) = monitor_with(60.0, player.clone());

        monitor.start().await;
        drain_script(&player).await;
        monitor.halt().await;
        let frozen = monitor.verified_secs().await;

        // Restart attempts while halted must not revive the ticker.
        monitor.start().await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(monitor.verified_secs().await, frozen);

        monitor.reset().await;
        assert_eq!(monitor.verified_secs().await, 0.0);
        assert_eq!(monitor.pause_count().await, 0);
    }
}
