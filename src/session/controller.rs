use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use log::{error, info, warn};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::focus::{FocusGuard, FocusSignal};
use crate::models::{SessionPhase, WatchSession, WatchTask};
use crate::navigation::{NavigationGuard, UnloadSurface};
use crate::player::{PlayerEvent, PlayerHandle};
use crate::progress::ProgressMonitor;
use crate::services::{DeviceAttestor, IdentityGateway, RewardLedger};
use crate::settings::IntegrityTunables;

use super::events::{EventSink, SessionEvent, SessionSignal};
use super::state::SessionState;

/// External collaborators handed to the controller at construction.
pub struct SessionDeps {
    pub player: Arc<dyn PlayerHandle>,
    pub identity: Arc<dyn IdentityGateway>,
    pub ledger: Arc<dyn RewardLedger>,
    pub unload_surface: Arc<dyn UnloadSurface>,
    pub events: Arc<dyn EventSink>,
    pub attestor: Option<Arc<dyn DeviceAttestor>>,
}

/// Orchestrates one watch session: activates the progress monitor and
/// focus guard while `Playing`, consumes their signals over a single
/// channel, and owns player teardown exclusively.
///
/// Cloning yields another handle over the same session.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    monitor: ProgressMonitor,
    focus: FocusGuard,
    navigation: NavigationGuard,
    player: Arc<dyn PlayerHandle>,
    identity: Arc<dyn IdentityGateway>,
    ledger: Arc<dyn RewardLedger>,
    attestor: Option<Arc<dyn DeviceAttestor>>,
    events: Arc<dyn EventSink>,
    signal_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<SessionSignal>>>>,
    signal_loop: Arc<Mutex<Option<JoinHandle<()>>>>,
    shutdown: CancellationToken,
}

impl SessionController {
    pub fn new(task: WatchTask, deps: SessionDeps, tunables: IntegrityTunables) -> Result<Self> {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        let monitor = ProgressMonitor::new(
            task.target_duration_secs(),
            tunables.progress,
            deps.player.clone(),
            signal_tx.clone(),
            deps.events.clone(),
        )?;
        let focus = FocusGuard::new(tunables.focus, signal_tx);
        let navigation = NavigationGuard::new(deps.unload_surface, None);

        Ok(Self {
            state: Arc::new(Mutex::new(SessionState::new(task))),
            monitor,
            focus,
            navigation,
            player: deps.player,
            identity: deps.identity,
            ledger: deps.ledger,
            attestor: deps.attestor,
            events: deps.events,
            signal_rx: Arc::new(Mutex::new(Some(signal_rx))),
            signal_loop: Arc::new(Mutex::new(None)),
            shutdown: CancellationToken::new(),
        })
    }

    /// Open the session. Runs the device check first, then either skips
    /// the gate (account already linked) or parks in `Gate` until the
    /// embedding layer reports the identity step done.
    pub async fn open(&self) -> Result<WatchSession> {
        {
            let mut state = self.state.lock().await;
            if state.closed {
                bail!("session is closed");
            }
            if state.opened {
                bail!("session already open");
            }
            state.opened = true;
        }

        if let Some(attestor) = &self.attestor {
            let verdict = attestor.attest()?;
            if verdict.is_fraud {
                bail!(verdict
                    .reason
                    .unwrap_or_else(|| "device failed the fraud check".to_string()));
            }
            info!("device {} cleared the fraud check", verdict.fingerprint);
        }

        self.spawn_signal_loop().await;

        if self.identity.is_account_linked() {
            self.enter_playing().await?;
        } else {
            self.emit_phase_changed().await;
        }

        Ok(self.snapshot().await)
    }

    /// Kick off the external identity linking flow. Faults here leave the
    /// session in `Gate`; retrying means calling this again.
    pub fn begin_identity_link(&self) -> Result<()> {
        self.identity.begin_link()
    }

    /// The embedding layer observed the identity step completing (page
    /// came back from the redirect with the link in place).
    pub async fn identity_linked(&self) -> Result<WatchSession> {
        self.enter_playing().await?;
        Ok(self.snapshot().await)
    }

    /// Route a player lifecycle event into the integrity components.
    pub async fn handle_player_event(&self, event: PlayerEvent) -> Result<()> {
        match event {
            PlayerEvent::Ready { duration_secs } => {
                if !duration_secs.is_finite() || duration_secs <= 0.0 {
                    self.fail_session("player failed to report the video duration")
                        .await;
                    bail!("player reported an invalid duration: {duration_secs}");
                }
                {
                    let mut state = self.state.lock().await;
                    state.player_ready = true;
                }
                if self.phase().await == SessionPhase::Playing {
                    if let Err(err) = self.player.play() {
                        warn!("autoplay after ready failed: {err:#}");
                    }
                }
            }
            PlayerEvent::Playing => {
                {
                    let mut state = self.state.lock().await;
                    state.player_playing = true;
                }
                if self.phase().await == SessionPhase::Playing {
                    self.monitor.start().await;
                }
            }
            PlayerEvent::Paused => {
                {
                    let mut state = self.state.lock().await;
                    state.player_playing = false;
                }
                if self.phase().await == SessionPhase::Playing {
                    self.monitor.note_pause().await;
                }
            }
            PlayerEvent::Buffering => {
                if self.phase().await == SessionPhase::Playing {
                    self.monitor.check_buffering_seek().await;
                }
            }
            PlayerEvent::Ended => {
                {
                    let mut state = self.state.lock().await;
                    state.player_playing = false;
                }
                if self.phase().await == SessionPhase::Playing {
                    self.monitor.finish().await;
                }
            }
        }
        Ok(())
    }

    /// Forward a platform focus/visibility transition to the guard.
    pub async fn handle_focus_signal(&self, signal: FocusSignal) {
        self.focus.observe(signal).await;
    }

    /// Explicit retry from a violation: back to the gate with all
    /// integrity state zeroed and the video rewound. The same component
    /// instances carry over; only their state starts fresh.
    pub async fn retry(&self) -> Result<WatchSession> {
        {
            let mut state = self.state.lock().await;
            if !state.retry_to_gate() {
                bail!("only a violated session can be retried");
            }
        }

        self.monitor.reset().await;
        self.focus.reset().await;
        if let Err(err) = self.player.seek_to(0.0) {
            warn!("rewind for retry failed: {err:#}");
        }
        if let Err(err) = self.player.pause() {
            warn!("pause for retry failed: {err:#}");
        }

        info!("session reset for retry");
        self.emit_phase_changed().await;
        Ok(self.snapshot().await)
    }

    /// Claim the reward for a completed session. The single outbound
    /// ledger call; a duplicate rejection comes back unchanged (downcast
    /// to [`crate::services::ClaimError`] to branch on it).
    pub async fn claim_reward(&self) -> Result<()> {
        let task_id = {
            let state = self.state.lock().await;
            if state.phase != SessionPhase::Completed {
                bail!("reward can only be claimed after completion");
            }
            if state.reward_claimed {
                bail!("reward already claimed for this session");
            }
            state.task.id.clone()
        };

        self.ledger.claim(&task_id).map_err(anyhow::Error::from)?;

        {
            let mut state = self.state.lock().await;
            state.reward_claimed = true;
        }
        info!("reward claimed for task {task_id}");
        self.close().await
    }

    /// Close the session and tear everything down. Refused while the
    /// video is actively playing.
    pub async fn close(&self) -> Result<()> {
        {
            let state = self.state.lock().await;
            if state.closed {
                return Ok(());
            }
            if state.phase == SessionPhase::Playing && state.player_playing {
                bail!("cannot close the session while the video is playing");
            }
        }
        self.teardown().await
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.lock().await.phase
    }

    pub async fn snapshot(&self) -> WatchSession {
        let verified = self.monitor.verified_secs().await;
        let remaining = self.monitor.remaining_secs().await;
        self.state.lock().await.snapshot(verified, remaining)
    }

    pub async fn remaining_secs(&self) -> f64 {
        self.monitor.remaining_secs().await
    }

    async fn enter_playing(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if state.closed {
                bail!("session is closed");
            }
            if !state.enter_playing() {
                bail!("session is not awaiting the identity gate");
            }
        }

        self.focus.set_active(true).await;
        self.navigation.set_active(true).await;
        if let Err(err) = self.player.play() {
            warn!("starting playback failed: {err:#}");
        }
        self.emit_phase_changed().await;
        Ok(())
    }

    async fn spawn_signal_loop(&self) {
        let mut loop_guard = self.signal_loop.lock().await;
        if let Some(handle) = &*loop_guard {
            if !handle.is_finished() {
                return;
            }
        }
        let Some(mut rx) = self.signal_rx.lock().await.take() else {
            return;
        };

        let controller = self.clone();
        let shutdown = self.shutdown.clone();
        *loop_guard = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    received = rx.recv() => {
                        let Some(signal) = received else { break };
                        controller.apply_signal(signal).await;
                    }
                    _ = shutdown.cancelled() => break,
                }
            }
        }));
    }

    async fn apply_signal(&self, signal: SessionSignal) {
        match signal {
            SessionSignal::Completion => {
                let completed = {
                    let mut state = self.state.lock().await;
                    state.complete()
                };
                if completed {
                    self.deactivate_integrity().await;
                    info!("session completed");
                    self.emit_phase_changed().await;
                }
            }
            SessionSignal::Violation { reason } => {
                let accepted = {
                    let mut state = self.state.lock().await;
                    state.accept_violation(&reason)
                };
                if accepted {
                    self.deactivate_integrity().await;
                    if let Err(err) = self.player.pause() {
                        warn!("pausing after violation failed: {err:#}");
                    }
                    warn!("session violation: {reason}");
                    self.emit_phase_changed().await;
                }
            }
            SessionSignal::PlayerFault { message } => {
                self.fail_session(&message).await;
            }
            SessionSignal::FocusLost => {
                if self.phase().await != SessionPhase::Playing {
                    return;
                }
                if let Err(err) = self.player.pause() {
                    warn!("pausing on focus loss failed: {err:#}");
                }
                let remaining = self.focus.remaining_allowances().await;
                self.events.emit(SessionEvent::FocusWarning {
                    remaining_allowances: remaining,
                });
            }
            SessionSignal::FocusRestored => {
                if self.phase().await != SessionPhase::Playing {
                    return;
                }
                if let Err(err) = self.player.play() {
                    warn!("resuming after focus restore failed: {err:#}");
                }
                self.events.emit(SessionEvent::FocusRecovered);
            }
        }
    }

    /// Session-fatal player fault: recorded with the fault message as the
    /// stop reason. No progress is fabricated past this point.
    async fn fail_session(&self, reason: &str) {
        let accepted = {
            let mut state = self.state.lock().await;
            state.accept_violation(reason)
        };
        if accepted {
            self.deactivate_integrity().await;
            error!("session failed: {reason}");
            self.emit_phase_changed().await;
        } else {
            error!("player fault outside an active attempt: {reason}");
        }
    }

    async fn deactivate_integrity(&self) {
        self.monitor.halt().await;
        self.focus.set_active(false).await;
        self.navigation.set_active(false).await;
    }

    async fn teardown(&self) -> Result<()> {
        self.shutdown.cancel();
        self.deactivate_integrity().await;
        if let Some(handle) = self.signal_loop.lock().await.take() {
            let _ = handle.await;
        }
        {
            let mut state = self.state.lock().await;
            state.closed = true;
            state.player_playing = false;
        }
        self.player
            .destroy()
            .map_err(|err| anyhow!("player teardown failed: {err:#}"))?;
        info!("session closed");
        Ok(())
    }

    async fn emit_phase_changed(&self) {
        let session = self.snapshot().await;
        self.events.emit(SessionEvent::PhaseChanged { session });
    }
}
