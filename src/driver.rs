// src/driver.rs
//! Async session driver.
//!
//! A single tokio task owns the [`SessionEngine`] and multiplexes the frame
//! loop, the calibration countdown, the recording deadline and cancellation,
//! so frames are never processed concurrently and no locking is needed.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::keypoints::KeypointFrame;
use crate::scoring::SessionReport;
use crate::session::{LiveState, Phase, SessionEngine, SessionEvent, Step};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Upstream pose/face detector.
pub trait DetectionSource: Send {
    /// Prepare the source. Failing here fails the session start.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next detector result. `want_face` asks for face
    /// landmarks on this tick; `Ok(None)` means the stream has ended.
    fn next_frame(
        &mut self,
        want_face: bool,
    ) -> impl Future<Output = Result<Option<KeypointFrame>>> + Send;
}

#[derive(Debug, Clone)]
pub enum SessionOutcome {
    Completed(SessionReport),
    Cancelled,
}

impl SessionOutcome {
    pub fn report(&self) -> Option<&SessionReport> {
        match self {
            SessionOutcome::Completed(report) => Some(report),
            SessionOutcome::Cancelled => None,
        }
    }
}

/// Cloneable, idempotent cancellation trigger.
#[derive(Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }
}

/// Handle to a running session. Dropping it, along with every
/// [`CancelHandle`] cloned from it, cancels the session.
pub struct SessionHandle {
    live: watch::Receiver<LiveState>,
    cancel: CancelHandle,
    task: JoinHandle<SessionOutcome>,
}

impl SessionHandle {
    pub fn live(&self) -> watch::Receiver<LiveState> {
        self.live.clone()
    }

    pub fn canceller(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the terminal outcome.
    pub async fn wait(self) -> Result<SessionOutcome> {
        let SessionHandle { task, cancel, .. } = self;
        let outcome = task.await.map_err(|e| EngineError::Task(e.to_string()));
        drop(cancel);
        outcome
    }
}

/// Validate the config, open the source and spawn the session task. No
/// session state exists if this fails.
pub async fn start_session<S>(config: EngineConfig, mut source: S) -> Result<SessionHandle>
where
    S: DetectionSource + 'static,
{
    let engine = SessionEngine::new(config)?;
    source.open().await?;

    let (live_tx, live_rx) = watch::channel(engine.live_state());
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let task = tokio::spawn(run_session(engine, source, live_tx, cancel_rx));

    Ok(SessionHandle {
        live: live_rx,
        cancel: CancelHandle(Arc::new(cancel_tx)),
        task,
    })
}

async fn run_session<S: DetectionSource>(
    mut engine: SessionEngine,
    mut source: S,
    live_tx: watch::Sender<LiveState>,
    mut cancel_rx: watch::Receiver<bool>,
) -> SessionOutcome {
    let session = &engine.config().session;
    let unit = Duration::from_millis(session.time_unit_ms);
    let recording_len = unit * session.recording_units;

    let started = Instant::now();
    let mut countdown = interval_at(started + unit, unit);
    countdown.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut recording_deadline =
        (engine.phase() == Phase::Recording).then(|| started + recording_len);
    let mut source_done = false;

    info!("Session {} running", engine.session_id());

    loop {
        let want_face = engine.wants_face();

        tokio::select! {
            biased;

            changed = cancel_rx.changed() => {
                if changed.is_err() || *cancel_rx.borrow() {
                    info!("Session {} cancelled", engine.session_id());
                    return SessionOutcome::Cancelled;
                }
            }

            _ = sleep_until(recording_deadline.unwrap_or(started)), if recording_deadline.is_some() => {
                if let Step::Finished(report) = engine.step(SessionEvent::RecordingElapsed) {
                    return SessionOutcome::Completed(report);
                }
            }

            _ = countdown.tick(), if engine.phase() == Phase::Calibrating => {
                if let Step::Continue(state) = engine.step(SessionEvent::CountdownTick) {
                    if state.phase == Phase::Recording {
                        recording_deadline = Some(Instant::now() + recording_len);
                    }
                    live_tx.send_replace(state);
                }
            }

            frame = source.next_frame(want_face), if !source_done => {
                match frame {
                    Ok(Some(frame)) => {
                        let now_ms = started.elapsed().as_millis() as u64;
                        if let Step::Continue(state) = engine.step(SessionEvent::Frame { frame, now_ms }) {
                            live_tx.send_replace(state);
                        }
                    }
                    Ok(None) => {
                        info!("Detection source exhausted, waiting for the session timer");
                        source_done = true;
                    }
                    Err(e) => warn!("Frame skipped: {}", e),
                }
                tokio::task::yield_now().await;
            }
        }
    }
}
