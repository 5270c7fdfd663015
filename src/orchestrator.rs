//! Workflow orchestrator for the caption client
//!
//! This module drives one caption run at a time: upload the image for a caption
//! and its translation, then fetch the spoken translation and materialize it as a
//! playable audio resource. The observable [`WorkflowState`] is a single cell
//! replaced wholesale on every transition; presentation layers read it through
//! [`WorkflowOrchestrator::current_state`] or follow it with
//! [`WorkflowOrchestrator::subscribe`].

use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::{oneshot, watch};

use crate::audio::{AudioHandle, AudioResourceManager, LiveAudio};
use crate::caption_service::CaptionService;
use crate::error::WorkflowError;
use crate::metrics::Metrics;
use crate::models::{CaptionRequest, CaptionResult};

/// Message shown for every failure that is not a service-reported caption error
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please check the server.";

/// Observable state of the workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state")]
pub enum WorkflowState {
    /// Nothing has run yet, or the last run was cancelled
    #[default]
    Idle,
    /// A run is in flight
    Running,
    /// Both calls succeeded and the audio is playable
    Succeeded {
        original_caption: String,
        translated_caption: String,
        audio_handle: AudioHandle,
    },
    /// The run ended with a single user-facing message
    Failed { message: String },
}

impl WorkflowState {
    pub fn is_running(&self) -> bool {
        matches!(self, WorkflowState::Running)
    }

    /// Audio of a successful run, for playback only
    pub fn audio_handle(&self) -> Option<&AudioHandle> {
        match self {
            WorkflowState::Succeeded { audio_handle, .. } => Some(audio_handle),
            _ => None,
        }
    }

    /// Failure message, if the run failed
    pub fn message(&self) -> Option<&str> {
        match self {
            WorkflowState::Failed { message } => Some(message),
            _ => None,
        }
    }

    /// Short label used for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Running => "running",
            WorkflowState::Succeeded { .. } => "succeeded",
            WorkflowState::Failed { .. } => "failed",
        }
    }
}

/// How a run ended, before it is published as a state
enum RunOutcome {
    Succeeded {
        original_caption: String,
        translated_caption: String,
        audio: LiveAudio,
    },
    /// Caption service reported an application error
    Rejected(String),
    /// Transport or audio failure
    Failed,
    Cancelled,
}

impl RunOutcome {
    fn label(&self) -> &'static str {
        match self {
            RunOutcome::Succeeded { .. } => "succeeded",
            RunOutcome::Rejected(_) => "rejected",
            RunOutcome::Failed => "failed",
            RunOutcome::Cancelled => "cancelled",
        }
    }
}

/// Mutable part of the orchestrator, guarded by one lock
struct OrchestratorInner {
    /// Publishes every transition. All writes happen while `inner` is locked.
    state_tx: watch::Sender<WorkflowState>,
    /// Backing resource of the audio in the current `Succeeded` state
    live_audio: Option<LiveAudio>,
    /// Signals the in-flight run to stop at its next suspension point
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl OrchestratorInner {
    fn state(&self) -> WorkflowState {
        self.state_tx.borrow().clone()
    }

    fn transition(&self, state: WorkflowState) {
        debug!("Workflow state -> {}", state.label());
        self.state_tx.send_replace(state);
    }
}

/// Puts the orchestrator back to `Idle` if a run is dropped before it finishes
struct RunGuard<'a> {
    orchestrator: &'a WorkflowOrchestrator,
    armed: bool,
}

impl<'a> RunGuard<'a> {
    fn new(orchestrator: &'a WorkflowOrchestrator) -> Self {
        Self {
            orchestrator,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.orchestrator.abandon_run();
        }
    }
}

/// Sequences the caption call, the audio call and the audio handle lifecycle
pub struct WorkflowOrchestrator {
    service: Arc<dyn CaptionService>,
    audio: Arc<dyn AudioResourceManager>,
    metrics: Metrics,
    /// Running check and transition to `Running` happen under one acquisition,
    /// which is what makes concurrent `start` calls safe. Never held across an await.
    inner: Mutex<OrchestratorInner>,
    state_rx: watch::Receiver<WorkflowState>,
}

impl WorkflowOrchestrator {
    /// Create an orchestrator in the `Idle` state
    pub fn new(service: Arc<dyn CaptionService>, audio: Arc<dyn AudioResourceManager>, metrics: Metrics) -> Self {
        let (state_tx, state_rx) = watch::channel(WorkflowState::Idle);
        Self {
            service,
            audio,
            metrics,
            inner: Mutex::new(OrchestratorInner {
                state_tx,
                live_audio: None,
                cancel_tx: None,
            }),
            state_rx,
        }
    }

    /// Snapshot of the current state
    pub fn current_state(&self) -> WorkflowState {
        self.state_rx.borrow().clone()
    }

    /// Receiver notified on every transition
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state_rx.clone()
    }

    /// Run the workflow once for `image` and `target_language`.
    ///
    /// Returns the terminal state of the run. Fails without touching the state
    /// when a run is already in flight or the image is empty. Dropping the
    /// returned future mid-run leaves the orchestrator `Idle`.
    pub async fn start<L: Into<String>>(
        &self,
        image: Vec<u8>,
        target_language: L,
    ) -> Result<WorkflowState, WorkflowError> {
        self.start_request(CaptionRequest::new(image, target_language)).await
    }

    /// Same as [`start`](Self::start), with full control over the upload
    pub async fn start_request(&self, request: CaptionRequest) -> Result<WorkflowState, WorkflowError> {
        if request.image_bytes.is_empty() {
            return Err(WorkflowError::NoImage);
        }

        let mut cancel_rx = match self.begin_run() {
            Ok(cancel_rx) => cancel_rx,
            Err(e) => {
                self.metrics.record_start_rejected().await;
                return Err(e);
            }
        };
        let guard = RunGuard::new(self);

        let language = request.target_language.clone();
        let started = Instant::now();
        self.metrics.set_live_audio_handles(0).await;
        self.metrics.record_run_started(&language).await;
        info!(
            "Starting caption run ({} bytes, language {})",
            request.image_bytes.len(),
            language
        );

        let outcome = self.execute(request, &mut cancel_rx).await;
        let (state, label) = self.finish_run(outcome, &mut cancel_rx);
        guard.disarm();

        self.metrics
            .record_run_finished(&language, label, started.elapsed().as_secs_f64())
            .await;
        if let Some(handle) = state.audio_handle() {
            self.metrics.record_audio_payload(handle.size_bytes()).await;
        }
        self.metrics
            .set_live_audio_handles(usize::from(state.audio_handle().is_some()))
            .await;

        Ok(state)
    }

    /// Ask the in-flight run to stop at its next suspension point.
    ///
    /// Returns false when no run is in flight. A cancelled run ends in `Idle`.
    pub async fn cancel(&self) -> bool {
        let mut inner = self.lock_inner();
        match inner.cancel_tx.take() {
            Some(cancel_tx) => {
                info!("Cancelling caption run");
                cancel_tx.send(()).is_ok()
            }
            None => false,
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, OrchestratorInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Move to `Running` and drop the previous audio, or refuse if a run is in flight
    fn begin_run(&self) -> Result<oneshot::Receiver<()>, WorkflowError> {
        let mut inner = self.lock_inner();
        if inner.state().is_running() {
            warn!("Caption run already in progress, ignoring start");
            return Err(WorkflowError::AlreadyRunning);
        }

        let (cancel_tx, cancel_rx) = oneshot::channel();
        inner.cancel_tx = Some(cancel_tx);
        inner.transition(WorkflowState::Running);
        // Released here, before any network call of the new run
        if let Some(previous) = inner.live_audio.take() {
            debug!("Releasing audio of the previous run: {}", previous.handle());
        }
        Ok(cancel_rx)
    }

    /// The two remote calls, in strict order
    async fn execute(&self, request: CaptionRequest, cancel_rx: &mut oneshot::Receiver<()>) -> RunOutcome {
        let caption = tokio::select! {
            biased;
            Ok(()) = &mut *cancel_rx => return RunOutcome::Cancelled,
            result = self.service.caption_and_translate(request) => result,
        };

        let (original_caption, translated_caption) = match caption {
            Ok(CaptionResult::Captioned {
                original_caption,
                translated_caption,
            }) => (original_caption, translated_caption),
            Ok(CaptionResult::Rejected { error_message }) => {
                warn!("Caption service reported an error: {}", error_message);
                return RunOutcome::Rejected(error_message);
            }
            Err(e) => {
                error!("Caption request failed: {}", e);
                return RunOutcome::Failed;
            }
        };

        let payload = tokio::select! {
            biased;
            Ok(()) = &mut *cancel_rx => return RunOutcome::Cancelled,
            result = self.service.fetch_audio() => result,
        };

        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                error!("Audio request failed, discarding caption: {}", e);
                return RunOutcome::Failed;
            }
        };

        match LiveAudio::materialize(Arc::clone(&self.audio), payload) {
            Ok(audio) => RunOutcome::Succeeded {
                original_caption,
                translated_caption,
                audio,
            },
            Err(e) => {
                error!("Failed to materialize audio, discarding caption: {}", e);
                RunOutcome::Failed
            }
        }
    }

    /// Publish the terminal state of the run.
    ///
    /// A cancel that landed after the last remote call still wins: it was sent
    /// under the same lock, so it is visible here.
    fn finish_run(&self, outcome: RunOutcome, cancel_rx: &mut oneshot::Receiver<()>) -> (WorkflowState, &'static str) {
        let mut inner = self.lock_inner();
        inner.cancel_tx = None;

        let outcome = if cancel_rx.try_recv().is_ok() {
            RunOutcome::Cancelled
        } else {
            outcome
        };
        let label = outcome.label();

        let (state, live_audio) = match outcome {
            RunOutcome::Succeeded {
                original_caption,
                translated_caption,
                audio,
            } => {
                info!("Caption run succeeded, audio at {}", audio.handle());
                let state = WorkflowState::Succeeded {
                    original_caption,
                    translated_caption,
                    audio_handle: audio.handle().clone(),
                };
                (state, Some(audio))
            }
            RunOutcome::Rejected(message) => (WorkflowState::Failed { message }, None),
            RunOutcome::Failed => (
                WorkflowState::Failed {
                    message: GENERIC_FAILURE_MESSAGE.to_string(),
                },
                None,
            ),
            RunOutcome::Cancelled => {
                info!("Caption run cancelled");
                (WorkflowState::Idle, None)
            }
        };

        // Replacing the slot releases whatever it held
        inner.live_audio = live_audio;
        inner.transition(state.clone());
        (state, label)
    }

    /// Reset after a run whose future was dropped before `finish_run`
    fn abandon_run(&self) {
        let mut inner = self.lock_inner();
        inner.cancel_tx = None;
        inner.live_audio = None;
        if inner.state().is_running() {
            warn!("Caption run dropped before completion, back to idle");
            inner.transition(WorkflowState::Idle);
        }
    }
}
