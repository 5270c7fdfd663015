#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

use caption_client::{
    AudioError, AudioHandle, AudioResourceManager, CaptionRequest, CaptionResult, CaptionService, Metrics,
    TransportError, WorkflowOrchestrator,
};

/// What the fake service answers to the caption call
#[derive(Debug, Clone)]
pub enum CaptionReply {
    Captions(String, String),
    ServiceError(String),
    Unreachable,
}

impl CaptionReply {
    pub fn captions(original: &str, translated: &str) -> Self {
        CaptionReply::Captions(original.to_string(), translated.to_string())
    }
}

/// What the fake service answers to the audio call
#[derive(Debug, Clone)]
pub enum AudioReply {
    Payload(Vec<u8>),
    Unavailable,
}

/// Scripted `CaptionService` counting its calls
pub struct FakeCaptionService {
    caption_reply: Mutex<CaptionReply>,
    audio_reply: Mutex<AudioReply>,
    caption_calls: AtomicUsize,
    audio_calls: AtomicUsize,
    last_request: Mutex<Option<CaptionRequest>>,
    gate: Option<Gate>,
    gate_audio: bool,
}

/// Holds a service call until the test opens it
pub struct Gate {
    pub entered: Notify,
    pub open: Notify,
}

impl FakeCaptionService {
    pub fn new(caption_reply: CaptionReply, audio_reply: AudioReply) -> Self {
        Self {
            caption_reply: Mutex::new(caption_reply),
            audio_reply: Mutex::new(audio_reply),
            caption_calls: AtomicUsize::new(0),
            audio_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            gate: None,
            gate_audio: false,
        }
    }

    /// Caption calls wait on `gate().open` after signalling `gate().entered`
    pub fn gated(mut self) -> Self {
        self.gate = Some(Gate {
            entered: Notify::new(),
            open: Notify::new(),
        });
        self
    }

    /// Same as `gated`, but the audio call waits instead of the caption call
    pub fn gated_on_audio(mut self) -> Self {
        self.gate_audio = true;
        self.gated()
    }

    pub fn gate(&self) -> &Gate {
        self.gate.as_ref().expect("service is not gated")
    }

    pub fn succeeding(original: &str, translated: &str, payload_len: usize) -> Self {
        Self::new(
            CaptionReply::captions(original, translated),
            AudioReply::Payload(vec![0xAB; payload_len]),
        )
    }

    pub fn set_caption_reply(&self, reply: CaptionReply) {
        *self.caption_reply.lock().unwrap() = reply;
    }

    pub fn set_audio_reply(&self, reply: AudioReply) {
        *self.audio_reply.lock().unwrap() = reply;
    }

    pub fn caption_calls(&self) -> usize {
        self.caption_calls.load(Ordering::SeqCst)
    }

    pub fn audio_calls(&self) -> usize {
        self.audio_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CaptionRequest> {
        self.last_request.lock().unwrap().clone()
    }

    async fn wait_at_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.open.notified().await;
        }
    }
}

#[async_trait]
impl CaptionService for FakeCaptionService {
    async fn caption_and_translate(&self, request: CaptionRequest) -> Result<CaptionResult, TransportError> {
        self.caption_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);

        if !self.gate_audio {
            self.wait_at_gate().await;
        }

        let reply = self.caption_reply.lock().unwrap().clone();
        match reply {
            CaptionReply::Captions(original_caption, translated_caption) => Ok(CaptionResult::Captioned {
                original_caption,
                translated_caption,
            }),
            CaptionReply::ServiceError(error_message) => Ok(CaptionResult::Rejected { error_message }),
            CaptionReply::Unreachable => Err(TransportError::Status {
                status: 502,
                body: String::new(),
            }),
        }
    }

    async fn fetch_audio(&self) -> Result<Vec<u8>, TransportError> {
        self.audio_calls.fetch_add(1, Ordering::SeqCst);
        if self.gate_audio {
            self.wait_at_gate().await;
        }
        let reply = self.audio_reply.lock().unwrap().clone();
        match reply {
            AudioReply::Payload(payload) => Ok(payload),
            AudioReply::Unavailable => Err(TransportError::Status {
                status: 500,
                body: "tts offline".to_string(),
            }),
        }
    }
}

/// In-memory `AudioResourceManager` recording every materialize and release
#[derive(Default)]
pub struct RecordingAudioManager {
    inner: Mutex<Recording>,
    fail_materialize: std::sync::atomic::AtomicBool,
}

#[derive(Default)]
struct Recording {
    materialized: Vec<Uuid>,
    releases: HashMap<Uuid, usize>,
    live: HashSet<Uuid>,
    max_live: usize,
}

impl RecordingAudioManager {
    pub fn failing_materialize(&self, fail: bool) {
        self.fail_materialize.store(fail, Ordering::SeqCst);
    }

    pub fn materialized(&self) -> Vec<Uuid> {
        self.inner.lock().unwrap().materialized.clone()
    }

    /// Times `release` was called for a materialized handle
    pub fn release_count(&self, id: Uuid) -> usize {
        self.inner.lock().unwrap().releases.get(&id).copied().unwrap_or(0)
    }

    pub fn is_live(&self, id: Uuid) -> bool {
        self.inner.lock().unwrap().live.contains(&id)
    }

    pub fn max_live(&self) -> usize {
        self.inner.lock().unwrap().max_live
    }
}

impl AudioResourceManager for RecordingAudioManager {
    fn materialize(&self, payload: Vec<u8>) -> Result<AudioHandle, AudioError> {
        if self.fail_materialize.load(Ordering::SeqCst) {
            return Err(AudioError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only audio dir",
            )));
        }
        let id = Uuid::new_v4();
        let mut inner = self.inner.lock().unwrap();
        inner.materialized.push(id);
        inner.live.insert(id);
        inner.max_live = inner.max_live.max(inner.live.len());
        Ok(AudioHandle::new(id, PathBuf::from(format!("/memory/{}.mp3", id)), payload.len()))
    }

    fn release(&self, handle: &AudioHandle) {
        let mut inner = self.inner.lock().unwrap();
        if inner.live.remove(&handle.id()) {
            *inner.releases.entry(handle.id()).or_insert(0) += 1;
        }
    }

    fn live_handles(&self) -> usize {
        self.inner.lock().unwrap().live.len()
    }
}

pub struct Harness {
    pub service: Arc<FakeCaptionService>,
    pub audio: Arc<RecordingAudioManager>,
    pub orchestrator: WorkflowOrchestrator,
}

impl Harness {
    pub fn new(service: FakeCaptionService) -> Self {
        let service = Arc::new(service);
        let audio = Arc::new(RecordingAudioManager::default());
        let orchestrator = WorkflowOrchestrator::new(service.clone(), audio.clone(), Metrics::default());
        Self {
            service,
            audio,
            orchestrator,
        }
    }
}

pub fn image(tag: u8) -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', tag]
}
