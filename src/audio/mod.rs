//! Audio resources handed back by the speech endpoint.
//!
//! A payload becomes playable once an [`AudioResourceManager`] materializes it
//! into an [`AudioHandle`]. The orchestrator keeps the handle inside a
//! [`LiveAudio`] guard so it is released exactly once, whether it is replaced
//! by the next run or the orchestrator is dropped.

pub mod temp_store;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AudioError;

pub use self::temp_store::TempDirAudioStore;

/// Content type the speech endpoint is expected to return
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Read-only view of a materialized audio resource.
///
/// Cloning a handle does not extend the life of the resource; only the
/// manager that produced it may release it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioHandle {
    id: Uuid,
    path: PathBuf,
    content_type: String,
    size_bytes: usize,
    created_at: DateTime<Utc>,
}

impl AudioHandle {
    pub fn new(id: Uuid, path: PathBuf, size_bytes: usize) -> Self {
        Self {
            id,
            path,
            content_type: AUDIO_CONTENT_TYPE.to_string(),
            size_bytes,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Location a player can open
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl fmt::Display for AudioHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.path.display(), self.size_bytes)
    }
}

/// Turns raw speech payloads into playable local resources
pub trait AudioResourceManager: Send + Sync {
    /// Allocate a new playable resource holding `payload`
    fn materialize(&self, payload: Vec<u8>) -> Result<AudioHandle, AudioError>;

    /// Free the resource behind `handle`. Unknown or already released handles are ignored.
    fn release(&self, handle: &AudioHandle);

    /// Number of handles materialized and not yet released
    fn live_handles(&self) -> usize;
}

/// Owns one live handle and releases it when dropped
pub struct LiveAudio {
    manager: Arc<dyn AudioResourceManager>,
    handle: AudioHandle,
}

impl LiveAudio {
    /// Materialize `payload` and take ownership of the resulting handle
    pub fn materialize(manager: Arc<dyn AudioResourceManager>, payload: Vec<u8>) -> Result<Self, AudioError> {
        let handle = manager.materialize(payload)?;
        Ok(Self { manager, handle })
    }

    pub fn handle(&self) -> &AudioHandle {
        &self.handle
    }
}

impl fmt::Debug for LiveAudio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveAudio").field("handle", &self.handle).finish()
    }
}

impl Drop for LiveAudio {
    fn drop(&mut self) {
        self.manager.release(&self.handle);
    }
}
