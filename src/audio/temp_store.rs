// Temporary-directory audio store
//
// Each payload is written to its own UUID folder under the audio directory,
// and the folder is removed when the handle is released.

use log::{debug, info};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{AudioHandle, AudioResourceManager};
use crate::error::AudioError;
use crate::file_utils::{cleanup_folder, generate_unique_paths, save_file_data};

const FILE_PREFIX: &str = "speech";
const FILE_EXTENSION: &str = "mp3";

/// Materializes audio payloads as files under a base directory
#[derive(Debug)]
pub struct TempDirAudioStore {
    base_dir: PathBuf,
    /// Folder of every handle not yet released, by handle id
    live: Mutex<HashMap<Uuid, PathBuf>>,
}

impl TempDirAudioStore {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
            live: Mutex::new(HashMap::new()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn live(&self) -> MutexGuard<'_, HashMap<Uuid, PathBuf>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AudioResourceManager for TempDirAudioStore {
    fn materialize(&self, payload: Vec<u8>) -> Result<AudioHandle, AudioError> {
        let paths = generate_unique_paths(&self.base_dir, FILE_PREFIX, FILE_EXTENSION)?;
        if let Err(e) = save_file_data(&payload, &paths.file) {
            cleanup_folder(&paths.folder);
            return Err(e.into());
        }

        self.live().insert(paths.id, paths.folder);
        info!("Materialized {} bytes of audio at {}", payload.len(), paths.file.display());
        Ok(AudioHandle::new(paths.id, paths.file, payload.len()))
    }

    fn release(&self, handle: &AudioHandle) {
        let folder = self.live().remove(&handle.id());
        match folder {
            Some(folder) => {
                cleanup_folder(&folder);
                debug!("Released audio handle {}", handle.id());
            }
            None => debug!("Audio handle {} already released", handle.id()),
        }
    }

    fn live_handles(&self) -> usize {
        self.live().len()
    }
}

impl Drop for TempDirAudioStore {
    fn drop(&mut self) {
        for (_, folder) in self.live().drain() {
            cleanup_folder(&folder);
        }
    }
}
