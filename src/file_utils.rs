// File utilities for the caption client
//
// This module contains the filesystem helpers behind the audio store.
// It handles creating unique folders for each payload and removing them again.

use log::{debug, error};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Location reserved for one materialized payload
#[derive(Debug, Clone)]
pub struct PayloadPaths {
    /// Unique folder for this payload
    pub folder: PathBuf,
    /// File path inside the folder
    pub file: PathBuf,
    /// UUID naming both the folder and the file
    pub id: Uuid,
}

/// Generate a unique filename with UUID and create a subfolder for it
///
/// # Arguments
///
/// * `base_dir` - Base directory for materialized payloads
/// * `prefix` - Prefix for the filename
/// * `extension` - File extension
///
/// # Errors
///
/// Returns an IO error if directory creation fails
pub fn generate_unique_paths(base_dir: &Path, prefix: &str, extension: &str) -> io::Result<PayloadPaths> {
    let id = Uuid::new_v4();
    let folder = base_dir.join(id.to_string());
    fs::create_dir_all(&folder)?;

    let file = folder.join(format!("{}_{}.{}", prefix, id, extension));

    Ok(PayloadPaths { folder, file, id })
}

/// Save payload bytes to the filesystem
pub fn save_file_data(data: &[u8], file_path: &Path) -> io::Result<()> {
    let mut file = File::create(file_path)?;
    file.write_all(data)?;
    file.flush()?;
    Ok(())
}

/// Clean up a folder and its contents
///
/// A folder that is already gone counts as cleaned up.
/// Other errors are logged but not returned to the caller.
pub fn cleanup_folder(folder_path: &Path) {
    match fs::remove_dir_all(folder_path) {
        Ok(()) => debug!("Cleaned up folder: {}", folder_path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Folder already removed: {}", folder_path.display())
        }
        Err(e) => error!("Failed to clean up folder {}: {}", folder_path.display(), e),
    }
}
