//! Session file saving and loading.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::error::{PersistenceError, Result};
use super::format::SessionFile;
use crate::config::SessionDefaults;
use crate::session::SessionState;

/// Save a session snapshot as pretty-printed JSON.
///
/// Uses atomic write (temp file + rename) so an interrupted save never
/// leaves a half-written file behind.
pub fn save_session(state: &SessionState, path: &Path) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(&SessionFile::from_session(state))
        .map_err(|source| PersistenceError::Serialization { source })?;

    let temp_path = path.with_extension("json.tmp");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PersistenceError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut file = File::create(&temp_path).map_err(|e| PersistenceError::Io {
        operation: "create",
        path: temp_path.clone(),
        source: e,
    })?;

    file.write_all(&bytes).map_err(|e| PersistenceError::Io {
        operation: "write",
        path: temp_path.clone(),
        source: e,
    })?;

    file.sync_all().map_err(|e| PersistenceError::Io {
        operation: "sync",
        path: temp_path.clone(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| PersistenceError::AtomicWriteFailed {
        temp_path: temp_path.clone(),
        target_path: path.to_path_buf(),
        source: e,
    })?;

    tracing::info!("Saved session to {}", path.display());
    Ok(())
}

/// Load a session snapshot. The result is always stopped.
pub fn load_session(path: &Path, defaults: &SessionDefaults) -> Result<SessionState> {
    let bytes = fs::read(path).map_err(|e| PersistenceError::Io {
        operation: "read",
        path: path.to_path_buf(),
        source: e,
    })?;

    let file: SessionFile =
        serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Deserialization {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::info!("Loaded session from {}", path.display());
    Ok(file.into_session(defaults))
}

/// Save on the blocking thread pool so a slow disk never stalls the caller.
pub async fn save_session_async(state: SessionState, path: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || save_session(&state, &path))
        .await
        .map_err(|source| PersistenceError::TaskJoin { source })?
}

/// Load on the blocking thread pool so a slow disk never stalls the caller.
pub async fn load_session_async(path: PathBuf, defaults: SessionDefaults) -> Result<SessionState> {
    tokio::task::spawn_blocking(move || load_session(&path, &defaults))
        .await
        .map_err(|source| PersistenceError::TaskJoin { source })?
}
