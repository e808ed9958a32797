//! On-disk session persistence.
//!
//! One small JSON file under the platform config dir. Writes are atomic
//! (temp file + rename); a file that fails to parse is archived next to the
//! original instead of being deleted, and the session falls back to empty.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use verse_common::Role;

/// Bump when the session file schema changes.
const SESSION_VERSION: u32 = 1;

/// Errors from session persistence.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("session file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no platform config directory available")]
    NoConfigDir,
}

/// Durable session state.
///
/// Broker credentials are never written here; only the token, the identity
/// it was issued to, the role resolved at login, and the base-URL override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionFile {
    pub version: u32,
    pub token: Option<String>,
    pub identity: Option<String>,
    pub role: Option<Role>,
    pub base_url: Option<String>,
}

impl SessionFile {
    pub fn empty() -> Self {
        Self {
            version: SESSION_VERSION,
            ..Self::default()
        }
    }
}

/// Handle to the session file location.
#[derive(Debug, Clone)]
pub struct SessionDisk {
    path: PathBuf,
}

impl SessionDisk {
    /// Use an explicit file path (tests, `state_dir` override).
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Use the platform default location.
    pub fn default_location() -> Result<Self, PersistError> {
        let proj =
            ProjectDirs::from("ai", "tradeverse", "verse-console").ok_or(PersistError::NoConfigDir)?;
        Ok(Self {
            path: proj.config_dir().join("session.json"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the session file.
    ///
    /// A missing file yields an empty session; a corrupt file is archived
    /// and also yields an empty session.
    pub fn load(&self) -> SessionFile {
        if !self.path.exists() {
            return SessionFile::empty();
        }
        match read_json(&self.path) {
            Ok(mut file) => {
                if file.version == 0 {
                    file.version = SESSION_VERSION;
                }
                file
            }
            Err(err) => {
                archive_corrupt(&self.path, &err);
                SessionFile::empty()
            }
        }
    }

    /// Persist the session file atomically.
    pub fn save(&self, file: &SessionFile) -> Result<(), PersistError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| PersistError::Io(std::io::Error::other("session path has no parent")))?;
        fs::create_dir_all(parent)?;

        let json = serde_json::to_string_pretty(file)?;
        atomic_write(&self.path, json.as_bytes())?;
        Ok(())
    }
}

fn read_json(path: &Path) -> Result<SessionFile, PersistError> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn archive_corrupt(path: &Path, err: &PersistError) {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let archived = path.with_extension(format!("corrupt.{ts}.json"));
    if fs::rename(path, &archived).is_ok() {
        warn!(?archived, error = %err, "session file corrupt; archived");
    } else {
        warn!(?path, error = %err, "session file corrupt; could not archive");
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let parent = path
        .parent()
        .ok_or_else(|| PersistError::Io(std::io::Error::other("no parent dir")))?;
    let tmp = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        let _ = f.sync_all();
    }

    fs::rename(&tmp, path)?;
    Ok(())
}
