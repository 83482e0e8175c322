//! Session persistence
//!
//! Keeps the signed-in session as JSON on disk so a restart does not sign the
//! user out. The file lives in the platform data directory by default.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::client::config::Config;
use crate::client::error::ClientError;
use crate::shared::Session;

#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The per-user default location, if the platform has a data directory
    pub fn default_location() -> Option<Self> {
        Config::session_path().map(Self::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored session; unreadable or corrupt files count as signed out
    pub fn load(&self) -> Option<Session> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read session file");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring corrupt session file");
                None
            }
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), ClientError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| io_error(&self.path, e))?;
        }
        let raw = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, raw).map_err(|e| io_error(&self.path, e))?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&self.path, e)),
        }
    }
}

fn io_error(path: &Path, err: io::Error) -> ClientError {
    ClientError::store(format!("session file {}: {}", path.display(), err))
}
