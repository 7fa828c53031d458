use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// On-disk form of a session. Only written while a token exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionIoError {
    #[error("failed to read session file: {0}")]
    Read(std::io::Error),
    #[error("failed to write session file: {0}")]
    Write(std::io::Error),
    #[error("failed to decode session file: {0}")]
    Deserialize(serde_json::Error),
    #[error("failed to encode session file: {0}")]
    Serialize(serde_json::Error),
}

/// Durable storage behind [`super::SessionStore`].
pub trait SessionPersistence: Send + Sync {
    fn load(&self) -> Result<Option<PersistedSession>, SessionIoError>;
    fn save(&self, session: &PersistedSession) -> Result<(), SessionIoError>;
    fn erase(&self) -> Result<(), SessionIoError>;
}

/// JSON file persistence. Writes go through a sibling temp file and a rename so
/// a crash never leaves a half-written session behind.
#[derive(Debug, Clone)]
pub struct FileSessionPersistence {
    path: PathBuf,
}

impl FileSessionPersistence {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SessionPersistence for FileSessionPersistence {
    fn load(&self) -> Result<Option<PersistedSession>, SessionIoError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(SessionIoError::Read(err)),
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(SessionIoError::Deserialize)
    }

    fn save(&self, session: &PersistedSession) -> Result<(), SessionIoError> {
        let encoded = serde_json::to_vec_pretty(session).map_err(SessionIoError::Serialize)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(SessionIoError::Write)?;
            }
        }

        let temp = self.temp_path();
        fs::write(&temp, encoded).map_err(SessionIoError::Write)?;
        restrict_permissions(&temp)?;
        fs::rename(&temp, &self.path).map_err(SessionIoError::Write)
    }

    fn erase(&self) -> Result<(), SessionIoError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(SessionIoError::Write(err)),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), SessionIoError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(SessionIoError::Write)
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), SessionIoError> {
    Ok(())
}

/// Keeps the session in process memory only. Two stores opened on the same
/// instance see each other's writes, which is how tests simulate a restart.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    slot: Mutex<Option<PersistedSession>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }

    pub fn snapshot(&self) -> Option<PersistedSession> {
        self.slot.lock().clone()
    }
}

impl SessionPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<PersistedSession>, SessionIoError> {
        Ok(self.slot.lock().clone())
    }

    fn save(&self, session: &PersistedSession) -> Result<(), SessionIoError> {
        *self.slot.lock() = Some(session.clone());
        Ok(())
    }

    fn erase(&self) -> Result<(), SessionIoError> {
        *self.slot.lock() = None;
        Ok(())
    }
}
