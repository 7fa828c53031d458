use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use super::persistence::{MemoryPersistence, PersistedSession, SessionPersistence};
use crate::config::DEFAULT_AUTH_SCHEME;
use crate::error::{ClientError, Result};

/// Snapshot of the authenticated identity. A session without a token never
/// carries a user id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    user_id: Option<String>,
}

impl Session {
    pub fn empty() -> Self {
        Self::default()
    }

    fn authenticated(token: String, user_id: Option<String>) -> Self {
        Self {
            token: Some(token),
            user_id,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Single source of truth for the current credential.
///
/// Reads return a cloned snapshot and never touch storage. Writes swap the
/// in-memory session first and persist after the read lock is released; a
/// persistence failure is logged and the in-memory session stays
/// authoritative for this process.
pub struct SessionStore {
    current: RwLock<Session>,
    // Serializes writers so the file always ends up matching memory.
    writes: Mutex<()>,
    persistence: Arc<dyn SessionPersistence>,
    auth_scheme: String,
}

impl SessionStore {
    /// Opens the store and restores whatever session the persistence layer
    /// holds. Unreadable state is logged and treated as logged out.
    pub fn open(persistence: Arc<dyn SessionPersistence>, auth_scheme: &str) -> Self {
        let restored = match persistence.load() {
            Ok(Some(saved)) => match normalize_token(&saved.token, auth_scheme) {
                Some(token) => {
                    log::info!("Restored persisted session");
                    Session::authenticated(token, clean_user_id(saved.user_id.as_deref()))
                }
                None => {
                    log::warn!("Persisted session has an empty token, ignoring it");
                    Session::empty()
                }
            },
            Ok(None) => Session::empty(),
            Err(err) => {
                log::warn!("Failed to restore session: {}", err);
                Session::empty()
            }
        };

        Self {
            current: RwLock::new(restored),
            writes: Mutex::new(()),
            persistence,
            auth_scheme: auth_scheme.to_string(),
        }
    }

    pub fn in_memory() -> Self {
        Self::open(Arc::new(MemoryPersistence::new()), DEFAULT_AUTH_SCHEME)
    }

    /// Stores token and user id together. A token that already carries the
    /// auth scheme is stored bare.
    pub fn set(&self, token: &str, user_id: Option<&str>) -> Result<()> {
        let token = normalize_token(token, &self.auth_scheme).ok_or(ClientError::InvalidSession)?;
        let user_id = clean_user_id(user_id);

        let _writing = self.writes.lock();
        *self.current.write() = Session::authenticated(token.clone(), user_id.clone());

        let saved = PersistedSession { token, user_id };
        if let Err(err) = self.persistence.save(&saved) {
            log::warn!("Session stored in memory only: {}", err);
        }

        log::info!(
            "Session established for user {}",
            saved.user_id.as_deref().unwrap_or("<unknown>")
        );
        Ok(())
    }

    pub fn get(&self) -> Session {
        self.current.read().clone()
    }

    /// Drops the credential. Clearing an empty store is a no-op.
    pub fn clear(&self) {
        let _writing = self.writes.lock();
        self.erase_locked();
    }

    /// Drops the credential only while `token` is still the current one.
    /// Returns whether anything was cleared.
    pub fn clear_if(&self, token: &str) -> bool {
        let _writing = self.writes.lock();
        if self.current.read().token() != Some(token) {
            log::debug!("Session changed since the request was sent, keeping it");
            return false;
        }
        self.erase_locked();
        true
    }

    fn erase_locked(&self) {
        let had_token = std::mem::take(&mut *self.current.write()).is_authenticated();

        if let Err(err) = self.persistence.erase() {
            log::warn!("Failed to erase persisted session: {}", err);
        }

        if had_token {
            log::info!("Session cleared");
        }
    }

    /// `Authorization` header value for the current token, if any.
    pub fn authorization(&self) -> Option<String> {
        self.current.read().token().map(|token| self.header_value(token))
    }

    pub fn header_value(&self, token: &str) -> String {
        format!("{} {}", self.auth_scheme, token)
    }
}

/// Strips a leading `<scheme> ` (any case) and surrounding whitespace.
fn normalize_token(raw: &str, scheme: &str) -> Option<String> {
    let trimmed = raw.trim();
    let bare = match trimmed.split_once(char::is_whitespace) {
        Some((prefix, rest)) if prefix.eq_ignore_ascii_case(scheme) => rest.trim(),
        _ if trimmed.eq_ignore_ascii_case(scheme) => "",
        _ => trimmed,
    };

    (!bare.is_empty()).then(|| bare.to_string())
}

fn clean_user_id(user_id: Option<&str>) -> Option<String> {
    user_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
