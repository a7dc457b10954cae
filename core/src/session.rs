//! Authentication state: the bearer token and the signed-in user.
//!
//! The store is created once at startup and handed to the client. When a
//! file path is configured the session survives restarts; `clear` removes
//! both the in-memory copy and the file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    current: Arc<RwLock<Option<Session>>>,
    path: Option<PathBuf>,
}

impl SessionStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load a persisted session from `path` if one exists. A missing file is
    /// an empty session; an unreadable one is logged and ignored.
    pub fn persistent(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = match read_session(&path) {
            Ok(session) => session,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable session file");
                None
            }
        };
        Self {
            current: Arc::new(RwLock::new(current)),
            path: Some(path),
        }
    }

    pub fn get(&self) -> Option<Session> {
        self.current.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.current.read().as_ref().map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.current.read().as_ref().and_then(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn set(&self, session: Session) -> io::Result<()> {
        if let Some(path) = &self.path {
            let json = serde_json::to_vec_pretty(&session)?;
            fs::write(path, json)?;
        }
        *self.current.write() = Some(session);
        debug!("session stored");
        Ok(())
    }

    /// Replace the cached user, keeping the token.
    pub fn set_user(&self, user: User) -> io::Result<()> {
        match self.get() {
            Some(session) => self.set(Session {
                user: Some(user),
                ..session
            }),
            None => Ok(()),
        }
    }

    pub fn clear(&self) -> io::Result<()> {
        *self.current.write() = None;
        if let Some(path) = &self.path {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(err),
            }
        }
        debug!("session cleared");
        Ok(())
    }
}

fn read_session(path: &Path) -> io::Result<Option<Session>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}
