//! Hospital session lifecycle: identity, persistence, restoration.
//!
//! A [`Session`] is all-or-nothing: either every field is populated or no
//! session exists. The [`SessionManager`] owns the only mutable handle;
//! other components read the session but never change it.

mod store;

pub use store::{FileStore, MemoryStore, SessionStore};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Minimum registration password length, enforced before any network call.
pub const MIN_PASSWORD_LEN: usize = 6;

/// An authenticated hospital identity, exactly as returned by the login
/// endpoint and persisted to the durable slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub hospital_id: String,
    pub display_name: String,
    /// Human-shareable login code handed out at registration.
    pub short_code: String,
    /// Opaque bearer credential for authenticated calls.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Where the operator is in the authentication flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Anonymous,
    Registering,
    LoggingIn,
    Authenticated,
}

/// Owns the session state machine and its durable storage.
///
/// Invariant: the phase is `Authenticated` iff a session is held, and the
/// durable slot is written before the in-memory state changes, so a reload
/// racing a login never observes credentials the slot does not have.
pub struct SessionManager {
    store: Box<dyn SessionStore>,
    phase: SessionPhase,
    session: Option<Session>,
}

impl SessionManager {
    pub fn new(store: Box<dyn SessionStore>) -> Self {
        Self {
            store,
            phase: SessionPhase::Anonymous,
            session: None,
        }
    }

    /// Restores a persisted session at startup, returning it if one exists.
    ///
    /// A restored session is accepted provisionally: it is not validated
    /// against the backend until the first authenticated call either
    /// succeeds or comes back 401.
    pub fn restore(&mut self) -> Result<Option<Session>> {
        match self.store.load()? {
            Some(session) => {
                info!(hospital_id = %session.hospital_id, "Restored persisted session");
                self.session = Some(session.clone());
                self.phase = SessionPhase::Authenticated;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Operator opened the registration form.
    pub fn begin_registration(&mut self) {
        if self.phase != SessionPhase::Authenticated {
            self.phase = SessionPhase::Registering;
        }
    }

    /// Operator moved to the login form, directly or after registering.
    pub fn begin_login(&mut self) {
        if self.phase != SessionPhase::Authenticated {
            self.phase = SessionPhase::LoggingIn;
        }
    }

    /// Installs a session returned by a successful login.
    ///
    /// The durable slot is written first; only then does the in-memory
    /// state become `Authenticated`.
    pub fn establish(&mut self, session: Session) -> Result<()> {
        self.store.save(&session)?;
        info!(hospital_id = %session.hospital_id, display_name = %session.display_name, "Session established");
        self.session = Some(session);
        self.phase = SessionPhase::Authenticated;
        Ok(())
    }

    /// Explicit logout: clears the slot and returns to `Anonymous`.
    pub fn logout(&mut self) -> Result<()> {
        self.store.clear()?;
        self.session = None;
        self.phase = SessionPhase::Anonymous;
        Ok(())
    }

    /// Backend rejected the token (401): same cleanup as logout.
    pub fn invalidate(&mut self) -> Result<()> {
        if let Some(session) = &self.session {
            info!(hospital_id = %session.hospital_id, "Session rejected by backend, clearing");
        }
        self.logout()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }
}
