use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::warn;

use super::Session;

/// Durable single-slot storage for the persisted [`Session`].
///
/// There is exactly one slot; writes are last-write-wins. Production uses
/// [`FileStore`], tests use [`MemoryStore`].
pub trait SessionStore: Send + Sync {
    /// Reads the persisted session, if any.
    fn load(&self) -> Result<Option<Session>>;
    /// Replaces the slot with `session`.
    fn save(&self, session: &Session) -> Result<()>;
    /// Empties the slot. A no-op when already empty.
    fn clear(&self) -> Result<()>;
}

/// One JSON document at a fixed path.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileStore {
    fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read session file {}", self.path.display()))?;
        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // A corrupt slot is treated as absent rather than fatal.
                warn!(path = %self.path.display(), error = %e, "Discarding unreadable session file");
                Ok(None)
            }
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write session file {}", self.path.display()))
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove session file {}", self.path.display()))?;
        }
        Ok(())
    }
}

/// In-memory slot for tests.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<Option<Session>> {
        Ok(self.slot.lock().unwrap().clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.slot.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}
