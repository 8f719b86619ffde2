use std::path::PathBuf;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use tokio::fs;
use tracing::warn;

use super::domain::PersistedSession;
use super::errors::SessionError;

/// Local persisted-session slot. One session at a time; cleared atomically
/// on sign-out. `clear` is infallible by contract: local state always wins
/// over remote failures.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn load(&self) -> Option<PersistedSession>;
    async fn save(&self, session: &PersistedSession) -> Result<(), SessionError>;
    async fn clear(&self);
}

/// Process-local slot, for shells that do not persist across restarts and
/// for tests.
#[derive(Default)]
pub struct MemorySessionStorage {
    slot: ArcSwapOption<PersistedSession>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn load(&self) -> Option<PersistedSession> {
        self.slot.load_full().map(|s| (*s).clone())
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), SessionError> {
        self.slot.store(Some(std::sync::Arc::new(session.clone())));
        Ok(())
    }

    async fn clear(&self) {
        self.slot.store(None);
    }
}

/// JSON file-backed slot under the configured storage path. Clearing removes
/// the file so a crashed sign-out can never resurrect the session.
pub struct JsonSessionStorage {
    file_path: PathBuf,
}

impl JsonSessionStorage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            file_path: path.into(),
        }
    }
}

#[async_trait]
impl SessionStorage for JsonSessionStorage {
    async fn load(&self) -> Option<PersistedSession> {
        let bytes = fs::read(&self.file_path).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(session) => Some(session),
            Err(err) => {
                warn!(%err, "persisted session is unreadable; treating as absent");
                None
            }
        }
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), SessionError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).await.ok();
        }
        let data = serde_json::to_vec(session)
            .map_err(|e| SessionError::Provider(format!("serialize session: {e}")))?;
        fs::write(&self.file_path, data)
            .await
            .map_err(|e| SessionError::Provider(format!("persist session: {e}")))?;
        Ok(())
    }

    async fn clear(&self) {
        if let Err(err) = fs::remove_file(&self.file_path).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(%err, "failed to remove persisted session file");
            }
        }
    }
}
