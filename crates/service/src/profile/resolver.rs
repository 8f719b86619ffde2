use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, warn};
use uuid::Uuid;

use common::utils::backoff::Backoff;
use common::utils::deadline::with_deadline;
use configs::AuthConfig;
use models::profile::{Profile, UserType};
use models::state::ProfileStatus;

use super::errors::ProfileError;
use super::store::ProfileStore;

const CACHE_CAPACITY: u64 = 64;
const CACHE_TTL: Duration = Duration::from_secs(30);

/// Resolves a subject id to its profile row. A fetch is only ever initiated
/// for a confirmed session; the orchestrator upholds that ordering.
pub struct ProfileResolver {
    store: Arc<dyn ProfileStore>,
    cache: Cache<Uuid, Profile>,
    fetch_timeout: Duration,
    attempts: u32,
    base_delay: Duration,
}

impl ProfileResolver {
    pub fn new(store: Arc<dyn ProfileStore>, cfg: &AuthConfig) -> Self {
        Self {
            store,
            cache: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
            fetch_timeout: Duration::from_secs(cfg.profile_fetch_timeout_secs),
            attempts: cfg.profile_retry_attempts,
            base_delay: Duration::from_millis(cfg.profile_retry_base_delay_ms),
        }
    }

    /// Fetch with a bounded retry budget. NotFound and transient failures
    /// both consume attempts; exhaustion yields `Unavailable`, never an
    /// error: the session is still valid and pages show a "setting up"
    /// affordance instead of a logged-out view.
    pub async fn resolve(&self, subject_id: Uuid) -> ProfileStatus {
        if let Some(profile) = self.cache.get(&subject_id).await {
            return ProfileStatus::Ready(profile);
        }

        // attempts delays between them, so attempts - 1 backoff steps
        let mut backoff = Backoff::new(self.base_delay, self.attempts.saturating_sub(1));
        for attempt in 1..=self.attempts {
            match with_deadline(self.fetch_timeout, self.store.fetch_by_subject(subject_id)).await
            {
                Ok(Ok(Some(profile))) if !profile.is_soft_deleted() => {
                    self.cache.insert(subject_id, profile.clone()).await;
                    return ProfileStatus::Ready(profile);
                }
                Ok(Ok(Some(_))) => {
                    // Soft-deleted rows are inside their recovery window and
                    // must never reach profile_ready.
                    debug!(%subject_id, attempt, "profile row is soft-deleted");
                }
                Ok(Ok(None)) => {
                    debug!(%subject_id, attempt, "profile row not found yet");
                }
                Ok(Err(err)) => {
                    warn!(%subject_id, attempt, %err, "profile fetch failed");
                }
                Err(elapsed) => {
                    warn!(%subject_id, attempt, %elapsed, "profile fetch timed out");
                }
            }
            if let Some(delay) = backoff.next() {
                tokio::time::sleep(delay).await;
            }
        }
        warn!(%subject_id, attempts = self.attempts, "profile resolution exhausted");
        ProfileStatus::Unavailable
    }

    pub async fn invalidate(&self, subject_id: Uuid) {
        self.cache.invalidate(&subject_id).await;
    }
}

/// Channel-specific sign-in forms reject the other account category and
/// report which form to use instead.
pub fn validate_user_type(profile: &Profile, expected: UserType) -> Result<(), ProfileError> {
    if profile.user_type == expected {
        Ok(())
    } else {
        Err(ProfileError::TypeMismatch {
            actual: profile.user_type,
        })
    }
}
