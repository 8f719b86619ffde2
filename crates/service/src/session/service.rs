use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use common::utils::backoff::Backoff;
use common::utils::deadline::with_deadline;
use configs::AuthConfig;
use models::profile::{validate_email, validate_new_password, validate_password};
use models::session::{Provider, Session};

use super::domain::{OAuthCallbackParams, PersistedSession, SignUpInput};
use super::errors::SessionError;
use super::provider::IdentityProvider;
use super::storage::SessionStorage;

const RESTORE_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Session store: the identity provider's lifecycle behind four operations,
/// plus the persisted local slot.
pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    storage: Arc<dyn SessionStorage>,
    restore_timeout: Duration,
    restore_retries: u32,
    refresh_margin: chrono::Duration,
}

impl SessionStore {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        storage: Arc<dyn SessionStorage>,
        cfg: &AuthConfig,
    ) -> Self {
        Self {
            provider,
            storage,
            restore_timeout: Duration::from_secs(cfg.restore_timeout_secs),
            restore_retries: cfg.restore_retry_attempts,
            refresh_margin: chrono::Duration::seconds(cfg.session_refresh_margin_secs as i64),
        }
    }

    /// Password sign-in. Never auto-retried: a duplicate submission is worse
    /// than a surfaced transient error.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, SessionError> {
        validate_email(email)?;
        validate_password(password)?;
        let session = self.provider.sign_in_with_password(email, password).await?;
        info!(subject_id = %session.subject_id, "signed in");
        self.persist(&session).await;
        Ok(session)
    }

    pub async fn sign_up(&self, input: &SignUpInput) -> Result<Session, SessionError> {
        validate_email(&input.email)?;
        validate_new_password(&input.password)?;
        let session = self.provider.sign_up_with_password(input).await?;
        info!(subject_id = %session.subject_id, user_type = %input.user_type, "signed up");
        self.persist(&session).await;
        Ok(session)
    }

    /// Build the provider redirect URL for an OAuth sign-in. The session
    /// materializes only after the provider redirects back.
    pub fn begin_oauth(
        &self,
        provider: Provider,
        redirect_to: &str,
    ) -> Result<String, SessionError> {
        self.provider.authorize_url(provider, redirect_to)
    }

    pub async fn complete_oauth(
        &self,
        params: &OAuthCallbackParams,
    ) -> Result<Session, SessionError> {
        let session = self.provider.exchange_callback(params).await?;
        info!(subject_id = %session.subject_id, provider = %session.provider, "oauth callback completed");
        self.persist(&session).await;
        Ok(session)
    }

    /// Clear the local slot first, then best-effort remote invalidation.
    /// Local state always clears, whatever the network does.
    pub async fn sign_out(&self) {
        let persisted = self.storage.load().await;
        self.storage.clear().await;
        if let Some(persisted) = persisted {
            if let Err(err) = self
                .provider
                .sign_out(&persisted.session.access_token)
                .await
            {
                warn!(%err, "remote sign-out failed; local session already cleared");
            }
        }
    }

    /// Restore the persisted session at process start. Transient failures
    /// are retried once with backoff, then fail open to logged-out, never
    /// to a stale authenticated state.
    pub async fn restore(&self) -> Option<Session> {
        let persisted = self.storage.load().await?;
        let mut session = persisted.session;

        if session.needs_refresh(Utc::now(), self.refresh_margin) {
            match self.refresh_if_needed(&session).await {
                Some(fresh) => session = fresh,
                None => {
                    self.storage.clear().await;
                    return None;
                }
            }
        }

        let mut backoff = Backoff::new(RESTORE_RETRY_BASE_DELAY, self.restore_retries);
        loop {
            match with_deadline(self.restore_timeout, self.provider.current_session(&session))
                .await
            {
                Ok(Ok(Some(confirmed))) => {
                    self.persist(&confirmed).await;
                    return Some(confirmed);
                }
                Ok(Ok(None)) => {
                    info!("provider denied persisted session; clearing");
                    self.storage.clear().await;
                    return None;
                }
                Ok(Err(err)) if err.is_transient() => {
                    warn!(%err, "session restore failed transiently");
                }
                Ok(Err(err)) => {
                    warn!(%err, "session restore failed; clearing");
                    self.storage.clear().await;
                    return None;
                }
                Err(elapsed) => {
                    warn!(%elapsed, "session restore timed out");
                }
            }
            match backoff.next() {
                Some(delay) => tokio::time::sleep(delay).await,
                // Keep the slot: the session may be fine once the network is.
                None => return None,
            }
        }
    }

    /// Transparently refresh a session close to expiry. `None` means the
    /// grant is gone and the caller must treat the user as signed out.
    pub async fn refresh_if_needed(&self, session: &Session) -> Option<Session> {
        let now = Utc::now();
        if !session.needs_refresh(now, self.refresh_margin) {
            return Some(session.clone());
        }
        match with_deadline(
            self.restore_timeout,
            self.provider.refresh(&session.refresh_token),
        )
        .await
        {
            Ok(Ok(fresh)) => {
                debug!(subject_id = %fresh.subject_id, "session refreshed");
                self.persist(&fresh).await;
                Some(fresh)
            }
            Ok(Err(err)) if err.is_transient() => {
                warn!(%err, "session refresh failed transiently");
                (!session.is_expired(now)).then(|| session.clone())
            }
            Ok(Err(err)) => {
                warn!(%err, "session refresh rejected");
                None
            }
            Err(elapsed) => {
                warn!(%elapsed, "session refresh timed out");
                (!session.is_expired(now)).then(|| session.clone())
            }
        }
    }

    /// Re-point the slot at `session`. Used when a superseded operation's
    /// write has to be rolled forward to the winning session.
    pub(crate) async fn remember(&self, session: &Session) {
        self.persist(session).await;
    }

    /// Clear the slot without touching the provider.
    pub(crate) async fn forget(&self) {
        self.storage.clear().await;
    }

    async fn persist(&self, session: &Session) {
        if let Err(err) = self
            .storage
            .save(&PersistedSession::now(session.clone()))
            .await
        {
            // The in-memory session is still valid for this run.
            warn!(%err, "failed to persist session");
        }
    }
}
