use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use models::profile::UserType;
use models::recovery::RecoverableAccountInfo;
use models::route::Route;
use models::session::{Provider, Session};
use models::state::{AuthStage, AuthState, ProfileStatus};

use crate::profile::errors::ProfileError;
use crate::profile::{validate_user_type, ProfileResolver};
use crate::recovery::{RecoveryChecker, RecoveryError};
use crate::routing;
use crate::session::domain::{OAuthCallbackParams, SignUpInput};
use crate::session::{SessionError, SessionStore};

struct PendingSignIn {
    gen: u64,
    email: String,
}

/// Composes the session store, profile resolver, and recovery checker into
/// one state machine.
///
/// Ordering rules upheld here:
/// - a profile fetch is never initiated before a session is confirmed;
/// - sign-out publishes `Unauthenticated` before any network call is issued;
/// - of overlapping operations, the last one *initiated* wins: stale results
///   are discarded when they resolve, whatever order that happens in.
///
/// Expected failures come back as typed errors. Anything unexpected on the
/// session-establishing paths degrades to `Unauthenticated` with a logged
/// diagnostic, never a half-authenticated state.
pub struct AuthOrchestrator {
    sessions: SessionStore,
    profiles: ProfileResolver,
    recovery: RecoveryChecker,
    state: watch::Sender<AuthState>,
    op_gen: AtomicU64,
    publish_lock: Mutex<()>,
    pending_sign_in: Mutex<Option<PendingSignIn>>,
}

impl AuthOrchestrator {
    pub fn new(
        sessions: SessionStore,
        profiles: ProfileResolver,
        recovery: RecoveryChecker,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::initializing());
        Self {
            sessions,
            profiles,
            recovery,
            state,
            op_gen: AtomicU64::new(0),
            publish_lock: Mutex::new(()),
            pending_sign_in: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn dashboard_route(&self) -> Route {
        routing::dashboard_route(&self.current())
    }

    /// Bootstrap: restore the persisted session, then resolve its profile.
    /// Call once at application start.
    pub async fn init(&self) {
        let gen = self.next_gen();
        self.publish_if_current(gen, AuthState::initializing());

        let Some(session) = self.sessions.restore().await else {
            info!("no restorable session; starting unauthenticated");
            self.publish_if_current(gen, AuthState::unauthenticated());
            return;
        };
        info!(subject_id = %session.subject_id, "session restored");
        self.publish_if_current(gen, authenticated(session.clone(), ProfileStatus::Pending));
        let status = self.profiles.resolve(session.subject_id).await;
        self.publish_if_current(gen, authenticated(session, status));
    }

    /// Password sign-in for a channel that may expect a specific account
    /// type. On a cross-type match the fresh session is signed back out and
    /// the actual type is reported so the UI can link the right form.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        expected: Option<UserType>,
    ) -> Result<Session, SessionError> {
        let gen = self.begin_attempt(email)?;
        let result = async {
            let session = self.sessions.sign_in(email, password).await?;
            self.complete_session(gen, session, expected).await
        }
        .await;
        self.end_attempt(gen);
        if let Err(err) = &result {
            self.fail_if_current(gen, err);
        }
        result
    }

    pub async fn sign_up(&self, input: &SignUpInput) -> Result<Session, SessionError> {
        let gen = self.begin_attempt(&input.email)?;
        let result = async {
            let session = self.sessions.sign_up(input).await?;
            // The profile row may lag the session; Pending/Unavailable is an
            // acceptable landing state, not an error.
            self.complete_session(gen, session, None).await
        }
        .await;
        self.end_attempt(gen);
        if let Err(err) = &result {
            self.fail_if_current(gen, err);
        }
        result
    }

    /// Provider redirect URL for an OAuth sign-in; the shell navigates.
    pub fn begin_oauth(
        &self,
        provider: Provider,
        redirect_to: &str,
    ) -> Result<String, SessionError> {
        self.sessions.begin_oauth(provider, redirect_to)
    }

    /// Handle the redirect return. Equivalent to a sign-in success; a
    /// provider-verified email is trusted via the session's provider tag.
    pub async fn complete_oauth(
        &self,
        params: &OAuthCallbackParams,
    ) -> Result<Session, SessionError> {
        let gen = self.next_gen();
        let result = async {
            let session = self.sessions.complete_oauth(params).await?;
            self.complete_session(gen, session, None).await
        }
        .await;
        if let Err(err) = &result {
            error!(%err, "oauth callback failed; degrading to unauthenticated");
            self.publish_if_current(
                gen,
                AuthState {
                    stage: AuthStage::Unauthenticated,
                    error: Some(err.user_message()),
                },
            );
        }
        result
    }

    /// Publishes `Unauthenticated` synchronously, then clears local storage
    /// and fires the best-effort remote invalidation. The UI never waits on
    /// the network to see the sign-out.
    pub async fn sign_out(&self) {
        let gen = self.next_gen();
        let subject_id = self.current().session().map(|s| s.subject_id);
        self.publish_if_current(gen, AuthState::unauthenticated());
        if let Some(subject_id) = subject_id {
            self.profiles.invalidate(subject_id).await;
        }
        self.sessions.sign_out().await;
    }

    /// Offer the recovery check after a failed sign-in. Only a credential
    /// failure qualifies; returning `None` for every other kind keeps
    /// account existence from leaking on unrelated failures.
    pub async fn check_recovery_after_failure(
        &self,
        last_error: &SessionError,
        email: &str,
    ) -> Option<Result<RecoverableAccountInfo, RecoveryError>> {
        if !last_error.is_credential_failure() {
            return None;
        }
        Some(self.recovery.check_by_email(email).await)
    }

    /// Transparent refresh ahead of expiry. Publishes only if no newer
    /// operation started while the refresh was in flight; a dead grant
    /// degrades to `Unauthenticated`.
    pub async fn refresh_if_needed(&self) {
        let gen = self.op_gen.load(Ordering::SeqCst);
        let (session, profile) = match self.current().stage {
            AuthStage::Authenticated { session, profile } => (session, profile),
            _ => return,
        };
        match self.sessions.refresh_if_needed(&session).await {
            Some(fresh) => {
                if fresh != session {
                    self.publish_if_current(
                        gen,
                        AuthState {
                            stage: AuthStage::Authenticated {
                                session: fresh,
                                profile,
                            },
                            error: None,
                        },
                    );
                }
            }
            None => {
                warn!("session refresh failed; signing out locally");
                if self.publish_if_current(gen, AuthState::unauthenticated()) {
                    self.profiles.invalidate(session.subject_id).await;
                    self.sessions.sign_out().await;
                }
            }
        }
    }

    async fn complete_session(
        &self,
        gen: u64,
        session: Session,
        expected: Option<UserType>,
    ) -> Result<Session, SessionError> {
        if !self.publish_if_current(gen, authenticated(session.clone(), ProfileStatus::Pending)) {
            // Superseded before the session could land. The store already
            // persisted it, so roll the slot forward to whatever won.
            match self.current().session() {
                Some(winner) => self.sessions.remember(winner).await,
                None => self.sessions.forget().await,
            }
            return Ok(session);
        }
        let status = self.profiles.resolve(session.subject_id).await;

        if let (Some(expected), ProfileStatus::Ready(profile)) = (expected, &status) {
            if let Err(ProfileError::TypeMismatch { actual }) =
                validate_user_type(profile, expected)
            {
                warn!(%actual, %expected, "cross-type sign-in rejected");
                self.profiles.invalidate(session.subject_id).await;
                self.sessions.sign_out().await;
                self.publish_if_current(gen, AuthState::unauthenticated());
                return Err(SessionError::AccountTypeMismatch { actual });
            }
        }

        self.publish_if_current(gen, authenticated(session.clone(), status));
        Ok(session)
    }

    fn next_gen(&self) -> u64 {
        self.op_gen.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish unless a newer operation has started since `gen` was issued.
    fn publish_if_current(&self, gen: u64, state: AuthState) -> bool {
        let _guard = self.publish_lock.lock().unwrap();
        if self.op_gen.load(Ordering::SeqCst) == gen {
            self.state.send_replace(state);
            true
        } else {
            debug!(gen, "discarding stale auth transition");
            false
        }
    }

    /// Record a failed attempt. An existing authenticated session survives
    /// someone else's failed sign-in; any other stage settles on
    /// `Unauthenticated` so no loading state lingers past a failure.
    fn fail_if_current(&self, gen: u64, err: &SessionError) {
        let _guard = self.publish_lock.lock().unwrap();
        if self.op_gen.load(Ordering::SeqCst) == gen {
            let mut state = self.state.borrow().clone();
            if !matches!(state.stage, AuthStage::Authenticated { .. }) {
                state.stage = AuthStage::Unauthenticated;
            }
            state.error = Some(err.user_message());
            self.state.send_replace(state);
        }
    }

    /// In-flight guard: a second sign-in with the same email while one is
    /// pending is a duplicate submission. A different email supersedes the
    /// pending attempt instead.
    fn begin_attempt(&self, email: &str) -> Result<u64, SessionError> {
        let mut pending = self.pending_sign_in.lock().unwrap();
        if let Some(p) = pending.as_ref() {
            if p.email == email {
                return Err(SessionError::AlreadyInFlight);
            }
        }
        let gen = self.next_gen();
        *pending = Some(PendingSignIn {
            gen,
            email: email.to_string(),
        });
        Ok(gen)
    }

    fn end_attempt(&self, gen: u64) {
        let mut pending = self.pending_sign_in.lock().unwrap();
        if pending.as_ref().map(|p| p.gen) == Some(gen) {
            *pending = None;
        }
    }
}

fn authenticated(session: Session, profile: ProfileStatus) -> AuthState {
    AuthState {
        stage: AuthStage::Authenticated { session, profile },
        error: None,
    }
}
