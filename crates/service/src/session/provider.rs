use async_trait::async_trait;
use models::session::{Provider, Session};

use super::domain::{OAuthCallbackParams, SignUpInput};
use super::errors::SessionError;

/// Backend abstraction over the hosted identity provider.
///
/// `current_session` revalidates a persisted grant with the provider; it is
/// the only read the restore path is allowed to retry.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, SessionError>;

    async fn sign_up_with_password(&self, input: &SignUpInput) -> Result<Session, SessionError>;

    /// Build the provider redirect URL. Navigation itself is the shell's
    /// job; the session materializes only on the callback return.
    fn authorize_url(&self, provider: Provider, redirect_to: &str)
        -> Result<String, SessionError>;

    async fn exchange_callback(
        &self,
        params: &OAuthCallbackParams,
    ) -> Result<Session, SessionError>;

    async fn refresh(&self, refresh_token: &str) -> Result<Session, SessionError>;

    /// Confirm a persisted session with the provider. `Ok(None)` means the
    /// provider denies the grant (revoked or expired beyond refresh).
    async fn current_session(&self, session: &Session)
        -> Result<Option<Session>, SessionError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), SessionError>;
}

/// Scriptable in-memory provider for tests and doc examples.
pub mod mock {
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use chrono::Utc;
    use tokio::sync::Notify;
    use uuid::Uuid;

    use super::*;

    struct MockAccount {
        password: String,
        session: Session,
    }

    #[derive(Default)]
    pub struct MockIdentityProvider {
        accounts: Mutex<HashMap<String, MockAccount>>, // key: email
        sign_in_delays: Mutex<HashMap<String, Duration>>,
        current_session_errors: Mutex<VecDeque<SessionError>>,
        current_session_calls: AtomicUsize,
        oauth_session: Mutex<Option<Session>>,
        sign_out_gate: Mutex<Option<Arc<Notify>>>,
        sign_out_completed: AtomicBool,
        sign_out_fails: AtomicBool,
    }

    impl MockIdentityProvider {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register a password account and return the session sign-in will
        /// issue for it.
        pub fn register(&self, email: &str, password: &str) -> Session {
            let session = Session {
                subject_id: Uuid::new_v4(),
                email: email.to_string(),
                access_token: format!("at-{}", Uuid::new_v4()),
                refresh_token: format!("rt-{}", Uuid::new_v4()),
                expires_at: Utc::now() + chrono::Duration::hours(1),
                provider: Provider::Password,
            };
            self.accounts.lock().unwrap().insert(
                email.to_string(),
                MockAccount {
                    password: password.to_string(),
                    session: session.clone(),
                },
            );
            session
        }

        /// Delay the next sign-in attempts for `email`, to script races.
        pub fn set_sign_in_delay(&self, email: &str, delay: Duration) {
            self.sign_in_delays
                .lock()
                .unwrap()
                .insert(email.to_string(), delay);
        }

        /// Queue a failure for the next `current_session` call.
        pub fn push_current_session_error(&self, err: SessionError) {
            self.current_session_errors.lock().unwrap().push_back(err);
        }

        pub fn current_session_calls(&self) -> usize {
            self.current_session_calls.load(Ordering::SeqCst)
        }

        /// Session handed out when an OAuth callback is exchanged.
        pub fn set_oauth_session(&self, session: Session) {
            *self.oauth_session.lock().unwrap() = Some(session);
        }

        /// Make remote sign-out block until the returned handle is notified.
        pub fn gate_sign_out(&self) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            *self.sign_out_gate.lock().unwrap() = Some(gate.clone());
            gate
        }

        pub fn sign_out_completed(&self) -> bool {
            self.sign_out_completed.load(Ordering::SeqCst)
        }

        pub fn fail_sign_out(&self) {
            self.sign_out_fails.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl IdentityProvider for MockIdentityProvider {
        async fn sign_in_with_password(
            &self,
            email: &str,
            password: &str,
        ) -> Result<Session, SessionError> {
            let delay = self.sign_in_delays.lock().unwrap().get(email).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some(account) if account.password == password => Ok(account.session.clone()),
                _ => Err(SessionError::InvalidCredentials),
            }
        }

        async fn sign_up_with_password(
            &self,
            input: &SignUpInput,
        ) -> Result<Session, SessionError> {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(&input.email) {
                return Err(SessionError::EmailExists);
            }
            let session = Session {
                subject_id: Uuid::new_v4(),
                email: input.email.clone(),
                access_token: format!("at-{}", Uuid::new_v4()),
                refresh_token: format!("rt-{}", Uuid::new_v4()),
                expires_at: Utc::now() + chrono::Duration::hours(1),
                provider: Provider::Password,
            };
            accounts.insert(
                input.email.clone(),
                MockAccount {
                    password: input.password.clone(),
                    session: session.clone(),
                },
            );
            Ok(session)
        }

        fn authorize_url(
            &self,
            provider: Provider,
            redirect_to: &str,
        ) -> Result<String, SessionError> {
            Ok(format!(
                "mock://authorize?provider={}&redirect_to={}",
                provider, redirect_to
            ))
        }

        async fn exchange_callback(
            &self,
            params: &OAuthCallbackParams,
        ) -> Result<Session, SessionError> {
            if params.access_token.is_none() && params.code.is_none() {
                return Err(SessionError::Provider("callback carried no tokens".into()));
            }
            self.oauth_session
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| SessionError::Provider("no pending oauth grant".into()))
        }

        async fn refresh(&self, refresh_token: &str) -> Result<Session, SessionError> {
            let mut accounts = self.accounts.lock().unwrap();
            for account in accounts.values_mut() {
                if account.session.refresh_token == refresh_token {
                    account.session.access_token = format!("at-{}", Uuid::new_v4());
                    account.session.refresh_token = format!("rt-{}", Uuid::new_v4());
                    account.session.expires_at = Utc::now() + chrono::Duration::hours(1);
                    return Ok(account.session.clone());
                }
            }
            Err(SessionError::InvalidCredentials)
        }

        async fn current_session(
            &self,
            session: &Session,
        ) -> Result<Option<Session>, SessionError> {
            self.current_session_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.current_session_errors.lock().unwrap().pop_front() {
                return Err(err);
            }
            let accounts = self.accounts.lock().unwrap();
            let known = accounts
                .values()
                .find(|a| a.session.access_token == session.access_token)
                .map(|a| a.session.clone())
                .or_else(|| {
                    self.oauth_session
                        .lock()
                        .unwrap()
                        .clone()
                        .filter(|s| s.access_token == session.access_token)
                });
            Ok(known)
        }

        async fn sign_out(&self, _access_token: &str) -> Result<(), SessionError> {
            let gate = self.sign_out_gate.lock().unwrap().clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            self.sign_out_completed.store(true, Ordering::SeqCst);
            if self.sign_out_fails.load(Ordering::SeqCst) {
                return Err(SessionError::Network("invalidation failed".into()));
            }
            Ok(())
        }
    }
}
