use crate::profile::Profile;
use crate::session::Session;

/// Outcome of profile resolution for an authenticated session.
#[derive(Clone, Debug, PartialEq)]
pub enum ProfileStatus {
    /// Resolution in flight; downstream pages must not gate on it yet.
    Pending,
    Ready(Profile),
    /// Retries exhausted. The session is still valid; pages show a
    /// "setting up your account" affordance, never a logged-out view.
    Unavailable,
}

/// The process-wide authentication stage. `Authenticated` is left only via
/// explicit sign-out or token-invalidation detection.
#[derive(Clone, Debug, PartialEq)]
pub enum AuthStage {
    Initializing,
    Unauthenticated,
    Authenticated {
        session: Session,
        profile: ProfileStatus,
    },
}

/// What the rest of the application observes. Single writer (the
/// orchestrator), any number of readers.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthState {
    pub stage: AuthStage,
    /// Last user-facing failure, if any. Cleared on the next successful
    /// transition.
    pub error: Option<String>,
}

impl AuthState {
    pub fn initializing() -> Self {
        Self {
            stage: AuthStage::Initializing,
            error: None,
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            stage: AuthStage::Unauthenticated,
            error: None,
        }
    }

    /// While loading, all redirect/gating decisions downstream are
    /// suppressed.
    pub fn is_loading(&self) -> bool {
        matches!(self.stage, AuthStage::Initializing)
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.stage {
            AuthStage::Authenticated { session, .. } => Some(session),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        match &self.stage {
            AuthStage::Authenticated {
                profile: ProfileStatus::Ready(profile),
                ..
            } => Some(profile),
            _ => None,
        }
    }

    /// Effective verification flag: provider-verified emails are trusted
    /// regardless of the stored profile flag.
    pub fn email_verified(&self) -> bool {
        match &self.stage {
            AuthStage::Authenticated { session, profile } => {
                session.provider.email_trusted()
                    || matches!(profile, ProfileStatus::Ready(p) if p.email_verified)
            }
            _ => false,
        }
    }
}
