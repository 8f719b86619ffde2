use models::errors::ModelError;
use models::profile::UserType;
use models::route::Route;
use thiserror::Error;

/// Failure kinds for sign-in/sign-up/restore and the orchestrator's
/// operations on top of them. Expected failures are values of this type and
/// never cross the orchestrator boundary as panics.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error("invalid email or password")]
    InvalidCredentials,
    /// Credentials were valid but the profile's user type does not match the
    /// sign-in channel. Carries the actual type so the caller can point at
    /// the right form.
    #[error("account is registered as {actual}")]
    AccountTypeMismatch { actual: UserType },
    #[error("an account with this email already exists")]
    EmailExists,
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    /// Unexpected provider behavior: malformed envelope, unknown status.
    #[error("provider error: {0}")]
    Provider(String),
    #[error("{0}")]
    Validation(String),
    /// A sign-in with the same email is already pending.
    #[error("sign-in already in progress")]
    AlreadyInFlight,
}

impl From<ModelError> for SessionError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Validation(msg) => SessionError::Validation(msg),
        }
    }
}

impl SessionError {
    /// True for the one failure kind that may trigger the account recovery
    /// check. Type mismatches and transport failures never do.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, SessionError::InvalidCredentials)
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, SessionError::Network(_) | SessionError::Timeout)
    }

    /// Actionable user-facing message; never a raw provider string.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::InvalidCredentials => {
                "Email or password is incorrect. Try again, or check whether your \
                 account can be recovered."
                    .into()
            }
            SessionError::AccountTypeMismatch { actual } => format!(
                "This email belongs to a {} account. Sign in at {} instead.",
                actual,
                Route::sign_in_for(*actual).as_path()
            ),
            SessionError::EmailExists => {
                "An account with this email already exists. Try signing in.".into()
            }
            SessionError::Network(_) | SessionError::Timeout => {
                "Connection problem. Check your network and try again.".into()
            }
            SessionError::Provider(_) => {
                "Something went wrong on our side. Please try again.".into()
            }
            SessionError::Validation(msg) => msg.clone(),
            SessionError::AlreadyInFlight => "Sign-in already in progress.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invalid_credentials_triggers_recovery() {
        assert!(SessionError::InvalidCredentials.is_credential_failure());
        assert!(!SessionError::AccountTypeMismatch {
            actual: UserType::Individual
        }
        .is_credential_failure());
        assert!(!SessionError::Network("down".into()).is_credential_failure());
        assert!(!SessionError::Timeout.is_credential_failure());
    }

    #[test]
    fn mismatch_message_names_the_right_form() {
        let msg = SessionError::AccountTypeMismatch {
            actual: UserType::Individual,
        }
        .user_message();
        assert!(msg.contains("individual"));
        assert!(msg.contains("/signin/individual"));
    }

    #[test]
    fn raw_provider_detail_is_not_leaked() {
        let msg = SessionError::Provider("unexpected 502 from upstream".into()).user_message();
        assert!(!msg.contains("502"));
    }
}
