use models::profile::UserType;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProfileError {
    /// The profile exists but belongs to the other account category.
    #[error("account is registered as {actual}")]
    TypeMismatch { actual: UserType },
    #[error("profile fetch failed: {0}")]
    Fetch(String),
    #[error("profile fetch timed out")]
    Timeout,
}
