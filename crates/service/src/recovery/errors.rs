use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecoveryError {
    /// The account was restored moments ago; the user should simply retry
    /// sign-in rather than race a second recovery.
    #[error("account was restored recently; try signing in again")]
    RecentlyRestored,
    #[error("recovery check failed: {0}")]
    Check(String),
    #[error("recovery check timed out")]
    Timeout,
}
