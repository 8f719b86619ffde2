//! Account recovery check: given an email, decide whether a soft-deleted
//! account is still inside its recovery window. Used pre-authentication,
//! only after a credential failure.

pub mod checker;
pub mod endpoint;
pub mod errors;
pub mod http;

pub use checker::RecoveryChecker;
pub use errors::RecoveryError;
