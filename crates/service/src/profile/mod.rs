//! Profile resolution: maps a confirmed session's subject id to the durable
//! business/user record, with a bounded retry budget for the sign-up race
//! where the row lags the session.

pub mod errors;
pub mod http;
pub mod resolver;
pub mod store;

pub use errors::ProfileError;
pub use resolver::{validate_user_type, ProfileResolver};
