//! Service layer for the authentication core: session store, profile
//! resolution, account recovery, the auth orchestrator, and route decisions.
//! - Remote backends (identity provider, profile rows, recovery endpoint)
//!   sit behind traits so mocks and HTTP adapters interchange.
//! - Components return typed errors; only the orchestrator owns `AuthState`.

pub mod orchestrator;
pub mod profile;
pub mod recovery;
pub mod routing;
pub mod session;
