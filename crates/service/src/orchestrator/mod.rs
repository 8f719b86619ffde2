//! The process-wide authentication state machine. Owns `AuthState` as a
//! single-writer watch channel; everything else in the application only
//! subscribes.

pub mod service;

pub use service::AuthOrchestrator;
