//! Route decisions derived from `AuthState`. Pure functions: the shell
//! performs the navigation, this module only decides.

use models::route::Route;
use models::state::{AuthStage, AuthState, ProfileStatus};

/// Where the user lands after auth resolution. Routing is keyed by user
/// type only; tier gates in-page features, never navigation. An unverified
/// email still routes; verification is a reminder, not a lockout.
pub fn dashboard_route(state: &AuthState) -> Route {
    match &state.stage {
        AuthStage::Initializing | AuthStage::Unauthenticated => Route::SignIn,
        AuthStage::Authenticated {
            profile: ProfileStatus::Ready(profile),
            ..
        } => Route::dashboard_for(profile.user_type),
        AuthStage::Authenticated { .. } => Route::SettingUp,
    }
}

/// What the guard tells the shell to do for a requested path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardAction {
    /// Still loading: render a placeholder, perform no navigation.
    Hold,
    Allow {
        /// Overlay a non-blocking verification reminder. Never gates
        /// functionality.
        verification_reminder: bool,
    },
    Redirect {
        to: Route,
        /// Requested path to return to after sign-in.
        return_to: Option<String>,
    },
}

fn is_public(path: &str) -> bool {
    path == "/" || path.starts_with("/signin")
}

/// Side-effect-free guard decision for a navigation to `requested_path`.
pub fn decide(state: &AuthState, requested_path: &str) -> GuardAction {
    if state.is_loading() {
        return GuardAction::Hold;
    }
    match &state.stage {
        AuthStage::Unauthenticated => {
            if is_public(requested_path) {
                GuardAction::Allow {
                    verification_reminder: false,
                }
            } else {
                GuardAction::Redirect {
                    to: Route::SignIn,
                    return_to: Some(requested_path.to_string()),
                }
            }
        }
        AuthStage::Authenticated { profile, .. } => {
            // A dashboard request without a resolved profile parks on the
            // neutral setting-up page rather than guessing a destination.
            if !matches!(profile, ProfileStatus::Ready(_))
                && requested_path.starts_with("/dashboard")
            {
                return GuardAction::Redirect {
                    to: Route::SettingUp,
                    return_to: Some(requested_path.to_string()),
                };
            }
            GuardAction::Allow {
                verification_reminder: !state.email_verified(),
            }
        }
        AuthStage::Initializing => GuardAction::Hold,
    }
}
