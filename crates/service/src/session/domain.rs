use chrono::{DateTime, Utc};
use models::profile::UserType;
use models::session::Session;
use serde::{Deserialize, Serialize};

/// Sign-up input. The profile row is created server-side from the metadata
/// carried here; it may lag the session, which downstream resolution
/// tolerates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub user_type: UserType,
    pub business_name: Option<String>,
}

/// Parameters the provider hands back on the OAuth redirect return: either
/// tokens in the URL fragment, or a `code`/`state` pair to exchange.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthCallbackParams {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub code: Option<String>,
    pub state: Option<String>,
}

/// What the local storage slot holds between launches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub session: Session,
    pub saved_at: DateTime<Utc>,
}

impl PersistedSession {
    pub fn now(session: Session) -> Self {
        Self {
            session,
            saved_at: Utc::now(),
        }
    }
}
