use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity provider that issued the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Password,
    Google,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Password => "password",
            Provider::Google => "google",
        }
    }

    /// Provider-verified emails (OAuth) are trusted without a separate
    /// confirmation step.
    pub fn email_trusted(&self) -> bool {
        matches!(self, Provider::Google)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An active authentication grant. Either fully present or absent; no field
/// is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub subject_id: Uuid,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub provider: Provider,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// True once the grant is within `margin` of expiry and should be
    /// refreshed before use.
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at <= now + margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expires_at: DateTime<Utc>) -> Session {
        Session {
            subject_id: Uuid::new_v4(),
            email: "owner@acme.test".into(),
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_at,
            provider: Provider::Password,
        }
    }

    #[test]
    fn expiry_math() {
        let now = Utc::now();
        let s = session(now + Duration::seconds(120));
        assert!(!s.is_expired(now));
        assert!(!s.needs_refresh(now, Duration::seconds(60)));
        assert!(s.needs_refresh(now, Duration::seconds(180)));
        assert!(session(now - Duration::seconds(1)).is_expired(now));
    }

    #[test]
    fn provider_trust() {
        assert!(Provider::Google.email_trusted());
        assert!(!Provider::Password.email_trusted());
    }
}
