use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;

/// Account category, fixed at sign-up. Cross-type sign-in is rejected by the
/// profile resolver, so this never changes for a given subject id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Business,
    Individual,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Business => "business",
            UserType::Individual => "individual",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "business" => Ok(UserType::Business),
            "individual" => Ok(UserType::Individual),
            other => Err(ModelError::Validation(format!("unknown user type: {other}"))),
        }
    }
}

/// Subscription tier. Gates in-page feature visibility only, never routing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    FreeTrial,
    StartSmart,
    GrowIntelligence,
    EnterpriseAdvantage,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::FreeTrial => "free_trial",
            Tier::StartSmart => "start_smart",
            Tier::GrowIntelligence => "grow_intelligence",
            Tier::EnterpriseAdvantage => "enterprise_advantage",
        }
    }
}

impl FromStr for Tier {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free_trial" => Ok(Tier::FreeTrial),
            "start_smart" => Ok(Tier::StartSmart),
            "grow_intelligence" => Ok(Tier::GrowIntelligence),
            "enterprise_advantage" => Ok(Tier::EnterpriseAdvantage),
            other => Err(ModelError::Validation(format!("unknown tier: {other}"))),
        }
    }
}

/// Durable business/user record, keyed by the session's subject id (1:1).
///
/// A missing `tier` in a stored row deserializes to `FreeTrial`; an absent
/// tier is not a representable state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub user_type: UserType,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub business_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker. A set marker means the account is inside its
    /// recovery window and must be treated as not found by resolvers.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn is_soft_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    if email.trim().is_empty() {
        return Err(ModelError::Validation("email required".into()));
    }
    if !email.contains('@') {
        return Err(ModelError::Validation("invalid email".into()));
    }
    Ok(())
}

/// Sign-in only requires a non-empty password; strength is checked at sign-up.
pub fn validate_password(password: &str) -> Result<(), ModelError> {
    if password.is_empty() {
        return Err(ModelError::Validation("password required".into()));
    }
    Ok(())
}

pub fn validate_new_password(password: &str) -> Result<(), ModelError> {
    if password.len() < 8 {
        return Err(ModelError::Validation("password too short (>=8)".into()));
    }
    Ok(())
}
