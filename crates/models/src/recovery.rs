use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::UserType;

/// Result of checking an email against the soft-delete store. Computed on
/// demand and never cached beyond the check that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecoverableAccountInfo {
    pub has_recoverable_account: bool,
    #[serde(default)]
    pub user_type: Option<UserType>,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Days left in the recovery window. Zero means the window has closed
    /// and the account must be treated as absent.
    #[serde(default)]
    pub days_remaining: u32,
}

impl RecoverableAccountInfo {
    pub fn none() -> Self {
        Self {
            has_recoverable_account: false,
            user_type: None,
            business_name: None,
            deleted_at: None,
            days_remaining: 0,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.has_recoverable_account && self.days_remaining > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_days_is_not_recoverable() {
        let info = RecoverableAccountInfo {
            has_recoverable_account: true,
            user_type: Some(UserType::Business),
            business_name: Some("Acme Traders".into()),
            deleted_at: Some(Utc::now()),
            days_remaining: 0,
        };
        assert!(!info.is_recoverable());
    }

    #[test]
    fn open_window_is_recoverable() {
        let mut info = RecoverableAccountInfo::none();
        assert!(!info.is_recoverable());
        info.has_recoverable_account = true;
        info.days_remaining = 5;
        assert!(info.is_recoverable());
    }
}
