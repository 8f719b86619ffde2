use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use configs::BackendConfig;
use models::profile::UserType;
use models::recovery::RecoverableAccountInfo;

use super::endpoint::RecoveryEndpoint;
use super::errors::RecoveryError;

/// Recovery check against the hosted backend's edge function.
pub struct HttpRecoveryEndpoint {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct WireRecovery {
    has_recoverable_account: bool,
    #[serde(default)]
    user_type: Option<UserType>,
    #[serde(default)]
    business_name: Option<String>,
    #[serde(default)]
    deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    days_remaining: Option<u32>,
    #[serde(default)]
    recently_restored: Option<bool>,
}

impl HttpRecoveryEndpoint {
    pub fn new(cfg: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            api_key: cfg.api_key.clone(),
        })
    }
}

#[async_trait]
impl RecoveryEndpoint for HttpRecoveryEndpoint {
    async fn check_by_email(
        &self,
        email: &str,
    ) -> Result<RecoverableAccountInfo, RecoveryError> {
        let url = format!("{}/functions/v1/check-deleted-account", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&json!({ "email": email }))
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecoveryError::Check(format!("check returned {status}")));
        }
        let wire: WireRecovery = response
            .json()
            .await
            .map_err(|e| RecoveryError::Check(format!("malformed check payload: {e}")))?;

        if wire.recently_restored.unwrap_or(false) {
            return Err(RecoveryError::RecentlyRestored);
        }
        Ok(RecoverableAccountInfo {
            has_recoverable_account: wire.has_recoverable_account,
            user_type: wire.user_type,
            business_name: wire.business_name,
            deleted_at: wire.deleted_at,
            days_remaining: wire.days_remaining.unwrap_or(0),
        })
    }
}

fn map_transport(err: reqwest::Error) -> RecoveryError {
    if err.is_timeout() {
        RecoveryError::Timeout
    } else {
        RecoveryError::Check(err.to_string())
    }
}
