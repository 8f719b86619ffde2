use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use uuid::Uuid;

use configs::BackendConfig;
use models::profile::Profile;

use super::errors::ProfileError;
use super::store::ProfileStore;

/// Profile row reads against the hosted backend's REST surface. Rows come
/// back as a 0- or 1-element JSON array filtered by subject id.
pub struct HttpProfileStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpProfileStore {
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
impl ProfileStore for HttpProfileStore {
    async fn fetch_by_subject(&self, subject_id: Uuid) -> Result<Option<Profile>, ProfileError> {
        let url = format!("{}/rest/v1/profiles", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("id", format!("eq.{subject_id}")),
                ("select", "*".to_string()),
            ])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProfileError::Fetch(format!("profiles read returned {status}")));
        }
        let mut rows: Vec<Profile> = response
            .json()
            .await
            .map_err(|e| ProfileError::Fetch(format!("malformed profile row: {e}")))?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }
}

fn map_transport(err: reqwest::Error) -> ProfileError {
    if err.is_timeout() {
        ProfileError::Timeout
    } else {
        ProfileError::Fetch(err.to_string())
    }
}
