use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use configs::BackendConfig;
use models::session::{Provider, Session};

use super::domain::{OAuthCallbackParams, SignUpInput};
use super::errors::SessionError;
use super::provider::IdentityProvider;

/// Identity provider adapter for the hosted backend's auth endpoint.
pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct TokenEnvelope {
    access_token: String,
    refresh_token: String,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: WireUser,
}

#[derive(Deserialize)]
struct WireUser {
    id: Uuid,
    email: Option<String>,
    app_metadata: Option<AppMetadata>,
}

#[derive(Deserialize)]
struct AppMetadata {
    provider: Option<String>,
}

#[derive(Deserialize, Default)]
struct ErrorEnvelope {
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
}

impl ErrorEnvelope {
    fn message(&self) -> String {
        self.error_description
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| "unknown provider error".into())
    }
}

impl HttpIdentityProvider {
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

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn token_request(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, SessionError> {
        let response = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if status.is_success() {
            let envelope: TokenEnvelope = response
                .json()
                .await
                .map_err(|e| SessionError::Provider(format!("malformed token envelope: {e}")))?;
            session_from_envelope(envelope)
        } else {
            Err(map_auth_failure(status, read_error(response).await))
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, SessionError> {
        self.token_request("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn sign_up_with_password(&self, input: &SignUpInput) -> Result<Session, SessionError> {
        let body = json!({
            "email": input.email,
            "password": input.password,
            "data": {
                "user_type": input.user_type,
                "business_name": input.business_name,
            },
        });
        let response = self
            .client
            .post(self.auth_url("signup"))
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if status.is_success() {
            let envelope: TokenEnvelope = response
                .json()
                .await
                .map_err(|e| SessionError::Provider(format!("malformed signup envelope: {e}")))?;
            session_from_envelope(envelope)
        } else {
            let detail = read_error(response).await;
            if detail.to_lowercase().contains("already registered") {
                return Err(SessionError::EmailExists);
            }
            Err(map_auth_failure(status, detail))
        }
    }

    fn authorize_url(
        &self,
        provider: Provider,
        redirect_to: &str,
    ) -> Result<String, SessionError> {
        let mut url = Url::parse(&self.auth_url("authorize"))
            .map_err(|e| SessionError::Provider(format!("bad base url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to);
        Ok(url.into())
    }

    async fn exchange_callback(
        &self,
        params: &OAuthCallbackParams,
    ) -> Result<Session, SessionError> {
        if let (Some(access_token), Some(refresh_token)) =
            (&params.access_token, &params.refresh_token)
        {
            // Implicit flow: tokens arrive in the URL fragment; the user
            // record still has to be fetched to learn who signed in.
            let user = self
                .fetch_user(access_token)
                .await?
                .ok_or_else(|| SessionError::Provider("callback token rejected".into()))?;
            let expires_at = params
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs))
                .unwrap_or_else(|| Utc::now() + chrono::Duration::hours(1));
            return wire_session(user, access_token.clone(), refresh_token.clone(), expires_at);
        }
        if let Some(code) = &params.code {
            return self.token_request("pkce", json!({ "auth_code": code })).await;
        }
        Err(SessionError::Provider("callback carried no tokens".into()))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, SessionError> {
        self.token_request("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn current_session(
        &self,
        session: &Session,
    ) -> Result<Option<Session>, SessionError> {
        match self.fetch_user(&session.access_token).await? {
            Some(user) => {
                debug!(subject_id = %user.id, "persisted session confirmed");
                wire_session(
                    user,
                    session.access_token.clone(),
                    session.refresh_token.clone(),
                    session.expires_at,
                )
                .map(Some)
            }
            None => Ok(None),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), SessionError> {
        let response = self
            .client
            .post(self.auth_url("logout"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(map_transport)?;
        // An already-invalid token is as signed out as it gets.
        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(SessionError::Provider(format!(
                "logout returned {}",
                response.status()
            )))
        }
    }
}

impl HttpIdentityProvider {
    async fn fetch_user(&self, access_token: &str) -> Result<Option<WireUser>, SessionError> {
        let response = self
            .client
            .get(self.auth_url("user"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(map_transport)?;

        match response.status() {
            status if status.is_success() => {
                let user: WireUser = response
                    .json()
                    .await
                    .map_err(|e| SessionError::Provider(format!("malformed user payload: {e}")))?;
                Ok(Some(user))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status => Err(SessionError::Provider(format!("user lookup returned {status}"))),
        }
    }
}

fn session_from_envelope(envelope: TokenEnvelope) -> Result<Session, SessionError> {
    let expires_at = match (envelope.expires_at, envelope.expires_in) {
        (Some(unix), _) => Utc
            .timestamp_opt(unix, 0)
            .single()
            .ok_or_else(|| SessionError::Provider("bad expires_at".into()))?,
        (None, Some(secs)) => Utc::now() + chrono::Duration::seconds(secs),
        (None, None) => return Err(SessionError::Provider("envelope carried no expiry".into())),
    };
    wire_session(
        envelope.user,
        envelope.access_token,
        envelope.refresh_token,
        expires_at,
    )
}

fn wire_session(
    user: WireUser,
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
) -> Result<Session, SessionError> {
    let email = user
        .email
        .ok_or_else(|| SessionError::Provider("user record carried no email".into()))?;
    Ok(Session {
        subject_id: user.id,
        email,
        access_token,
        refresh_token,
        expires_at,
        provider: provider_tag(user.app_metadata.as_ref()),
    })
}

fn provider_tag(metadata: Option<&AppMetadata>) -> Provider {
    match metadata.and_then(|m| m.provider.as_deref()) {
        Some("google") => Provider::Google,
        _ => Provider::Password,
    }
}

fn map_transport(err: reqwest::Error) -> SessionError {
    if err.is_timeout() {
        SessionError::Timeout
    } else {
        SessionError::Network(err.to_string())
    }
}

fn map_auth_failure(status: StatusCode, detail: String) -> SessionError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => SessionError::InvalidCredentials,
        StatusCode::UNPROCESSABLE_ENTITY => SessionError::Validation(detail),
        _ => SessionError::Provider(format!("{status}: {detail}")),
    }
}

async fn read_error(response: reqwest::Response) -> String {
    response
        .json::<ErrorEnvelope>()
        .await
        .unwrap_or_default()
        .message()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_tag_parses_known_providers() {
        let google = AppMetadata {
            provider: Some("google".into()),
        };
        let email = AppMetadata {
            provider: Some("email".into()),
        };
        assert_eq!(provider_tag(Some(&google)), Provider::Google);
        assert_eq!(provider_tag(Some(&email)), Provider::Password);
        assert_eq!(provider_tag(None), Provider::Password);
    }

    #[test]
    fn envelope_without_expiry_is_rejected() {
        let envelope = TokenEnvelope {
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_at: None,
            expires_in: None,
            user: WireUser {
                id: Uuid::new_v4(),
                email: Some("a@b.test".into()),
                app_metadata: None,
            },
        };
        assert!(matches!(
            session_from_envelope(envelope),
            Err(SessionError::Provider(_))
        ));
    }

    #[test]
    fn envelope_with_unix_expiry_parses() {
        let envelope = TokenEnvelope {
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_at: Some(1_767_225_600),
            expires_in: None,
            user: WireUser {
                id: Uuid::new_v4(),
                email: Some("a@b.test".into()),
                app_metadata: Some(AppMetadata {
                    provider: Some("google".into()),
                }),
            },
        };
        let session = session_from_envelope(envelope).unwrap();
        assert_eq!(session.provider, Provider::Google);
        assert_eq!(session.expires_at.timestamp(), 1_767_225_600);
    }
}
