/**
 * Authentication Client
 *
 * HTTP client for the auth provider's GoTrue endpoints: sign-up, password
 * sign-in, sign-out, password reset, token refresh and token validation.
 * Provider error messages are passed through verbatim so they can be shown
 * to the user as-is.
 */

use async_trait::async_trait;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::error::ClientError;
use crate::client::rest::BackendClient;
use crate::client::store::AuthProvider;
use crate::shared::{AuthUser, Session, SignUpRequest};

/// GoTrue client sharing the backend's HTTP client and configuration
#[derive(Debug, Clone)]
pub struct AuthClient {
    backend: BackendClient,
}

impl AuthClient {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    fn url(&self, path: &str) -> String {
        self.backend.config().auth_url(path)
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.backend
            .http()
            .post(url)
            .header("apikey", self.backend.config().anon_key())
    }
}

async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_else(|_| status.to_string());
    let err = ClientError::from_auth_response(status, &body);
    warn!(%status, error = %err, "auth request failed");
    Err(err)
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl AuthProvider for AuthClient {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<Option<Session>, ClientError> {
        let body = json!({
            "email": request.email,
            "password": request.password,
            "data": {
                "username": request.username,
                "full_name": request.full_name,
            },
        });

        let response = self.post(&self.url("signup")).json(&body).send().await?;
        let value: Value = parse(check(response).await?).await?;

        // With email confirmation enabled the provider returns the bare user
        if value.get("access_token").is_some() {
            let session: Session = serde_json::from_value(value)?;
            info!(user_id = %session.user.id, "signed up and signed in");
            Ok(Some(session.stamped(chrono::Utc::now())))
        } else {
            info!(email = %request.email, "signed up, confirmation pending");
            Ok(None)
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let response = self
            .post(&self.url("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let session: Session = parse(check(response).await?).await?;
        info!(user_id = %session.user.id, "signed in");
        Ok(session.stamped(chrono::Utc::now()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), ClientError> {
        let response = self
            .post(&self.url("logout"))
            .bearer_auth(access_token)
            .send()
            .await?;
        check(response).await?;
        info!("signed out");
        Ok(())
    }

    async fn reset_password(&self, email: &str) -> Result<(), ClientError> {
        let mut request = self.post(&self.url("recover"));
        if let Some(redirect) = self.backend.config().password_reset_redirect() {
            request = request.query(&[("redirect_to", redirect)]);
        }
        let response = request.json(&json!({ "email": email })).send().await?;
        check(response).await?;
        info!(email, "password reset email requested");
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, ClientError> {
        let response = self
            .backend
            .http()
            .get(self.url("user"))
            .header("apikey", self.backend.config().anon_key())
            .bearer_auth(access_token)
            .send()
            .await?;
        parse(check(response).await?).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ClientError> {
        debug!("refreshing session");
        let response = self
            .post(&self.url("token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let session: Session = parse(check(response).await?).await?;
        Ok(session.stamped(chrono::Utc::now()))
    }
}
