//! Google sign-in via the authorization-code flow with PKCE.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Context;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, PkceCodeVerifier,
    RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::GoogleConfig;
use crate::error::AppError;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const PENDING_TTL: Duration = Duration::from_secs(10 * 60);

/// Profile returned by Google's userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub name: Option<String>,
}

pub struct GoogleOAuth {
    client: BasicClient,
    http: reqwest::Client,
    // csrf state -> (pkce verifier, issued at)
    pending: RwLock<HashMap<String, (PkceCodeVerifier, Instant)>>,
}

impl GoogleOAuth {
    pub fn new(config: &GoogleConfig) -> anyhow::Result<Self> {
        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(AUTH_URL.to_string()).context("invalid Google auth url")?,
            Some(TokenUrl::new(TOKEN_URL.to_string()).context("invalid Google token url")?),
        )
        .set_redirect_uri(RedirectUrl::new(config.redirect_uri.clone()).context("invalid GOOGLE_REDIRECT_URI")?);

        Ok(Self {
            client,
            http: reqwest::Client::new(),
            pending: RwLock::new(HashMap::new()),
        })
    }

    /// Builds the consent URL and remembers the PKCE verifier for its state.
    pub async fn start(&self) -> String {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let (url, csrf) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".into()))
            .add_scope(Scope::new("email".into()))
            .add_scope(Scope::new("profile".into()))
            .set_pkce_challenge(challenge)
            .url();

        let mut pending = self.pending.write().await;
        pending.retain(|_, (_, at)| at.elapsed() < PENDING_TTL);
        pending.insert(csrf.secret().clone(), (verifier, Instant::now()));
        url.to_string()
    }

    /// Exchanges the code and fetches the signed-in profile.
    pub async fn callback(&self, code: String, state: String) -> Result<GoogleProfile, AppError> {
        let (verifier, issued) = self
            .pending
            .write()
            .await
            .remove(&state)
            .ok_or_else(|| AppError::BadRequest("Invalid or expired OAuth state".into()))?;
        if issued.elapsed() >= PENDING_TTL {
            return Err(AppError::BadRequest("Invalid or expired OAuth state".into()));
        }

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(verifier)
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "google token exchange failed");
                AppError::Unauthorized("Google sign-in failed".into())
            })?;

        let profile: GoogleProfile = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .context("google userinfo request failed")?
            .json()
            .await
            .context("google userinfo decode failed")?;

        if !profile.email_verified {
            return Err(AppError::Unauthorized("Google account email is not verified".into()));
        }
        Ok(profile)
    }
}
