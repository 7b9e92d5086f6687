//! Google OAuth 2.0 token exchange for installed apps.
use anyhow::{Result, bail};
use reqwest::Client;
use serde::Deserialize;

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

#[derive(Debug, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

async fn token_request(oauth_url: &str, params: &[(&str, &str)]) -> Result<OAuthToken> {
    let url = format!("{}/token", oauth_url.trim_end_matches('/'));
    let res = Client::new().post(&url).form(params).send().await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        bail!("Token request failed: {} ({})", status, text);
    }
    Ok(serde_json::from_str(&text)?)
}

/// Swap a long lived refresh token for a short lived access token.
pub async fn refresh_access_token(
    oauth_url: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<OAuthToken> {
    token_request(
        oauth_url,
        &[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ],
    )
    .await
}

/// Exchange the authorization code from the consent screen for tokens.
pub async fn exchange_code_for_token(
    oauth_url: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<OAuthToken> {
    token_request(
        oauth_url,
        &[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ],
    )
    .await
}

pub fn consent_url(client_id: &str, redirect_uri: &str) -> String {
    format!(
        "https://accounts.google.com/o/oauth2/v2/auth?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(CALENDAR_SCOPE)
    )
}
