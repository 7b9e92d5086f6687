use anyhow::{Result, anyhow};
use std::env;
use std::io::{self, Write};

use crate::core::ConfigError;
use crate::google::oauth::{consent_url, exchange_code_for_token};

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost";

const DEFAULT_OAUTH_URL: &str = "https://oauth2.googleapis.com";

/// Accept either the bare authorization code or the whole URL the
/// browser was redirected to.
fn code_from_input(input: &str) -> String {
    let input = input.trim();
    let Some((_, query)) = input.split_once('?') else {
        return input.to_string();
    };
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("code="))
        .and_then(|code| urlencoding::decode(code).ok())
        .map(|code| code.into_owned())
        .unwrap_or_else(|| input.to_string())
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingVar(var))
}

pub async fn run(redirect_uri: &str) -> Result<()> {
    let client_id = required("GOOGLE_CLIENT_ID")?;
    let client_secret = required("GOOGLE_CLIENT_SECRET")?;
    let oauth_url =
        env::var("CALAGENT_GOOGLE_OAUTH_URL").unwrap_or_else(|_| DEFAULT_OAUTH_URL.to_string());

    println!(
        "\nPlease open the following URL in your browser and authorize access:\n\n{}\n",
        consent_url(&client_id, redirect_uri)
    );
    print!("Paste the authorization code (or the URL you were redirected to) here: ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let code = code_from_input(&input);

    let token =
        exchange_code_for_token(&oauth_url, &client_id, &client_secret, &code, redirect_uri)
            .await?;
    let refresh_token = token
        .refresh_token
        .ok_or(anyhow!("No refresh token in response"))?;

    println!("\nAdd this to your environment:\n\nGOOGLE_REFRESH_TOKEN={}", refresh_token);
    Ok(())
}
