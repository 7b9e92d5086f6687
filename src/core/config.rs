use std::env;

use chrono_tz::Tz;
use thiserror::Error;

const DEFAULT_SYSTEM_MESSAGE: &str = "You are a helpful, friendly AI assistant that helps users book and manage appointments on their Google Calendar. Always reply in a conversational, natural way, confirming actions and asking for clarification if needed. When the user wants to book a meeting, restate the request including the word \"book\", who it is with and the date, time and timezone. When the user wants to know if they are free, restate the request including the word \"check\" and the date and time. Only use the word \"confirm\" when the user has just confirmed a proposed booking, and never ask the user to confirm yourself. If a booking or availability result is present, summarize it in a friendly way before showing the details.";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing env var {0}")]
    MissingVar(&'static str),

    #[error("Invalid timezone in {var}: {value}")]
    InvalidTimezone { var: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub openai_api_hostname: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub app_url: String,
    pub app_title: String,
    pub system_message: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_refresh_token: String,
    pub google_calendar_id: String,
    pub google_api_url: String,
    pub google_oauth_url: String,
    pub default_timezone: Tz,
}

impl AppConfig {
    /// Load the config from the process environment. Any missing
    /// credential is fatal and should stop the process from starting.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingVar(key))
        };
        let optional =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let openai_api_key = required("OPENROUTER_API_KEY")?;
        let google_client_id = required("GOOGLE_CLIENT_ID")?;
        let google_client_secret = required("GOOGLE_CLIENT_SECRET")?;
        let google_refresh_token = required("GOOGLE_REFRESH_TOKEN")?;
        let google_calendar_id = required("GOOGLE_CALENDAR_ID")?;

        let tz_name = optional("CALAGENT_DEFAULT_TIMEZONE", "UTC");
        let default_timezone =
            tz_name
                .trim()
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidTimezone {
                    var: "CALAGENT_DEFAULT_TIMEZONE",
                    value: tz_name.clone(),
                })?;

        Ok(Self {
            openai_api_hostname: optional("CALAGENT_LLM_HOST", "https://openrouter.ai/api"),
            openai_api_key,
            openai_model: optional("CALAGENT_LLM_MODEL", "qwen/qwen3-32b"),
            app_url: optional("CALAGENT_APP_URL", "http://localhost:2222"),
            app_title: optional("CALAGENT_APP_TITLE", "Calendar Agent"),
            system_message: optional("CALAGENT_SYSTEM_MESSAGE", DEFAULT_SYSTEM_MESSAGE),
            google_client_id,
            google_client_secret,
            google_refresh_token,
            google_calendar_id,
            google_api_url: optional("CALAGENT_GOOGLE_API_URL", "https://www.googleapis.com"),
            google_oauth_url: optional(
                "CALAGENT_GOOGLE_OAUTH_URL",
                "https://oauth2.googleapis.com",
            ),
            default_timezone,
        })
    }
}
