//! Test utilities for integration tests
use std::sync::{Arc, Mutex};

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use axum::{Router, body::Body};
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;

use calagent::api::AppState;
use calagent::api::app;
use calagent::calendar::{BusyInterval, CalendarBackend, CreatedEvent, EventRequest};
use calagent::core::AppConfig;
use calagent::openai::{LanguageModel, Message, Role};

/// Language model that answers with the latest user message. The
/// router then acts on exactly what the test sent.
pub struct EchoModel;

#[async_trait]
impl LanguageModel for EchoModel {
    async fn complete(&self, messages: &[Message]) -> Result<String, Error> {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .ok_or(anyhow!("No user message"))
    }
}

/// In-memory calendar. Clones share the list of created events so a
/// test can inspect what the app booked.
#[derive(Clone, Default)]
pub struct FakeCalendar {
    pub busy: Vec<BusyInterval>,
    pub fail_with: Option<String>,
    pub created: Arc<Mutex<Vec<EventRequest>>>,
}

impl FakeCalendar {
    pub fn failing(reason: &str) -> Self {
        Self {
            fail_with: Some(reason.to_string()),
            ..Default::default()
        }
    }

    pub fn with_busy(busy: Vec<BusyInterval>) -> Self {
        Self {
            busy,
            ..Default::default()
        }
    }
}

#[async_trait]
impl CalendarBackend for FakeCalendar {
    async fn create_event(&self, req: &EventRequest) -> Result<CreatedEvent, Error> {
        if let Some(reason) = &self.fail_with {
            return Err(anyhow!(reason.clone()));
        }
        self.created.lock().unwrap().push(req.clone());
        Ok(CreatedEvent {
            id: req.idempotency_key(),
            html_link: Some(format!(
                "https://calendar.google.com/event?eid={}",
                req.idempotency_key()
            )),
        })
    }

    async fn query_busy(
        &self,
        _start: DateTime<FixedOffset>,
        _end: DateTime<FixedOffset>,
    ) -> Result<Vec<BusyInterval>, Error> {
        match &self.fail_with {
            Some(reason) => Err(anyhow!(reason.clone())),
            None => Ok(self.busy.clone()),
        }
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        openai_api_hostname: String::from("http://localhost:1"),
        openai_api_key: String::from("test-api-key"),
        openai_model: String::from("test-model"),
        app_url: String::from("http://localhost:2222"),
        app_title: String::from("Calendar Agent"),
        system_message: String::from("You are a helpful scheduling assistant."),
        google_client_id: String::from("test_client_id"),
        google_client_secret: String::from("test_client_secret"),
        google_refresh_token: String::from("test_refresh_token"),
        google_calendar_id: String::from("primary"),
        google_api_url: String::from("http://localhost:1"),
        google_oauth_url: String::from("http://localhost:1"),
        default_timezone: Tz::UTC,
    }
}

/// Creates a test application router backed by the given calendar.
pub fn test_app_with(calendar: FakeCalendar) -> Router {
    let app_state = AppState::new(test_config(), Box::new(EchoModel), Box::new(calendar));
    app(Arc::new(app_state))
}

pub fn test_app() -> Router {
    test_app_with(FakeCalendar::default())
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not utf8")
}
