//! Google Calendar v3 client for inserting events and querying
//! free/busy.
use anyhow::{Error, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use super::oauth::refresh_access_token;
use crate::calendar::{BusyInterval, CalendarBackend, CreatedEvent, EventRequest};
use crate::core::AppConfig;

#[derive(Debug, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "htmlLink")]
    pub html_link: Option<String>,
    pub status: Option<String>,
}

impl Event {
    fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<BusyInterval>,
    #[serde(default)]
    errors: Vec<FreeBusyError>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyError {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    calendars: std::collections::HashMap<String, FreeBusyCalendar>,
}

/// Pull the human readable reason out of a Google API error body,
/// falling back to the raw text.
fn error_reason(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| text.to_string())
}

fn calendar_url(api_url: &str, calendar_id: &str) -> String {
    format!(
        "{}/calendar/v3/calendars/{}",
        api_url.trim_end_matches('/'),
        urlencoding::encode(calendar_id)
    )
}

pub fn event_body(req: &EventRequest) -> Value {
    let mut body = json!({
        "id": req.idempotency_key(),
        "summary": req.summary,
        "start": {"dateTime": req.start.to_rfc3339(), "timeZone": req.timezone},
        "end": {"dateTime": req.end.to_rfc3339(), "timeZone": req.timezone},
    });
    if let Some(location) = &req.location {
        body["location"] = json!(location);
    }
    if req.conference {
        body["conferenceData"] = json!({
            "createRequest": {
                "requestId": format!("meet-{}", req.idempotency_key()),
                "conferenceSolutionKey": {"type": "hangoutsMeet"}
            }
        });
    }
    if let Some(minutes) = req.reminder_minutes {
        body["reminders"] = json!({
            "useDefault": false,
            "overrides": [{"method": "popup", "minutes": minutes}]
        });
    }
    body
}

pub async fn get_event(
    api_url: &str,
    access_token: &str,
    calendar_id: &str,
    event_id: &str,
) -> Result<Event> {
    let url = format!("{}/events/{}", calendar_url(api_url, calendar_id), event_id);
    let res = Client::new().get(&url).bearer_auth(access_token).send().await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        bail!("{}", error_reason(&text));
    }
    Ok(serde_json::from_str(&text)?)
}

/// Put a deleted event back on the calendar. Google keeps cancelled
/// events around and their IDs can't be reused, so this is the only way
/// to book the same event again.
pub async fn restore_event(
    api_url: &str,
    access_token: &str,
    calendar_id: &str,
    req: &EventRequest,
) -> Result<Event> {
    let url = format!(
        "{}/events/{}?conferenceDataVersion={}",
        calendar_url(api_url, calendar_id),
        req.idempotency_key(),
        if req.conference { 1 } else { 0 }
    );
    let mut body = event_body(req);
    body["status"] = json!("confirmed");
    let res = Client::new()
        .put(&url)
        .bearer_auth(access_token)
        .json(&body)
        .send()
        .await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        bail!("{}", error_reason(&text));
    }
    let event: Event = serde_json::from_str(&text)?;
    if event.is_cancelled() {
        bail!("Event {} is still cancelled after restoring it", event.id);
    }
    Ok(event)
}

/// Insert an event. The event ID is derived from the request so a
/// conflict means this exact event was already created. A live event
/// is returned as is and a cancelled one is restored.
pub async fn insert_event(
    api_url: &str,
    access_token: &str,
    calendar_id: &str,
    req: &EventRequest,
) -> Result<Event> {
    let url = format!(
        "{}/events?conferenceDataVersion={}",
        calendar_url(api_url, calendar_id),
        if req.conference { 1 } else { 0 }
    );
    let res = Client::new()
        .post(&url)
        .bearer_auth(access_token)
        .json(&event_body(req))
        .send()
        .await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();

    if status == StatusCode::CONFLICT {
        tracing::warn!(
            "Event {} already exists, returning the existing event",
            req.idempotency_key()
        );
        let existing =
            get_event(api_url, access_token, calendar_id, &req.idempotency_key()).await?;
        if existing.is_cancelled() {
            tracing::info!("Event {} was cancelled, restoring it", existing.id);
            return restore_event(api_url, access_token, calendar_id, req).await;
        }
        return Ok(existing);
    }
    if !status.is_success() {
        bail!("{}", error_reason(&text));
    }
    Ok(serde_json::from_str(&text)?)
}

pub async fn query_freebusy(
    api_url: &str,
    access_token: &str,
    calendar_id: &str,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> Result<Vec<BusyInterval>> {
    let url = format!("{}/calendar/v3/freeBusy", api_url.trim_end_matches('/'));
    let body = json!({
        "timeMin": start.to_rfc3339(),
        "timeMax": end.to_rfc3339(),
        "timeZone": "UTC",
        "items": [{"id": calendar_id}],
    });
    let res = Client::new()
        .post(&url)
        .bearer_auth(access_token)
        .json(&body)
        .send()
        .await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        bail!("{}", error_reason(&text));
    }

    let mut resp: FreeBusyResponse = serde_json::from_str(&text)?;
    let Some(calendar) = resp.calendars.remove(calendar_id) else {
        bail!("Calendar {} missing from free/busy response", calendar_id);
    };
    if let Some(err) = calendar.errors.first() {
        bail!("Free/busy lookup failed for {}: {}", calendar_id, err.reason);
    }

    let mut busy = calendar.busy;
    busy.sort_by_key(|b| b.start);
    Ok(busy)
}

/// Google Calendar backed implementation of `CalendarBackend`. A fresh
/// access token is fetched for every call using the stored refresh
/// token.
#[derive(Clone, Debug)]
pub struct GoogleCalendar {
    api_url: String,
    oauth_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    calendar_id: String,
}

impl GoogleCalendar {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api_url: config.google_api_url.clone(),
            oauth_url: config.google_oauth_url.clone(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            refresh_token: config.google_refresh_token.clone(),
            calendar_id: config.google_calendar_id.clone(),
        }
    }

    async fn access_token(&self) -> Result<String> {
        let token = refresh_access_token(
            &self.oauth_url,
            &self.client_id,
            &self.client_secret,
            &self.refresh_token,
        )
        .await?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl CalendarBackend for GoogleCalendar {
    async fn create_event(&self, req: &EventRequest) -> Result<CreatedEvent, Error> {
        let access_token = self.access_token().await?;
        tracing::debug!("Using calendar ID: {}", self.calendar_id);
        let event = insert_event(&self.api_url, &access_token, &self.calendar_id, req).await?;
        Ok(CreatedEvent {
            id: event.id,
            html_link: event.html_link,
        })
    }

    async fn query_busy(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<BusyInterval>, Error> {
        let access_token = self.access_token().await?;
        query_freebusy(&self.api_url, &access_token, &self.calendar_id, start, end).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn request(conference: bool) -> EventRequest {
        EventRequest {
            start: DateTime::parse_from_rfc3339("2025-07-14T11:30:00+05:30").unwrap(),
            end: DateTime::parse_from_rfc3339("2025-07-14T12:30:00+05:30").unwrap(),
            summary: "Direct API Test Event".to_string(),
            timezone: "Asia/Kolkata".to_string(),
            location: Some("Conference Room".to_string()),
            conference,
            reminder_minutes: Some(10),
        }
    }

    fn test_config(url: &str) -> AppConfig {
        let vars = [
            ("OPENROUTER_API_KEY", "key"),
            ("GOOGLE_CLIENT_ID", "cid"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
            ("GOOGLE_REFRESH_TOKEN", "rt"),
            ("GOOGLE_CALENDAR_ID", "primary"),
            ("CALAGENT_GOOGLE_API_URL", url),
            ("CALAGENT_GOOGLE_OAUTH_URL", url),
        ];
        AppConfig::from_lookup(|k| {
            vars.iter()
                .find(|(name, _)| *name == k)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    #[test]
    fn test_event_body() {
        let body = event_body(&request(false));
        assert_eq!(body["summary"], "Direct API Test Event");
        assert_eq!(body["start"]["dateTime"], "2025-07-14T11:30:00+05:30");
        assert_eq!(body["start"]["timeZone"], "Asia/Kolkata");
        assert_eq!(body["location"], "Conference Room");
        assert_eq!(body["reminders"]["overrides"][0]["minutes"], 10);
        assert!(body.get("conferenceData").is_none());
    }

    #[test]
    fn test_event_body_with_conference() {
        let body = event_body(&request(true));
        assert_eq!(
            body["conferenceData"]["createRequest"]["conferenceSolutionKey"]["type"],
            "hangoutsMeet"
        );
    }

    #[test]
    fn test_error_reason() {
        assert_eq!(
            error_reason(r#"{"error": {"code": 403, "message": "Rate Limit Exceeded"}}"#),
            "Rate Limit Exceeded"
        );
        assert_eq!(error_reason("Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn test_insert_event() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/calendar/v3/calendars/primary/events")
            .match_query(Matcher::UrlEncoded(
                "conferenceDataVersion".into(),
                "1".into(),
            ))
            .match_header("authorization", "Bearer at")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "evt_1", "htmlLink": "https://calendar.google.com/event?eid=1"}"#)
            .create();

        let event = insert_event(&server.url(), "at", "primary", &request(true))
            .await
            .unwrap();

        mock.assert();
        assert_eq!(event.id, "evt_1");
        assert_eq!(
            event.html_link.as_deref(),
            Some("https://calendar.google.com/event?eid=1")
        );
    }

    #[tokio::test]
    async fn test_insert_event_conflict_returns_existing() {
        let mut server = mockito::Server::new_async().await;
        let req = request(false);
        let _insert = server
            .mock("POST", "/calendar/v3/calendars/primary/events")
            .match_query(Matcher::Any)
            .with_status(409)
            .with_body(r#"{"error": {"code": 409, "message": "The requested identifier already exists."}}"#)
            .create();
        let get = server
            .mock(
                "GET",
                format!("/calendar/v3/calendars/primary/events/{}", req.idempotency_key()).as_str(),
            )
            .with_status(200)
            .with_body(format!(r#"{{"id": "{}"}}"#, req.idempotency_key()))
            .create();

        let event = insert_event(&server.url(), "at", "primary", &req)
            .await
            .unwrap();

        get.assert();
        assert_eq!(event.id, req.idempotency_key());
    }

    #[tokio::test]
    async fn test_insert_event_conflict_restores_cancelled() {
        let mut server = mockito::Server::new_async().await;
        let req = request(false);
        let path = format!("/calendar/v3/calendars/primary/events/{}", req.idempotency_key());
        let _insert = server
            .mock("POST", "/calendar/v3/calendars/primary/events")
            .match_query(Matcher::Any)
            .with_status(409)
            .with_body(r#"{"error": {"code": 409, "message": "The requested identifier already exists."}}"#)
            .create();
        let _get = server
            .mock("GET", path.as_str())
            .with_status(200)
            .with_body(format!(
                r#"{{"id": "{}", "status": "cancelled"}}"#,
                req.idempotency_key()
            ))
            .create();
        let restore = server
            .mock("PUT", path.as_str())
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "status": "confirmed",
                "summary": "Direct API Test Event",
            })))
            .with_status(200)
            .with_body(format!(
                r#"{{"id": "{}", "status": "confirmed", "htmlLink": "https://calendar.google.com/event?eid=2"}}"#,
                req.idempotency_key()
            ))
            .create();

        let event = insert_event(&server.url(), "at", "primary", &req)
            .await
            .unwrap();

        restore.assert();
        assert_eq!(event.status.as_deref(), Some("confirmed"));
        assert!(event.html_link.is_some());
    }

    #[tokio::test]
    async fn test_restore_event_still_cancelled_fails() {
        let mut server = mockito::Server::new_async().await;
        let req = request(false);
        let _restore = server
            .mock(
                "PUT",
                format!("/calendar/v3/calendars/primary/events/{}", req.idempotency_key()).as_str(),
            )
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(format!(
                r#"{{"id": "{}", "status": "cancelled"}}"#,
                req.idempotency_key()
            ))
            .create();

        let err = restore_event(&server.url(), "at", "primary", &req)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("still cancelled"));
    }

    #[tokio::test]
    async fn test_insert_event_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/calendar/v3/calendars/primary/events")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error": {"code": 403, "message": "quota exceeded"}}"#)
            .create();

        let err = insert_event(&server.url(), "at", "primary", &request(false))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[tokio::test]
    async fn test_query_freebusy() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/calendar/v3/freeBusy")
            .match_body(Matcher::PartialJson(
                json!({"items": [{"id": "primary"}]}),
            ))
            .with_status(200)
            .with_body(
                r#"{
                    "kind": "calendar#freeBusy",
                    "calendars": {
                        "primary": {
                            "busy": [
                                {"start": "2025-01-02T10:00:00Z", "end": "2025-01-02T10:30:00Z"},
                                {"start": "2025-01-02T09:00:00Z", "end": "2025-01-02T09:30:00Z"}
                            ]
                        }
                    }
                }"#,
            )
            .create();

        let busy = query_freebusy(
            &server.url(),
            "at",
            "primary",
            DateTime::parse_from_rfc3339("2025-01-02T08:00:00Z").unwrap(),
            DateTime::parse_from_rfc3339("2025-01-02T12:00:00Z").unwrap(),
        )
        .await
        .unwrap();

        mock.assert();
        assert_eq!(busy.len(), 2);
        assert_eq!(busy[0].start.to_rfc3339(), "2025-01-02T09:00:00+00:00");
    }

    #[tokio::test]
    async fn test_query_freebusy_calendar_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/calendar/v3/freeBusy")
            .with_status(200)
            .with_body(r#"{"calendars": {"primary": {"errors": [{"domain": "global", "reason": "notFound"}]}}}"#)
            .create();

        let err = query_freebusy(
            &server.url(),
            "at",
            "primary",
            DateTime::parse_from_rfc3339("2025-01-02T08:00:00Z").unwrap(),
            DateTime::parse_from_rfc3339("2025-01-02T12:00:00Z").unwrap(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("notFound"));
    }

    #[tokio::test]
    async fn test_google_calendar_create_event_refreshes_token() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token": "fresh_token", "expires_in": 3599}"#)
            .create();
        let insert = server
            .mock("POST", "/calendar/v3/calendars/primary/events")
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer fresh_token")
            .with_status(200)
            .with_body(r#"{"id": "evt_2"}"#)
            .create();

        let calendar = GoogleCalendar::new(&test_config(&server.url()));
        let created = calendar.create_event(&request(false)).await.unwrap();

        token.assert();
        insert.assert();
        assert_eq!(created.id, "evt_2");
        assert!(created.html_link.is_none());
    }
}
