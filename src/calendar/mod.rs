//! Contract for the calendar backend the agent books into and reads
//! free/busy information from.
use anyhow::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRequest {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub summary: String,
    pub timezone: String,
    pub location: Option<String>,
    pub conference: bool,
    pub reminder_minutes: Option<u32>,
}

impl EventRequest {
    /// Stable identifier for this exact event so that a retried insert
    /// lands on the same event instead of creating a second one.
    ///
    /// Google only accepts base32hex characters (0-9, a-v) for client
    /// supplied event IDs which the simple hex form of a UUID satisfies.
    pub fn idempotency_key(&self) -> String {
        let name = format!(
            "{}|{}|{}|{}",
            self.summary,
            self.start.to_rfc3339(),
            self.end.to_rfc3339(),
            self.timezone
        );
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
            .simple()
            .to_string()
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub id: String,
    pub html_link: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

#[async_trait]
pub trait CalendarBackend {
    /// Not idempotent on its own. Implementations should use
    /// `EventRequest::idempotency_key` if the backend supports it.
    async fn create_event(&self, req: &EventRequest) -> Result<CreatedEvent, Error>;

    /// Busy intervals on the target calendar between `start` and
    /// `end`, ordered by start time.
    async fn query_busy(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<BusyInterval>, Error>;
}

pub type BoxedCalendar = Box<dyn CalendarBackend + Send + Sync + 'static>;
