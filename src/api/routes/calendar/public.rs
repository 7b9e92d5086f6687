//! Public types for the calendar API
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

pub use crate::calendar::BusyInterval;

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub summary: String,
    pub time_zone: Option<String>,
    pub location: Option<String>,
    pub conference: Option<bool>,
    pub reminder_minutes: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookResponse {
    pub event_id: String,
    pub html_link: Option<String>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub busy: Vec<BusyInterval>,
}
