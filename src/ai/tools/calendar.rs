//! Runs a routed tool call against the calendar and turns the result
//! into text. Failures are reported in the text and never returned as
//! errors.
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;

use crate::ai::extract::LONG_DATETIME;
use crate::ai::state::{AvailabilityRequest, ToolInvocation};
use crate::calendar::{BusyInterval, CalendarBackend, EventRequest};

#[derive(Clone, Debug, PartialEq)]
pub struct ToolOutcome {
    pub text: String,
    pub success: bool,
}

impl ToolOutcome {
    fn ok(text: String) -> Self {
        Self {
            text,
            success: true,
        }
    }

    fn error(reason: &anyhow::Error) -> Self {
        Self {
            text: format!("Error: {}", reason),
            success: false,
        }
    }
}

fn in_zone(dt: &DateTime<FixedOffset>, timezone: &str, fmt: &str) -> String {
    match timezone.parse::<Tz>() {
        Ok(tz) => dt.with_timezone(&tz).format(fmt).to_string(),
        Err(_) => dt.format(fmt).to_string(),
    }
}

fn same_day(a: &DateTime<FixedOffset>, b: &DateTime<FixedOffset>, timezone: &str) -> bool {
    in_zone(a, timezone, "%F") == in_zone(b, timezone, "%F")
}

pub async fn book_meeting(
    calendar: &(dyn CalendarBackend + Send + Sync),
    req: &EventRequest,
) -> ToolOutcome {
    match calendar.create_event(req).await {
        Ok(event) => {
            tracing::info!("Booked {} as event {}", req.summary, event.id);
            let mut text = format!(
                "Booked: {} on {} ({}) for {} minutes (Event ID: {})",
                req.summary,
                in_zone(&req.start, &req.timezone, LONG_DATETIME),
                req.timezone,
                req.duration_minutes(),
                event.id
            );
            if let Some(link) = event.html_link {
                text.push_str(&format!("\n[View in Google Calendar]({})", link));
            }
            ToolOutcome::ok(text)
        }
        Err(e) => {
            tracing::warn!("Failed to book {}: {}", req.summary, e);
            ToolOutcome::error(&e)
        }
    }
}

fn describe_busy(req: &AvailabilityRequest, busy: &[BusyInterval]) -> String {
    let tz = &req.timezone;
    if busy.is_empty() {
        let end = if same_day(&req.start, &req.end, tz) {
            in_zone(&req.end, tz, "%-I:%M %p")
        } else {
            in_zone(&req.end, tz, LONG_DATETIME)
        };
        return format!(
            "Available: you're free from {} to {} ({})",
            in_zone(&req.start, tz, LONG_DATETIME),
            end,
            tz
        );
    }

    let lines: Vec<String> = busy
        .iter()
        .map(|interval| {
            let day = if same_day(&interval.start, &req.start, tz) {
                String::new()
            } else {
                in_zone(&interval.start, tz, "%a %b %-d ")
            };
            format!(
                "- {}{} to {}",
                day,
                in_zone(&interval.start, tz, "%-I:%M %p"),
                in_zone(&interval.end, tz, "%-I:%M %p")
            )
        })
        .collect();
    format!(
        "Busy during {} on {} ({}):\n{}",
        if busy.len() == 1 { "1 slot" } else { "these slots" },
        in_zone(&req.start, tz, "%A, %B %-d, %Y"),
        tz,
        lines.join("\n")
    )
}

pub async fn check_availability(
    calendar: &(dyn CalendarBackend + Send + Sync),
    req: &AvailabilityRequest,
) -> ToolOutcome {
    match calendar.query_busy(req.start, req.end).await {
        Ok(busy) => {
            tracing::debug!("Found {} busy intervals", busy.len());
            ToolOutcome::ok(describe_busy(req, &busy))
        }
        Err(e) => {
            tracing::warn!("Failed to check availability: {}", e);
            ToolOutcome::error(&e)
        }
    }
}

pub async fn execute(
    calendar: &(dyn CalendarBackend + Send + Sync),
    tool: &ToolInvocation,
) -> ToolOutcome {
    tracing::debug!("Calling tool {} with {}", tool.name(), tool.args());
    match tool {
        ToolInvocation::BookMeeting(req) => book_meeting(calendar, req).await,
        ToolInvocation::CheckAvailability(req) => check_availability(calendar, req).await,
    }
}

/// Lead-in shown before a tool's result in the final reply.
pub fn friendly_prefix(tool: &ToolInvocation) -> &'static str {
    match tool {
        ToolInvocation::BookMeeting(_) => "Here's what I did for you: ",
        ToolInvocation::CheckAvailability(_) => "Here's what I found: ",
    }
}
