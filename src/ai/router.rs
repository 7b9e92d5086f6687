//! Decide what a drafted reply means for the calendar.
//!
//! `route` is a pure transition function: the draft text and the
//! pending booking go in, the next step and the updated pending
//! booking come out. Nothing here talks to the language model or the
//! calendar, so every transition can be tested directly.
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::json;

use super::extract::{
    Platform, Resolution, ResolvedTime, Slots, format_datetime, is_confirmation, resolve_datetime,
};
use super::prompt::{Prompt, render};
use super::state::{AvailabilityRequest, PendingEvent, ToolInvocation};

pub const NOTHING_PENDING: &str = "There's nothing waiting for confirmation right now. Tell me who the meeting is with and when, and I'll set it up.";

const INVALID_PENDING: &str = "Tell me who the meeting is with and when, and I'll propose it again.";

#[derive(Clone, Debug)]
pub struct RouterContext {
    pub now: DateTime<Utc>,
    pub default_timezone: Tz,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Route {
    /// No calendar action; the draft is the reply.
    Idle,
    /// Something is missing or wrong; ask the user.
    Clarify(String),
    /// A booking was proposed and needs an explicit confirmation.
    ConfirmPending(String),
    Execute(ToolInvocation),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub route: Route,
    pub pending: Option<PendingEvent>,
}

enum Intent {
    Confirm,
    Book,
    Check,
    None,
}

fn intent(draft: &str) -> Intent {
    let text = draft.to_lowercase();
    if is_confirmation(&text) {
        Intent::Confirm
    } else if text.contains("book") {
        Intent::Book
    } else if text.contains("check") || text.contains("available") || text.contains("availability")
    {
        Intent::Check
    } else {
        Intent::None
    }
}

fn render_or(prompt: Prompt, data: serde_json::Value, fallback: &str) -> String {
    render(prompt, &data).unwrap_or_else(|e| {
        tracing::error!("Failed to render {} prompt: {}", prompt, e);
        fallback.to_string()
    })
}

fn clarify_time(action: &str, resolution: Resolution, tz: Tz) -> String {
    match resolution {
        Resolution::InPast(at) => render_or(
            Prompt::PastTime,
            json!({"when": format_datetime(&at), "timezone": tz.name()}),
            "That time has already passed. Please give a date and time in the future.",
        ),
        _ => render_or(
            Prompt::ClarifyTime,
            json!({"action": action, "timezone": tz.name()}),
            "Please give a date and time, for example \"tomorrow at 3pm\".",
        ),
    }
}

fn next_midnight(at: &DateTime<Tz>) -> DateTime<Tz> {
    let next_day = at.date_naive() + Duration::days(1);
    at.timezone()
        .from_local_datetime(&next_day.and_time(NaiveTime::MIN))
        .earliest()
        .unwrap_or(*at + Duration::days(1))
}

fn propose_booking(slots: &Slots, at: DateTime<Tz>) -> (PendingEvent, String) {
    let end = at + Duration::minutes(i64::from(slots.duration_minutes));
    let location = slots
        .platform
        .filter(|p| *p != Platform::GoogleMeet)
        .map(|p| p.name().to_string());
    let pending = PendingEvent {
        start: at.fixed_offset(),
        end: end.fixed_offset(),
        summary: slots.summary.clone(),
        timezone: slots.timezone.name().to_string(),
        location,
        conference: slots.platform == Some(Platform::GoogleMeet),
        reminder_minutes: slots.reminder_minutes,
    };
    let when = format_datetime(&at);
    let message = render_or(
        Prompt::ConfirmBooking,
        json!({
            "summary": pending.summary,
            "when": when,
            "timezone": pending.timezone,
            "duration": slots.duration_minutes,
            "location": pending.location,
            "conference": pending.conference,
            "reminder": pending.reminder_minutes,
        }),
        &format!(
            "I'm ready to book \"{}\" on {} ({}). Reply \"confirm\" to book it.",
            pending.summary, when, pending.timezone
        ),
    );
    (pending, message)
}

fn availability_window(slots: &Slots, resolved: ResolvedTime) -> AvailabilityRequest {
    let start = resolved.at;
    let end = if resolved.has_time || slots.duration_given {
        start + Duration::minutes(i64::from(slots.duration_minutes))
    } else {
        next_midnight(&start)
    };
    AvailabilityRequest {
        start: start.fixed_offset(),
        end: end.fixed_offset(),
        timezone: slots.timezone.name().to_string(),
    }
}

/// Work out the next step for a drafted reply.
///
/// A confirmation books the pending event as-is. The pending event is
/// handed back unchanged so that it is only dropped once the booking
/// has actually succeeded.
pub fn route(draft: &str, pending: Option<&PendingEvent>, ctx: &RouterContext) -> Transition {
    let keep = |route: Route| Transition {
        route,
        pending: pending.cloned(),
    };

    match intent(draft) {
        Intent::Confirm => match pending {
            Some(event) => match event.validate() {
                Ok(()) => {
                    tracing::debug!("Confirmed pending booking {}", event.summary);
                    keep(Route::Execute(ToolInvocation::BookMeeting(
                        event.to_event_request(),
                    )))
                }
                Err(reason) => {
                    tracing::warn!("Dropping invalid pending booking: {}", reason);
                    Transition {
                        route: Route::Clarify(format!(
                            "I can't book that because {}. {}",
                            reason, INVALID_PENDING
                        )),
                        pending: None,
                    }
                }
            },
            None => keep(Route::Clarify(NOTHING_PENDING.to_string())),
        },
        Intent::Book => {
            let slots = Slots::extract(draft, ctx.default_timezone);
            let resolution = resolve_datetime(draft, ctx.now, slots.timezone);
            match resolution {
                // A date on its own isn't enough to book
                Resolution::At(ResolvedTime { at, has_time: true }) => {
                    let (event, message) = propose_booking(&slots, at);
                    tracing::debug!("Proposed booking {:?}", event);
                    Transition {
                        route: Route::ConfirmPending(message),
                        pending: Some(event),
                    }
                }
                other => {
                    tracing::debug!("Booking time unusable: {:?}", other);
                    keep(Route::Clarify(clarify_time(
                        "book the meeting",
                        other,
                        slots.timezone,
                    )))
                }
            }
        }
        Intent::Check => {
            let slots = Slots::extract(draft, ctx.default_timezone);
            match resolve_datetime(draft, ctx.now, slots.timezone) {
                Resolution::At(resolved) => {
                    let window = availability_window(&slots, resolved);
                    tracing::debug!("Checking availability {:?}", window);
                    keep(Route::Execute(ToolInvocation::CheckAvailability(window)))
                }
                other => keep(Route::Clarify(clarify_time(
                    "check your availability",
                    other,
                    slots.timezone,
                ))),
            }
        }
        Intent::None => keep(Route::Idle),
    }
}
