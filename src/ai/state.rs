//! Per-turn records passed between the stages of a chat turn.
use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::calendar::EventRequest;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Agent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: &str) -> Self {
        Self {
            role: TurnRole::User,
            content: content.to_string(),
        }
    }

    pub fn agent(content: &str) -> Self {
        Self {
            role: TurnRole::Agent,
            content: content.to_string(),
        }
    }
}

/// A proposed booking waiting for the user to confirm it. The caller
/// holds on to this between turns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingEvent {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub summary: String,
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub conference: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_minutes: Option<u32>,
}

impl PendingEvent {
    /// Pending events come back from the caller, so they are checked
    /// again before anything is written to the calendar.
    pub fn validate(&self) -> Result<(), String> {
        if self.end <= self.start {
            return Err(format!(
                "the pending meeting \"{}\" ends before it starts",
                self.summary
            ));
        }
        if self.timezone.parse::<Tz>().is_err() {
            return Err(format!(
                "the pending meeting \"{}\" has an unknown timezone {}",
                self.summary, self.timezone
            ));
        }
        Ok(())
    }

    pub fn to_event_request(&self) -> EventRequest {
        EventRequest {
            start: self.start,
            end: self.end,
            summary: self.summary.clone(),
            timezone: self.timezone.clone(),
            location: self.location.clone(),
            conference: self.conference,
            reminder_minutes: self.reminder_minutes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub timezone: String,
}

/// A tool call the router decided on, with fully validated arguments.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolInvocation {
    BookMeeting(EventRequest),
    CheckAvailability(AvailabilityRequest),
}

impl ToolInvocation {
    pub fn name(&self) -> &'static str {
        match self {
            ToolInvocation::BookMeeting(_) => "book_meeting",
            ToolInvocation::CheckAvailability(_) => "check_availability",
        }
    }

    pub fn args(&self) -> Value {
        match self {
            ToolInvocation::BookMeeting(req) => json!({
                "start_time": req.start.to_rfc3339(),
                "end_time": req.end.to_rfc3339(),
                "summary": req.summary,
                "time_zone": req.timezone,
                "location": req.location,
                "conference": req.conference,
                "reminder_minutes": req.reminder_minutes,
            }),
            ToolInvocation::CheckAvailability(req) => json!({
                "start_time": req.start.to_rfc3339(),
                "end_time": req.end.to_rfc3339(),
                "time_zone": req.timezone,
            }),
        }
    }
}

/// Working record for one turn. Each stage returns an updated copy
/// rather than mutating a shared one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AgentState {
    pub input: String,
    pub output: String,
    pub tool: Option<ToolInvocation>,
    pub tool_result: Option<String>,
    pub pending: Option<PendingEvent>,
}

impl AgentState {
    pub fn new(input: &str, pending: Option<PendingEvent>) -> Self {
        Self {
            input: input.to_string(),
            pending,
            ..Default::default()
        }
    }

    pub fn with_output(self, output: &str) -> Self {
        Self {
            output: output.to_string(),
            ..self
        }
    }

    pub fn with_tool(self, tool: ToolInvocation) -> Self {
        Self {
            tool: Some(tool),
            ..self
        }
    }

    pub fn with_tool_result(self, result: &str) -> Self {
        Self {
            tool_result: Some(result.to_string()),
            ..self
        }
    }

    pub fn with_pending(self, pending: Option<PendingEvent>) -> Self {
        Self { pending, ..self }
    }
}
