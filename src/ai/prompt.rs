//! Reusable prompts using Handlebars for templating. Handlebars adds
//! additional security controls since it can't do much out of the box
//! without registering your own helpers. This is ideal since output
//! from LLMs should be considered untrusted and Handlebars forces you
//! to add only what you need.

use std::fmt;
use std::sync::OnceLock;

use anyhow::Result;
use handlebars::{Handlebars, no_escape};
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub enum Prompt {
    System,
    ConfirmBooking,
    ClarifyTime,
    PastTime,
    ToolResult,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

const SYSTEM_PROMPT: &str = r"{{system_message}}

Today is {{today}}. Unless the user names another timezone, times are in {{timezone}}.";

const CONFIRM_BOOKING_PROMPT: &str = r#"I'm ready to book "{{summary}}" on {{when}} ({{timezone}}) for {{duration}} minutes{{#if location}} on {{location}}{{/if}}{{#if conference}} with a Google Meet link{{/if}}{{#if reminder}} and a reminder {{reminder}} minutes before{{/if}}. Reply "confirm" to book it, or tell me what to change."#;

const CLARIFY_TIME_PROMPT: &str = r#"I couldn't work out when you'd like to {{action}}. Please give a date and time, for example "tomorrow at 3pm" or "2025-01-15 14:00". Times are in {{timezone}} unless you name another timezone."#;

const PAST_TIME_PROMPT: &str = r#"{{when}} ({{timezone}}) has already passed. Please give a date and time in the future, for example "tomorrow at 3pm"."#;

const TOOL_RESULT_PROMPT: &str = r"{{prefix}}{{result}}

Summarize the result above for the user in a friendly way and then show the details exactly as given.";

pub fn templates<'a>() -> Handlebars<'a> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    // Output is chat text, not HTML
    registry.register_escape_fn(no_escape);
    for (prompt, template) in [
        (Prompt::System, SYSTEM_PROMPT),
        (Prompt::ConfirmBooking, CONFIRM_BOOKING_PROMPT),
        (Prompt::ClarifyTime, CLARIFY_TIME_PROMPT),
        (Prompt::PastTime, PAST_TIME_PROMPT),
        (Prompt::ToolResult, TOOL_RESULT_PROMPT),
    ] {
        registry
            .register_template_string(&prompt.to_string(), template)
            .expect("Failed to register template");
    }
    registry
}

/// Render a prompt with the shared template registry.
pub fn render<T: Serialize>(prompt: Prompt, data: &T) -> Result<String> {
    static TEMPLATES: OnceLock<Handlebars<'static>> = OnceLock::new();
    let rendered = TEMPLATES
        .get_or_init(templates)
        .render(&prompt.to_string(), data)?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_confirm_booking_prompt() {
        let text = render(
            Prompt::ConfirmBooking,
            &json!({
                "summary": "Sam",
                "when": "Thursday, January 2, 2025 at 3:00 PM",
                "timezone": "Asia/Kolkata",
                "duration": 30,
                "location": null,
                "conference": false,
                "reminder": null,
            }),
        )
        .unwrap();
        assert_eq!(
            text,
            "I'm ready to book \"Sam\" on Thursday, January 2, 2025 at 3:00 PM (Asia/Kolkata) for 30 minutes. Reply \"confirm\" to book it, or tell me what to change."
        );
    }

    #[test]
    fn test_confirm_booking_prompt_with_extras() {
        let text = render(
            Prompt::ConfirmBooking,
            &json!({
                "summary": "Sam",
                "when": "Thursday, January 2, 2025 at 3:00 PM",
                "timezone": "UTC",
                "duration": 60,
                "location": "Zoom",
                "conference": false,
                "reminder": 10,
            }),
        )
        .unwrap();
        assert!(text.contains("for 60 minutes on Zoom and a reminder 10 minutes before."));
    }

    #[test]
    fn test_strict_mode_rejects_missing_fields() {
        assert!(render(Prompt::PastTime, &json!({"when": "today"})).is_err());
    }

    #[test]
    fn test_system_prompt() {
        let text = render(
            Prompt::System,
            &json!({
                "system_message": "Be helpful.",
                "today": "Wednesday, January 1, 2025",
                "timezone": "UTC",
            }),
        )
        .unwrap();
        assert!(text.starts_with("Be helpful.\n\nToday is Wednesday, January 1, 2025."));
    }
}
