use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::ai::prompt::{Prompt, render};
use crate::ai::router::{Route, RouterContext, route};
use crate::ai::state::{AgentState, ConversationTurn, PendingEvent, ToolInvocation, TurnRole};
use crate::ai::tools::{ToolOutcome, execute, friendly_prefix};
use crate::calendar::CalendarBackend;
use crate::openai::{LanguageModel, Message, Role};

pub const PING: &str = "ping";
pub const PONG: &str = "pong";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TurnRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
    #[serde(default)]
    pub pending_event: Option<PendingEvent>,
}

/// What the tool was called with and what came back.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolReport {
    pub name: String,
    pub args: Value,
    pub result: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct TurnResponse {
    pub response: String,
    pub history: Vec<ConversationTurn>,
    pub pending_event: Option<PendingEvent>,
    pub tool: Option<ToolReport>,
}

/// Scheduling agent. Drafts a reply, routes it, runs at most one
/// calendar call and then rewrites the reply with the result.
///
/// Holds no per-conversation state so a single instance can serve
/// concurrent turns.
pub struct Scheduler<'a> {
    llm: &'a (dyn LanguageModel + Send + Sync),
    calendar: &'a (dyn CalendarBackend + Send + Sync),
    system_message: &'a str,
    default_timezone: Tz,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        llm: &'a (dyn LanguageModel + Send + Sync),
        calendar: &'a (dyn CalendarBackend + Send + Sync),
        system_message: &'a str,
        default_timezone: Tz,
    ) -> Self {
        Self {
            llm,
            calendar,
            system_message,
            default_timezone,
        }
    }

    fn system_prompt(&self, now: DateTime<Utc>) -> String {
        let today = now
            .with_timezone(&self.default_timezone)
            .format("%A, %B %-d, %Y")
            .to_string();
        render(
            Prompt::System,
            &json!({
                "system_message": self.system_message,
                "today": today,
                "timezone": self.default_timezone.name(),
            }),
        )
        .unwrap_or_else(|e| {
            tracing::error!("Failed to render system prompt: {}", e);
            self.system_message.to_string()
        })
    }

    fn transcript(&self, req: &TurnRequest, now: DateTime<Utc>) -> Vec<Message> {
        let mut messages = vec![Message::new(Role::System, &self.system_prompt(now))];
        messages.extend(req.history.iter().map(|turn| {
            let role = match turn.role {
                TurnRole::User => Role::User,
                TurnRole::Agent => Role::Assistant,
            };
            Message::new(role, &turn.content)
        }));
        messages.push(Message::new(Role::User, &req.message));
        messages
    }

    /// Second pass: have the model summarize the tool result and
    /// append the result itself so the details are never lost.
    async fn summarize(
        &self,
        mut messages: Vec<Message>,
        tool: &ToolInvocation,
        outcome: &ToolOutcome,
    ) -> String {
        let prefix = friendly_prefix(tool);
        let details = format!("{}{}", prefix, outcome.text);
        let tool_message = render(
            Prompt::ToolResult,
            &json!({"prefix": prefix, "result": outcome.text}),
        )
        .unwrap_or_else(|_| details.clone());
        messages.push(Message::new(Role::System, &tool_message));

        match self.llm.complete(&messages).await {
            Ok(reply) => format!("{}\n\n{}", reply.trim(), details),
            Err(e) => {
                tracing::warn!("Summary pass failed, returning the tool result: {}", e);
                details
            }
        }
    }

    async fn step(&self, req: &TurnRequest, now: DateTime<Utc>) -> AgentState {
        let state = AgentState::new(&req.message, req.pending_event.clone());

        if req.message.trim().eq_ignore_ascii_case(PING) {
            return state.with_output(PONG);
        }

        let messages = self.transcript(req, now);
        let draft = match self.llm.complete(&messages).await {
            Ok(draft) => draft,
            Err(e) => {
                tracing::error!("Drafting a reply failed: {}", e);
                return state.with_output(&format!("Error: {}", e));
            }
        };
        tracing::debug!("Draft reply: {}", draft);

        let ctx = RouterContext {
            now,
            default_timezone: self.default_timezone,
        };
        let transition = route(&draft, state.pending.as_ref(), &ctx);
        let state = state.with_pending(transition.pending);

        match transition.route {
            Route::Idle => state.with_output(&draft),
            Route::Clarify(message) | Route::ConfirmPending(message) => {
                state.with_output(&message)
            }
            Route::Execute(tool) => {
                let outcome = execute(self.calendar, &tool).await;
                let booked = outcome.success && matches!(tool, ToolInvocation::BookMeeting(_));
                let output = self.summarize(messages, &tool, &outcome).await;
                let state = if booked {
                    state.with_pending(None)
                } else {
                    state
                };
                state
                    .with_tool(tool)
                    .with_tool_result(&outcome.text)
                    .with_output(&output)
            }
        }
    }

    /// Run one chat turn and return the reply along with the updated
    /// history and pending booking for the caller to send back next
    /// time.
    pub async fn run_turn(&self, req: TurnRequest, now: DateTime<Utc>) -> TurnResponse {
        let state = self.step(&req, now).await;

        let mut history = req.history;
        history.push(ConversationTurn::user(&req.message));
        history.push(ConversationTurn::agent(&state.output));

        let tool = state.tool.as_ref().map(|tool| ToolReport {
            name: tool.name().to_string(),
            args: tool.args(),
            result: state.tool_result.clone().unwrap_or_default(),
        });

        TurnResponse {
            response: state.output,
            history,
            pending_event: state.pending,
            tool,
        }
    }
}
