//! Router for the chat API

use axum::{Json, Router, extract::State, routing::post};

use super::public;
use crate::ai::agents::Scheduler;
use crate::api::public::ApiError;
use crate::api::routes::SharedState;

/// Run one turn of the scheduling conversation. The caller sends back
/// the history and pending event from the previous response.
async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<public::ChatRequest>,
) -> Result<Json<public::ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::bad_request("Message must not be empty"));
    }

    let scheduler = Scheduler::new(
        state.llm.as_ref(),
        state.calendar.as_ref(),
        &state.config.system_message,
        state.config.default_timezone,
    );
    let resp: public::ChatResponse = scheduler.run_turn(payload, chrono::Utc::now()).await;

    if let Some(tool) = &resp.tool {
        tracing::debug!("Chat turn called {}: {}", tool.name, tool.result);
    }

    Ok(Json(resp))
}

/// Create the chat router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", post(chat_handler))
}
