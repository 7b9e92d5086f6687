//! Router for the calendar API. These endpoints talk to the calendar
//! directly and skip the chat flow, including its confirmation step.

use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};
use axum_extra::extract::Query;
use chrono_tz::Tz;

use super::public;
use crate::api::public::ApiError;
use crate::api::routes::SharedState;
use crate::calendar::EventRequest;

async fn book_handler(
    State(state): State<SharedState>,
    Json(payload): Json<public::BookRequest>,
) -> Result<Json<public::BookResponse>, ApiError> {
    if payload.end_time <= payload.start_time {
        return Err(ApiError::bad_request("end_time must be after start_time"));
    }

    let timezone = match payload.time_zone {
        Some(name) => name
            .parse::<Tz>()
            .map_err(|_| ApiError::bad_request(format!("Unknown time_zone {}", name)))?,
        None => state.config.default_timezone,
    };

    let req = EventRequest {
        start: payload.start_time,
        end: payload.end_time,
        summary: payload.summary,
        timezone: timezone.name().to_string(),
        location: payload.location,
        conference: payload.conference.unwrap_or(false),
        reminder_minutes: payload.reminder_minutes,
    };
    let event = state.calendar.create_event(&req).await?;
    tracing::info!("Booked {} as event {}", req.summary, event.id);

    Ok(Json(public::BookResponse {
        event_id: event.id,
        html_link: event.html_link,
        status: "success".to_string(),
    }))
}

async fn availability_handler(
    State(state): State<SharedState>,
    Query(params): Query<public::AvailabilityQuery>,
) -> Result<Json<public::AvailabilityResponse>, ApiError> {
    if params.end_time <= params.start_time {
        return Err(ApiError::bad_request("end_time must be after start_time"));
    }

    let busy = state
        .calendar
        .query_busy(params.start_time, params.end_time)
        .await?;

    Ok(Json(public::AvailabilityResponse { busy }))
}

/// Create the calendar router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/book", post(book_handler))
        .route("/availability", get(availability_handler))
}
