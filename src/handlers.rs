// handlers.rs
use std::convert::Infallible;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use chrono::Utc;
use futures::stream::{Stream, StreamExt};
use serde_json::json;

use crate::chart;
use crate::error::AppError;
use crate::models::{CreatePollRequest, PollResults, SubmitVoteRequest};
use crate::realtime;
use crate::services;
use crate::state::AppState;

fn payload<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::MalformedPayload(rejection.body_text()))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Create a poll and hand back its access code and share link
pub async fn create_poll(
    State(state): State<AppState>,
    body: Result<Json<CreatePollRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let poll =
        services::create_poll(state.store.as_ref(), &state.config, payload(body)?, Utc::now())
            .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "poll": poll })),
    ))
}

/// Fetch a poll with its ordered options
pub async fn get_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let poll_id = services::parse_poll_id(&poll_id)?;
    let detail = services::get_poll(state.store.as_ref(), poll_id).await?;
    Ok(Json(detail))
}

/// Resolve an access code to its poll
pub async fn get_poll_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let lookup = services::find_by_code(state.store.as_ref(), &code).await?;
    Ok(Json(lookup))
}

/// Cast a vote
pub async fn submit_vote(
    State(state): State<AppState>,
    body: Result<Json<SubmitVoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let receipt =
        services::submit_vote(state.store.as_ref(), &state.hub, payload(body)?, Utc::now())
            .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "vote": receipt })),
    ))
}

/// Get the aggregated results of a poll
pub async fn get_results(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let poll_id = services::parse_poll_id(&poll_id)?;
    let results = services::poll_results(state.store.as_ref(), poll_id, Utc::now()).await?;
    Ok(Json(results))
}

pub async fn results_chart(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let poll_id = services::parse_poll_id(&poll_id)?;
    let results = services::poll_results(state.store.as_ref(), poll_id, Utc::now()).await?;
    Ok((
        [(header::CONTENT_TYPE, "image/svg+xml")],
        chart::render(&results.results),
    ))
}

fn results_event(results: &PollResults) -> Event {
    Event::default()
        .event("results")
        .json_data(results)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

/// Stream the current tally, then a fresh one after every accepted vote
pub async fn results_stream(
    State(state): State<AppState>,
    Path(poll_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let poll_id = services::parse_poll_id(&poll_id)?;
    let now = Utc::now();
    services::visible_poll(state.store.as_ref(), poll_id, now).await?;

    // Subscribe first so no vote lands between the snapshot and the feed.
    let rx = state.hub.subscribe(poll_id);
    let initial = services::poll_results(state.store.as_ref(), poll_id, now).await?;

    let events = realtime::tally_stream(initial, rx).map(|results| Ok(results_event(&results)));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
