// routes.rs
use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers;
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let api = Router::new()
        .route("/polls", post(handlers::create_poll))
        .route("/polls/by-code/{code}", get(handlers::get_poll_by_code))
        .route("/polls/{poll_id}", get(handlers::get_poll))
        .route("/polls/{poll_id}/results", get(handlers::get_results))
        .route("/polls/{poll_id}/results/chart.svg", get(handlers::results_chart))
        .route("/polls/{poll_id}/results/stream", get(handlers::results_stream))
        .route("/votes", post(handlers::submit_vote));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
