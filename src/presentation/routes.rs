// Route table
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    get_baseline, get_event_categories, get_events, get_forecast,
    get_historical, get_imagery, get_location, get_rankings, get_series, health_check,
    post_exposure, post_presence, put_location, relay_command, service_status, stream_series,
};
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

// Handlers negotiate brotli themselves.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/status", get(service_status))
        .route("/baseline", get(get_baseline))
        .route("/series", get(get_series))
        .route("/series/stream", get(stream_series))
        .route("/presence", post(post_presence))
        .route("/forecast", get(get_forecast))
        .route("/historical", get(get_historical))
        .route("/exposure", post(post_exposure))
        .route("/rankings", get(get_rankings))
        .route("/events", get(get_events))
        .route("/events/categories", get(get_event_categories))
        .route("/imagery", get(get_imagery))
        .route("/location", get(get_location).put(put_location))
        .route("/commands", post(relay_command))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
