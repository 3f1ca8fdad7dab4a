// HTTP request handlers
use crate::application::broadcaster::{BroadcasterState, BroadcasterStatus, Visibility};
use crate::domain::baseline::baseline;
use crate::domain::cities::find_city;
use crate::domain::coordinate::{Coordinate, SelectedLocation};
use crate::domain::exposure::ExposureProfile;
use crate::domain::historical::{LocationProfile, TimeRange};
use crate::domain::imagery::{DEFAULT_DIM, ImageryRequest};
use crate::domain::measurement::DataProvenance;
use crate::domain::series::Series;
use crate::infrastructure::chunked_json::chunked_json_stream;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

const STREAM_BUFFER: usize = 16;
const MAX_FORECAST_HOURS: u32 = 168;

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

async fn respond_json<T: Serialize>(data: &T, headers: &HeaderMap) -> Response {
    match json_response(data, accepts_brotli(headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
pub struct CacheSizes {
    pub events: usize,
    pub imagery: usize,
    pub historical: usize,
    pub realtime: usize,
    pub measurements: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub broadcaster: BroadcasterStatus,
    pub cache_entries: CacheSizes,
}

pub async fn service_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(StatusResponse {
        broadcaster: state.air_quality.broadcaster().status(),
        cache_entries: CacheSizes {
            events: state.events.cache().len(),
            imagery: state.imagery.cache().len(),
            historical: state.air_quality.historical_cache().len(),
            realtime: state.air_quality.realtime_cache().len(),
            measurements: state.air_quality.measurement_cache().len(),
        },
    })
}

#[derive(Debug, Deserialize)]
pub struct BaselineQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub city: Option<String>,
}

/// Regional baseline for `lat`/`lon` or a catalogued `city`. With neither,
/// the rural profile applies.
pub async fn get_baseline(Query(query): Query<BaselineQuery>) -> Response {
    let coord = match (query.lat, query.lon, query.city.as_deref()) {
        (Some(lat), Some(lon), _) => Some(Coordinate::new(lat, lon)),
        (_, _, Some(name)) => match find_city(name) {
            Some(city) => Some(city.coordinate()),
            None => return error_response(StatusCode::NOT_FOUND, format!("Unknown city: {}", name)),
        },
        _ => None,
    };
    Json(baseline(coord.as_ref())).into_response()
}

/// Current series with provenance and health guidance
pub async fn get_series(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.air_quality.realtime().await;
    respond_json(&snapshot, &headers).await
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Snapshot {
        provenance: DataProvenance,
        series: Series,
    },
    Update {
        series: Series,
    },
}

/// Live series as length-prefixed frames. The first frame is a snapshot of
/// the current window, then one update per refresh.
pub async fn stream_series(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let compress = accepts_brotli(&headers);
    let broadcaster = state.air_quality.broadcaster();
    if broadcaster.state() == BroadcasterState::Disposed {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "Live series has shut down");
    }
    let provenance = state
        .air_quality
        .provenance(broadcaster.coordinate().as_ref())
        .await;

    let (tx, mut rx) = mpsc::channel::<Series>(STREAM_BUFFER);
    let subscription = broadcaster.subscribe(move |series: &Series| -> anyhow::Result<()> {
        match tx.try_send(series.clone()) {
            Ok(()) | Err(TrySendError::Closed(_)) => Ok(()),
            Err(TrySendError::Full(_)) => anyhow::bail!("stream client is lagging, frame dropped"),
        }
    });
    tracing::info!("Series stream opened");

    let stream = async_stream::stream! {
        // Unsubscribes when the client goes away
        let _subscription = subscription;
        let mut provenance = Some(provenance);
        while let Some(series) = rx.recv().await {
            yield match provenance.take() {
                Some(provenance) => StreamMessage::Snapshot { provenance, series },
                None => StreamMessage::Update { series },
            };
        }
    };

    match chunked_json_stream(stream, compress) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct PresenceRequest {
    pub visible: bool,
}

#[derive(Debug, Serialize)]
pub struct PresenceResponse {
    pub visibility: Visibility,
    pub refreshed: bool,
}

pub async fn post_presence(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PresenceRequest>,
) -> impl IntoResponse {
    let visibility = if request.visible {
        Visibility::Visible
    } else {
        Visibility::Hidden
    };
    let refreshed = state.air_quality.broadcaster().on_visibility_change(visibility);
    Json(PresenceResponse {
        visibility,
        refreshed,
    })
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub hours: Option<u32>,
    pub interval: Option<u32>,
}

pub async fn get_forecast(
    Query(query): Query<ForecastQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let hours = query.hours.unwrap_or(24);
    let interval = query.interval.unwrap_or(3);
    if interval == 0 {
        return error_response(StatusCode::BAD_REQUEST, "interval must be at least 1 hour");
    }
    if hours > MAX_FORECAST_HOURS {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("hours must be at most {}", MAX_FORECAST_HOURS),
        );
    }

    let forecast = state.air_quality.forecast(hours, interval);
    respond_json(&forecast, &headers).await
}

#[derive(Debug, Deserialize)]
pub struct HistoricalQuery {
    pub range: Option<String>,
    pub profile: Option<String>,
}

pub async fn get_historical(
    Query(query): Query<HistoricalQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let range = query.range.as_deref().map(TimeRange::parse).unwrap_or_default();
    let profile = query
        .profile
        .as_deref()
        .map(LocationProfile::parse)
        .unwrap_or_default();

    match state.air_quality.historical(range, profile).await {
        Ok(series) => respond_json(series.as_ref(), &headers).await,
        Err(e) => {
            tracing::error!("Historical series unavailable: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExposureRequest {
    pub aqi: Option<f64>,
    pub profile: ExposureProfile,
}

pub async fn post_exposure(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExposureRequest>,
) -> impl IntoResponse {
    Json(state.air_quality.assess_exposure(request.aqi, &request.profile))
}

#[derive(Debug, Deserialize)]
pub struct RankingsQuery {
    pub limit: Option<usize>,
}

pub async fn get_rankings(
    Query(query): Query<RankingsQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let rankings = state.air_quality.rankings(query.limit);
    respond_json(&rankings, &headers).await
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub days: Option<u32>,
}

/// Merged air quality events. Missing categories are reported, never fatal.
pub async fn get_events(
    Query(query): Query<EventsQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let digest = state.events.air_quality_events(query.days).await;
    respond_json(&digest, &headers).await
}

pub async fn get_event_categories(State(state): State<Arc<AppState>>) -> Response {
    match state.events.categories().await {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => {
            tracing::warn!("EONET categories unavailable: {:#}", e);
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageryQuery {
    pub lat: f64,
    pub lon: f64,
    pub date: Option<NaiveDate>,
    pub dim: Option<f64>,
}

pub async fn get_imagery(
    Query(query): Query<ImageryQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let coordinate = match Coordinate::validated(query.lat, query.lon) {
        Ok(coordinate) => coordinate,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let request = ImageryRequest {
        coordinate,
        date: query.date,
        dim: query.dim.unwrap_or(DEFAULT_DIM),
    };

    match state.imagery.image(request).await {
        Ok(image) => ([(header::CONTENT_TYPE, image.content_type)], image.bytes).into_response(),
        Err(e) => {
            tracing::warn!("Earth imagery unavailable: {}", e);
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

pub async fn get_location(State(state): State<Arc<AppState>>) -> Response {
    match state.air_quality.selected_location() {
        Some(location) => Json(location).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "No location selected"),
    }
}

pub async fn put_location(
    State(state): State<Arc<AppState>>,
    Json(location): Json<SelectedLocation>,
) -> Response {
    if let Err(e) = Coordinate::validated(location.lat, location.lng) {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    // File I/O stays off the async workers
    let saved = {
        let state = Arc::clone(&state);
        let location = location.clone();
        tokio::task::spawn_blocking(move || state.air_quality.select_location(&location)).await
    };

    match saved.map_err(anyhow::Error::from).and_then(|result| result) {
        Ok(()) => Json(location).into_response(),
        Err(e) => {
            tracing::error!("Could not save location: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn is_truthy(value: Option<&serde_json::Value>) -> bool {
    match value {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(_) => true,
    }
}

/// Forward a UI command to the automation webhook.
pub async fn relay_command(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    if !is_truthy(payload.get("command")) {
        return error_response(StatusCode::BAD_REQUEST, "Missing command");
    }

    match state.webhook.forward(&payload).await {
        Ok(reply) => Json(serde_json::json!({
            "success": true,
            "n8nResponse": reply,
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Command relay failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
