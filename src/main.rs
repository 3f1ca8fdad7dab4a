// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

use crate::application::air_quality_service::AirQualityService;
use crate::application::broadcaster::SeriesBroadcaster;
use crate::application::clock::{Clock, SystemClock};
use crate::application::events_service::EventsService;
use crate::application::imagery_service::ImageryService;
use crate::application::synthesizer::RollingWindowSynthesizer;
use crate::application::upstream_repository::MeasurementRepository;
use crate::domain::coordinate::Coordinate;
use crate::infrastructure::config::load_config;
use crate::infrastructure::nasa_client::NasaClient;
use crate::infrastructure::openaq_client::OpenAqClient;
use crate::infrastructure::preference_store::PreferenceStore;
use crate::infrastructure::webhook_client::WebhookClient;
use crate::presentation::app_state::AppState;
use crate::presentation::routes::router;
use rand::SeedableRng;
use rand::rngs::StdRng;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("aqi_pulse=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = load_config()?;
    let simulation = &config.simulation;

    // Create clients (infrastructure layer)
    let http = reqwest::Client::builder().timeout(UPSTREAM_TIMEOUT).build()?;
    let nasa = Arc::new(NasaClient::new(http.clone(), &config.nasa));
    let measurements: Option<Arc<dyn MeasurementRepository>> = if config.openaq.enabled {
        Some(Arc::new(OpenAqClient::new(http.clone(), &config.openaq)))
    } else {
        None
    };
    let preferences = Arc::new(PreferenceStore::new(&config.preferences.path));
    tracing::info!(path = %preferences.path().display(), "Using preference store");
    let webhook = WebhookClient::new(http, &config.webhook);

    // Create services (application layer)
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let synthesizer = RollingWindowSynthesizer::from_settings(simulation, Arc::clone(&clock));
    let broadcaster = Arc::new(SeriesBroadcaster::new(synthesizer, simulation.refresh_period()));
    let rng = match simulation.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };
    let fallback = match (simulation.default_lat, simulation.default_lon) {
        (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
        _ => None,
    };

    let air_quality = AirQualityService::new(
        broadcaster,
        measurements,
        preferences,
        clock,
        rng,
        simulation.utc_offset(),
        fallback,
    );
    let coordinate = air_quality.start(None)?;
    tracing::info!(?coordinate, "Live series started");

    let events = EventsService::new(nasa.clone());
    let imagery = ImageryService::new(nasa);

    // Background cache maintenance; tasks stop when the guards drop
    let sweep = Duration::from_secs(config.cache.gc_sweep_secs.max(1));
    let _maintenance = vec![
        events.cache().spawn_gc_sweeper(sweep),
        imagery.cache().spawn_gc_sweeper(sweep),
        air_quality.historical_cache().spawn_gc_sweeper(sweep),
        air_quality.realtime_cache().spawn_gc_sweeper(sweep),
        air_quality.measurement_cache().spawn_gc_sweeper(sweep),
    ];
    let _warm_events = events.keep_warm(None);
    let _warm_realtime = air_quality.keep_warm();

    // Create application state
    let state = Arc::new(AppState {
        air_quality,
        events,
        imagery,
        webhook,
    });

    // Build router (presentation layer)
    let app = router(Arc::clone(&state));

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting aqi-pulse service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.air_quality.broadcaster().dispose();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
