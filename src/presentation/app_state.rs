// Application state for HTTP handlers
use crate::application::air_quality_service::AirQualityService;
use crate::application::events_service::EventsService;
use crate::application::imagery_service::ImageryService;
use crate::infrastructure::webhook_client::WebhookClient;

pub struct AppState {
    pub air_quality: AirQualityService,
    pub events: EventsService,
    pub imagery: ImageryService,
    pub webhook: WebhookClient,
}
