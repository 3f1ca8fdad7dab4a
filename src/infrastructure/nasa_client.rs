// NASA client - EONET natural events and Earth imagery
use crate::application::upstream_repository::{EventRepository, ImageryRepository};
use crate::domain::events::{CategoryInfo, EventQuery, NaturalEvent};
use crate::domain::imagery::{EarthImage, ImageryRequest};
use crate::infrastructure::api_error::{ApiError, decode_json, query_string, send_checked};
use crate::infrastructure::config::NasaSettings;
use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;

const EONET: &str = "EONET";
const EARTH_IMAGERY: &str = "Earth imagery";

#[derive(Debug, Clone)]
pub struct NasaClient {
    client: reqwest::Client,
    base_url: String,
    eonet_base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct EventListing {
    #[serde(default)]
    events: Vec<NaturalEvent>,
}

#[derive(Debug, Deserialize)]
struct CategoryListing {
    #[serde(default)]
    categories: Vec<CategoryInfo>,
}

impl NasaClient {
    pub fn new(client: reqwest::Client, settings: &NasaSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            eonet_base_url: settings.eonet_base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        }
    }

    fn events_url(&self, query: &EventQuery) -> String {
        let path = match query.category {
            Some(category) => format!("{}/categories/{}", self.eonet_base_url, category.id()),
            None => format!("{}/events", self.eonet_base_url),
        };
        let params = query_string(&[
            ("source", query.source.clone()),
            ("status", query.status.map(|s| s.as_str().to_string())),
            ("limit", query.limit.map(|l| l.to_string())),
            ("days", query.days.map(|d| d.to_string())),
        ]);

        if params.is_empty() {
            path
        } else {
            format!("{}?{}", path, params)
        }
    }

    fn imagery_url(&self, request: &ImageryRequest) -> String {
        let params = query_string(&[
            ("lon", Some(request.coordinate.lon.to_string())),
            ("lat", Some(request.coordinate.lat.to_string())),
            ("date", request.date.map(|d| d.format("%Y-%m-%d").to_string())),
            ("dim", Some(request.dim.to_string())),
            ("api_key", Some(self.api_key.clone())),
        ]);
        format!("{}/planetary/earth/imagery?{}", self.base_url, params)
    }

    pub async fn events(&self, query: &EventQuery) -> Result<Vec<NaturalEvent>, ApiError> {
        let url = self.events_url(query);
        tracing::debug!(%url, "Fetching EONET events");

        let response = send_checked(EONET, self.client.get(&url)).await?;
        let listing: EventListing = decode_json(EONET, response).await?;
        Ok(listing.events)
    }

    pub async fn categories(&self) -> Result<Vec<CategoryInfo>, ApiError> {
        let url = format!("{}/categories", self.eonet_base_url);
        let response = send_checked(EONET, self.client.get(&url)).await?;
        let listing: CategoryListing = decode_json(EONET, response).await?;
        Ok(listing.categories)
    }

    pub async fn earth_image(&self, request: &ImageryRequest) -> Result<EarthImage, ApiError> {
        let response = send_checked(EARTH_IMAGERY, self.client.get(self.imagery_url(request))).await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let bytes = response.bytes().await.map_err(|source| ApiError::Decode {
            endpoint: EARTH_IMAGERY,
            source,
        })?;

        Ok(EarthImage {
            content_type,
            bytes,
        })
    }
}

#[async_trait]
impl EventRepository for NasaClient {
    async fn list_events(&self, query: &EventQuery) -> anyhow::Result<Vec<NaturalEvent>> {
        Ok(self.events(query).await?)
    }

    async fn list_categories(&self) -> anyhow::Result<Vec<CategoryInfo>> {
        Ok(self.categories().await?)
    }
}

#[async_trait]
impl ImageryRepository for NasaClient {
    async fn earth_image(&self, request: &ImageryRequest) -> anyhow::Result<EarthImage> {
        Ok(NasaClient::earth_image(self, request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::coordinate::Coordinate;
    use crate::domain::events::{EventCategory, EventStatus};
    use crate::infrastructure::test_support::serve;
    use axum::extract::RawQuery;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use chrono::NaiveDate;

    fn settings(base: &str) -> NasaSettings {
        NasaSettings {
            base_url: format!("{}/nasa/", base),
            eonet_base_url: format!("{}/eonet", base),
            api_key: "TEST_KEY".to_string(),
        }
    }

    fn client(base: &str) -> NasaClient {
        NasaClient::new(reqwest::Client::new(), &settings(base))
    }

    #[test]
    fn test_event_urls() {
        let client = client("http://upstream");
        assert_eq!(
            client.events_url(&EventQuery::default()),
            "http://upstream/eonet/events"
        );

        let query = EventQuery {
            source: Some("InciWeb".to_string()),
            status: Some(EventStatus::Open),
            limit: Some(50),
            days: Some(30),
            category: Some(EventCategory::Wildfires),
        };
        assert_eq!(
            client.events_url(&query),
            "http://upstream/eonet/categories/8?source=InciWeb&status=open&limit=50&days=30"
        );
    }

    #[test]
    fn test_imagery_url() {
        let client = client("http://upstream");
        let url = client.imagery_url(&ImageryRequest {
            coordinate: Coordinate::new(29.78, -95.33),
            date: NaiveDate::from_ymd_opt(2024, 3, 1),
            dim: 0.1,
        });
        assert_eq!(
            url,
            "http://upstream/nasa/planetary/earth/imagery?lon=-95.33&lat=29.78&date=2024-03-01&dim=0.1&api_key=TEST_KEY"
        );
    }

    #[tokio::test]
    async fn test_fetches_category_events() {
        async fn category(RawQuery(query): RawQuery) -> Json<serde_json::Value> {
            assert_eq!(query.as_deref(), Some("status=open&limit=20"));
            Json(serde_json::json!({
                "title": "EONET Events: Volcanoes",
                "events": [{
                    "id": "EONET_354",
                    "title": "Kilauea Volcano, Hawaii",
                    "categories": [{"id": 12, "title": "Volcanoes"}],
                    "sources": [{"id": "SIVolcano", "url": "http://volcano.si.edu/"}],
                    "geometries": [{"date": "2024-06-03T00:00:00Z", "type": "Point", "coordinates": [-155.29, 19.41]}]
                }]
            }))
        }
        let base = serve(Router::new().route("/eonet/categories/12", get(category))).await;

        let events = client(&base)
            .events(&EventQuery {
                status: Some(EventStatus::Open),
                limit: Some(20),
                category: Some(EventCategory::Volcanoes),
                ..EventQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "EONET_354");
    }

    #[tokio::test]
    async fn test_lists_categories() {
        let base = serve(Router::new().route(
            "/eonet/categories",
            get(|| async {
                Json(serde_json::json!({
                    "categories": [{"id": 8, "title": "Wildfires", "link": "x", "description": "fires"}]
                }))
            }),
        ))
        .await;

        let categories = client(&base).categories().await.unwrap();
        assert_eq!(categories[0].title, "Wildfires");
    }

    #[tokio::test]
    async fn test_upstream_status_is_an_error() {
        let base = serve(Router::new().route(
            "/eonet/events",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response() }),
        ))
        .await;

        let err = client(&base).events(&EventQuery::default()).await.unwrap_err();
        match err {
            ApiError::Status { status, body, .. } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_earth_image_returns_bytes() {
        let base = serve(Router::new().route(
            "/nasa/planetary/earth/imagery",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![0x89u8, b'P', b'N', b'G']) }),
        ))
        .await;

        let image = client(&base)
            .earth_image(&ImageryRequest {
                coordinate: Coordinate::new(1.5, 100.75),
                date: None,
                dim: 0.1,
            })
            .await
            .unwrap();
        assert_eq!(image.content_type, "image/png");
        assert_eq!(&image.bytes[..], &[0x89, b'P', b'N', b'G']);
    }
}
