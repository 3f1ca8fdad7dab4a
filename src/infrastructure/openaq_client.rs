// OpenAQ client - latest ground station readings near a coordinate
use crate::application::upstream_repository::MeasurementRepository;
use crate::domain::coordinate::Coordinate;
use crate::domain::measurement::StationReading;
use crate::infrastructure::api_error::{ApiError, decode_json, query_string, send_checked};
use crate::infrastructure::config::OpenAqSettings;
use async_trait::async_trait;
use serde::Deserialize;

const OPENAQ: &str = "OpenAQ";

#[derive(Debug, Clone)]
pub struct OpenAqClient {
    client: reqwest::Client,
    base_url: String,
    radius_m: u32,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    results: Vec<StationReading>,
}

impl OpenAqClient {
    pub fn new(client: reqwest::Client, settings: &OpenAqSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            radius_m: settings.radius_m,
        }
    }

    fn latest_url(&self, coord: &Coordinate) -> String {
        let params = query_string(&[
            ("coordinates", Some(format!("{},{}", coord.lat, coord.lon))),
            ("radius", Some(self.radius_m.to_string())),
            ("limit", Some("1".to_string())),
        ]);
        format!("{}/v2/latest?{}", self.base_url, params)
    }

    pub async fn latest(&self, coord: &Coordinate) -> Result<Vec<StationReading>, ApiError> {
        let response = send_checked(OPENAQ, self.client.get(self.latest_url(coord))).await?;
        let latest: LatestResponse = decode_json(OPENAQ, response).await?;
        tracing::debug!(stations = latest.results.len(), "OpenAQ latest readings");
        Ok(latest.results)
    }
}

#[async_trait]
impl MeasurementRepository for OpenAqClient {
    async fn latest_near(&self, coord: &Coordinate) -> anyhow::Result<Vec<StationReading>> {
        Ok(self.latest(coord).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::test_support::serve;
    use axum::extract::RawQuery;
    use axum::routing::get;
    use axum::{Json, Router};

    fn client(base: &str) -> OpenAqClient {
        OpenAqClient::new(
            reqwest::Client::new(),
            &OpenAqSettings {
                enabled: true,
                base_url: base.to_string(),
                radius_m: 50_000,
            },
        )
    }

    #[test]
    fn test_latest_url() {
        assert_eq!(
            client("https://api.openaq.org/").latest_url(&Coordinate::new(34.05, -118.24)),
            "https://api.openaq.org/v2/latest?coordinates=34.05%2C-118.24&radius=50000&limit=1"
        );
    }

    #[tokio::test]
    async fn test_parses_latest_readings() {
        async fn latest(RawQuery(query): RawQuery) -> Json<serde_json::Value> {
            assert!(query.unwrap_or_default().starts_with("coordinates=34.05%2C-118.24"));
            Json(serde_json::json!({
                "meta": {"found": 1},
                "results": [{
                    "location": "Los Angeles - N. Main St",
                    "city": "Los Angeles",
                    "measurements": [
                        {"parameter": "pm25", "value": 14.2, "unit": "µg/m³", "lastUpdated": "2024-08-01T17:00:00+00:00"},
                        {"parameter": "no2", "value": 0.021, "unit": "ppm", "lastUpdated": "2024-08-01T17:00:00+00:00"}
                    ]
                }]
            }))
        }
        let base = serve(Router::new().route("/v2/latest", get(latest))).await;

        let readings = client(&base).latest(&Coordinate::new(34.05, -118.24)).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].measurements[1].parameter, "no2");
        assert_eq!(readings[0].measurements[1].unit, "ppm");
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_decode_error() {
        let base = serve(Router::new().route("/v2/latest", get(|| async { "not json" }))).await;
        let err = client(&base).latest(&Coordinate::new(0.0, 0.0)).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }
}
