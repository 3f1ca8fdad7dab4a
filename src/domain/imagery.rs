// Satellite imagery tiles
use super::coordinate::Coordinate;
use bytes::Bytes;
use chrono::NaiveDate;

pub const DEFAULT_DIM: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageryRequest {
    pub coordinate: Coordinate,
    pub date: Option<NaiveDate>,
    /// Tile width and height in degrees
    pub dim: f64,
}

impl ImageryRequest {
    pub fn cache_params(&self) -> String {
        let date = self
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "latest".to_string());
        format!(
            "{:.4},{:.4},{},{}",
            self.coordinate.lat, self.coordinate.lon, date, self.dim
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EarthImage {
    pub content_type: String,
    pub bytes: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_params() {
        let request = ImageryRequest {
            coordinate: Coordinate::new(29.78, -95.33),
            date: NaiveDate::from_ymd_opt(2024, 3, 1),
            dim: DEFAULT_DIM,
        };
        assert_eq!(request.cache_params(), "29.7800,-95.3300,2024-03-01,0.1");

        let latest = ImageryRequest { date: None, ..request };
        assert!(latest.cache_params().ends_with("latest,0.1"));
    }
}
