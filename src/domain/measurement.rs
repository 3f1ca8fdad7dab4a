// Ground station measurements and where a reading came from
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEMONSTRATION_NOTICE: &str = "using demonstration data";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub parameter: String,
    pub value: f64,
    pub unit: String,
    #[serde(rename = "lastUpdated")]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationReading {
    pub location: String,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataProvenance {
    Measured { station: String },
    Demonstration { notice: &'static str },
}

impl DataProvenance {
    pub fn demonstration() -> Self {
        DataProvenance::Demonstration {
            notice: DEMONSTRATION_NOTICE,
        }
    }

    /// Measured only when a station answered with at least one reading.
    pub fn from_readings(readings: Option<&[StationReading]>) -> Self {
        match readings.and_then(|r| r.first()) {
            Some(station) => DataProvenance::Measured {
                station: station.location.clone(),
            },
            None => Self::demonstration(),
        }
    }

    pub fn is_measured(&self) -> bool {
        matches!(self, DataProvenance::Measured { .. })
    }
}
