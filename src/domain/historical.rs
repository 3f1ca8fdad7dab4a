// Historical series generator with seasonal variation
use super::coordinate::Coordinate;
use super::sample::PollutantSample;
use chrono::{DateTime, Datelike, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    Year,
}

impl TimeRange {
    /// Unknown values fall back to the 24 hour view.
    pub fn parse(value: &str) -> Self {
        match value {
            "3m" => TimeRange::ThreeMonths,
            "6m" => TimeRange::SixMonths,
            "1y" => TimeRange::Year,
            _ => TimeRange::Day,
        }
    }

    pub fn points(self) -> u32 {
        match self {
            TimeRange::Day => 24,
            TimeRange::ThreeMonths => 90,
            TimeRange::SixMonths => 180,
            TimeRange::Year => 365,
        }
    }

    pub fn step(self) -> Duration {
        match self {
            TimeRange::Day => Duration::hours(1),
            _ => Duration::days(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationProfile {
    #[default]
    Urban,
    Suburban,
    Rural,
}

impl LocationProfile {
    /// Unknown profiles are treated as urban.
    pub fn parse(value: &str) -> Self {
        match value {
            "suburban" => LocationProfile::Suburban,
            "rural" => LocationProfile::Rural,
            _ => LocationProfile::Urban,
        }
    }

    fn levels(self) -> ProfileLevels {
        match self {
            LocationProfile::Urban => ProfileLevels {
                aqi: 65.0,
                pm25: 18.0,
                no2: 25.0,
                o3: 35.0,
                so2: 8.0,
                co: 0.8,
            },
            LocationProfile::Suburban => ProfileLevels {
                aqi: 45.0,
                pm25: 12.0,
                no2: 15.0,
                o3: 30.0,
                so2: 4.0,
                co: 0.5,
            },
            LocationProfile::Rural => ProfileLevels {
                aqi: 35.0,
                pm25: 8.0,
                no2: 10.0,
                o3: 25.0,
                so2: 2.0,
                co: 0.3,
            },
        }
    }
}

struct ProfileLevels {
    aqi: f64,
    pm25: f64,
    no2: f64,
    o3: f64,
    so2: f64,
    co: f64,
}

/// Winter heating and summer ozone push the index up by as much as 15 points.
pub fn seasonal_variation(at: &DateTime<Utc>) -> f64 {
    ((at.month0() as f64 - 2.0) * PI / 6.0).sin() * 15.0
}

/// `range.points() + 1` samples ending at `now`, oldest first.
pub fn historical_series<R: Rng + ?Sized>(
    range: TimeRange,
    profile: LocationProfile,
    coordinates: Coordinate,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<PollutantSample> {
    let levels = profile.levels();
    let step = range.step();

    (0..=range.points())
        .rev()
        .map(|i| {
            let timestamp = now - step * i as i32;
            let seasonal = seasonal_variation(&timestamp);
            let aqi = (levels.aqi + seasonal + (rng.r#gen::<f64>() - 0.5) * 20.0).max(10.0);
            let scale = 1.0 + seasonal * 0.01;

            PollutantSample {
                timestamp,
                aqi: aqi.round() as u16,
                pm25: levels.pm25 * scale,
                no2: levels.no2 * scale,
                o3: levels.o3 * scale,
                so2: levels.so2,
                co: levels.co,
                coordinates,
            }
        })
        .collect()
}
