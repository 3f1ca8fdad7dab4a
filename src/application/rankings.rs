// City leaderboard - synthesizes the two latest hours for every catalogued city
use crate::domain::baseline::baseline;
use crate::domain::cities::{City, NORTH_AMERICAN_CITIES};
use crate::domain::health::AqiLevel;
use crate::domain::sample::sample;
use chrono::{DateTime, FixedOffset, Utc};
use rand::Rng;
use serde::Serialize;

const TREND_THRESHOLD: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Deteriorating,
}

impl Trend {
    pub fn between(previous: u16, current: u16) -> Self {
        let delta = i32::from(current) - i32::from(previous);
        if delta < -TREND_THRESHOLD {
            Trend::Improving
        } else if delta > TREND_THRESHOLD {
            Trend::Deteriorating
        } else {
            Trend::Stable
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankCategory {
    Best,
    Good,
    Moderate,
    Poor,
    Worst,
}

impl RankCategory {
    pub fn from_aqi(aqi: u16) -> Self {
        match aqi {
            0..=25 => RankCategory::Best,
            26..=50 => RankCategory::Good,
            51..=100 => RankCategory::Moderate,
            101..=150 => RankCategory::Poor,
            _ => RankCategory::Worst,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CityRanking {
    pub rank: usize,
    pub city: &'static City,
    pub aqi: u16,
    pub previous_aqi: u16,
    pub pm25: f64,
    pub trend: Trend,
    pub category: RankCategory,
    pub level: &'static str,
}

/// Cleanest first. `limit` of `None` returns every city.
pub fn rank_cities<R: Rng + ?Sized>(
    limit: Option<usize>,
    now: DateTime<Utc>,
    offset: &FixedOffset,
    rng: &mut R,
) -> Vec<CityRanking> {
    let mut rows: Vec<CityRanking> = NORTH_AMERICAN_CITIES
        .iter()
        .map(|city| {
            let coord = city.coordinate();
            let base = baseline(Some(&coord));
            let current = sample(0, now, offset, &base, coord, rng);
            let previous = sample(1, now, offset, &base, coord, rng);

            CityRanking {
                rank: 0,
                city,
                aqi: current.aqi,
                previous_aqi: previous.aqi,
                pm25: current.pm25,
                trend: Trend::between(previous.aqi, current.aqi),
                category: RankCategory::from_aqi(current.aqi),
                level: AqiLevel::from_aqi(f64::from(current.aqi)).label(),
            }
        })
        .collect();

    rows.sort_by_key(|r| r.aqi);
    rows.truncate(limit.unwrap_or(rows.len()));
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }
    rows
}
