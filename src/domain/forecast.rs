// Hourly forecast projected from the latest reading
use super::sample::{PollutantSample, diurnal_factor, is_daytime, is_rush_hour};
use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use rand::Rng;
use serde::Serialize;
use std::f64::consts::PI;

const DEFAULT_AQI: f64 = 45.0;
const DEFAULT_PM25: f64 = 12.5;
const DEFAULT_NO2: f64 = 18.3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub hour: String,
    pub timestamp: DateTime<Utc>,
    pub aqi: u16,
    pub pm25: f64,
    pub no2: f64,
    pub temperature: i32,
    pub wind_speed: f64,
    pub humidity: i32,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Project `hours` ahead in steps of `interval` hours, starting at `now`.
/// An `interval` of zero yields an empty forecast.
pub fn hourly_forecast<R: Rng + ?Sized>(
    current: Option<&PollutantSample>,
    now: DateTime<Utc>,
    offset: &FixedOffset,
    hours: u32,
    interval: u32,
    rng: &mut R,
) -> Vec<ForecastPoint> {
    if interval == 0 {
        return Vec::new();
    }

    let current_aqi = current.map(|s| f64::from(s.aqi)).unwrap_or(DEFAULT_AQI);
    let current_pm25 = current.map(|s| s.pm25).unwrap_or(DEFAULT_PM25);
    let current_no2 = current.map(|s| s.no2).unwrap_or(DEFAULT_NO2);

    let base_trend = if is_daytime(now.with_timezone(offset).hour()) {
        1.1
    } else {
        0.9
    };

    (0..=hours)
        .step_by(interval as usize)
        .map(|step| {
            let at = now + Duration::hours(i64::from(step));
            let local = at.with_timezone(offset);
            let hour = local.hour();

            let rush = if is_rush_hour(hour) { 1.15 } else { 1.0 };
            let temperature = 15.0 + ((hour as f64 - 6.0) * PI / 12.0).sin() * 10.0;
            let wind_speed = 2.0 + rng.r#gen::<f64>() * 8.0;
            let humidity = 40.0 + ((hour as f64 - 12.0) * PI / 12.0).sin() * 20.0;

            // Wind disperses, humid air traps
            let wind_factor = (1.0 - wind_speed * 0.03).max(0.7);
            let humidity_factor = if humidity > 80.0 { 1.1 } else { 1.0 };

            let combined = diurnal_factor(hour) * rush * wind_factor * humidity_factor * base_trend;

            let aqi = (current_aqi * combined * (0.95 + rng.r#gen::<f64>() * 0.1)).round();
            let pm25 = current_pm25 * combined * (0.95 + rng.r#gen::<f64>() * 0.1);
            let no2 = current_no2 * combined * (0.95 + rng.r#gen::<f64>() * 0.1);

            ForecastPoint {
                hour: local.format("%H:%M").to_string(),
                timestamp: at,
                aqi: aqi.clamp(0.0, 500.0) as u16,
                pm25: round1(pm25).max(0.0),
                no2: round1(no2).max(0.0),
                temperature: temperature.round() as i32,
                wind_speed: round1(wind_speed),
                humidity: humidity.round() as i32,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_step_count_and_labels() {
        let now = Utc.with_ymd_and_hms(2024, 9, 1, 10, 0, 0).unwrap();
        let forecast = hourly_forecast(None, now, &utc(), 24, 3, &mut StdRng::seed_from_u64(1));
        assert_eq!(forecast.len(), 9);
        assert_eq!(forecast[0].hour, "10:00");
        assert_eq!(forecast[1].hour, "13:00");
        assert_eq!(forecast[8].timestamp, now + Duration::hours(24));
    }

    #[test]
    fn test_values_stay_in_range() {
        let now = Utc.with_ymd_and_hms(2024, 9, 1, 22, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        for point in hourly_forecast(None, now, &utc(), 48, 1, &mut rng) {
            assert!(point.aqi <= 500);
            assert!(point.pm25 >= 0.0 && point.no2 >= 0.0);
            assert!((2.0..=10.0).contains(&point.wind_speed));
            assert!((20..=60).contains(&point.humidity));
        }
    }

    #[test]
    fn test_zero_interval_is_empty() {
        let now = Utc.with_ymd_and_hms(2024, 9, 1, 22, 0, 0).unwrap();
        let forecast = hourly_forecast(None, now, &utc(), 24, 0, &mut StdRng::seed_from_u64(1));
        assert!(forecast.is_empty());
    }
}
