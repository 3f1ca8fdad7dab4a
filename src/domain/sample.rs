// Synthetic pollutant sample generator
use super::baseline::RegionalBaseline;
use super::coordinate::Coordinate;
use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

pub const MIN_LIVE_AQI: u16 = 15;
pub const MAX_LIVE_AQI: u16 = 300;

const SPIKE_PROBABILITY: f64 = 0.05;
const SPIKE_FACTOR: f64 = 1.4;
const RUSH_HOUR_FACTOR: f64 = 1.2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantSample {
    pub timestamp: DateTime<Utc>,
    pub aqi: u16,
    pub pm25: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub co: f64,
    pub coordinates: Coordinate,
}

/// Single daily cycle, lowest before dawn and highest mid-afternoon.
pub fn diurnal_factor(hour: u32) -> f64 {
    ((hour as f64 - 6.0) * PI / 12.0).sin() * 0.4 + 0.8
}

pub fn is_rush_hour(hour: u32) -> bool {
    (7..=9).contains(&hour) || (16..=18).contains(&hour)
}

pub fn is_daytime(hour: u32) -> bool {
    (6..=18).contains(&hour)
}

/// Hour of day for `timestamp` as seen from `offset`.
pub fn local_hour(timestamp: &DateTime<Utc>, offset: &FixedOffset) -> u32 {
    timestamp.with_timezone(offset).hour()
}

/// Random and time-of-day multipliers for one reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleFactors {
    pub diurnal: f64,
    pub traffic: f64,
    pub jitter: f64,
    pub spike: f64,
}

impl SampleFactors {
    pub fn draw<R: Rng + ?Sized>(hour: u32, rng: &mut R) -> Self {
        let jitter = 0.9 + rng.r#gen::<f64>() * 0.2;
        let spike = if rng.gen_bool(SPIKE_PROBABILITY) {
            SPIKE_FACTOR
        } else {
            1.0
        };
        Self {
            diurnal: diurnal_factor(hour),
            traffic: if is_rush_hour(hour) { RUSH_HOUR_FACTOR } else { 1.0 },
            jitter,
            spike,
        }
    }

    fn composite(&self) -> f64 {
        self.diurnal * self.traffic * self.jitter * self.spike
    }
}

impl PollutantSample {
    /// Combine a baseline with pre-drawn factors.
    ///
    /// O3 follows daylight and weather only, SO2 weather only, CO traffic and
    /// weather; only AQI is clamped.
    pub fn from_factors(
        timestamp: DateTime<Utc>,
        hour: u32,
        baseline: &RegionalBaseline,
        coordinates: Coordinate,
        factors: SampleFactors,
    ) -> Self {
        let composite = factors.composite();
        let aqi = (baseline.aqi * composite).round();
        let aqi = aqi.clamp(MIN_LIVE_AQI as f64, MAX_LIVE_AQI as f64) as u16;
        let daylight = if is_daytime(hour) { 1.3 } else { 0.8 };

        Self {
            timestamp,
            aqi,
            pm25: baseline.pm25 * composite,
            no2: baseline.no2 * composite,
            o3: baseline.o3 * daylight * factors.jitter,
            so2: baseline.so2 * factors.jitter,
            co: baseline.co * factors.traffic * factors.jitter,
            coordinates,
        }
    }
}

/// Generate the reading `hour_offset` hours before `now`.
pub fn sample<R: Rng + ?Sized>(
    hour_offset: u32,
    now: DateTime<Utc>,
    offset: &FixedOffset,
    baseline: &RegionalBaseline,
    coordinates: Coordinate,
    rng: &mut R,
) -> PollutantSample {
    let timestamp = now - Duration::hours(i64::from(hour_offset));
    let hour = local_hour(&timestamp, offset);
    let factors = SampleFactors::draw(hour, rng);
    PollutantSample::from_factors(timestamp, hour, baseline, coordinates, factors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::baseline::baseline;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_diurnal_peaks_mid_afternoon() {
        assert!((diurnal_factor(12) - 1.2).abs() < 1e-9);
        assert!((diurnal_factor(0) - 0.4).abs() < 1e-9);
        assert!((diurnal_factor(6) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_rush_hours() {
        let rush: Vec<u32> = (0..24).filter(|h| is_rush_hour(*h)).collect();
        assert_eq!(rush, vec![7, 8, 9, 16, 17, 18]);
    }

    #[test]
    fn test_from_factors_applies_asymmetric_scaling() {
        let base = baseline(Some(&Coordinate::new(10.0, 10.0)));
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let factors = SampleFactors {
            diurnal: diurnal_factor(8),
            traffic: 1.2,
            jitter: 1.0,
            spike: 1.4,
        };
        let s = PollutantSample::from_factors(at, 8, &base, Coordinate::new(10.0, 10.0), factors);

        let composite = diurnal_factor(8) * 1.2 * 1.4;
        assert!((s.pm25 - base.pm25 * composite).abs() < 1e-9);
        assert!((s.no2 - base.no2 * composite).abs() < 1e-9);
        assert!((s.o3 - base.o3 * 1.3).abs() < 1e-9);
        assert!((s.so2 - base.so2).abs() < 1e-9);
        assert!((s.co - base.co * 1.2).abs() < 1e-9);
        assert_eq!(s.aqi, (base.aqi * composite).round() as u16);
    }

    #[test]
    fn test_aqi_clamped_at_both_ends() {
        let mut base = baseline(None);
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let calm = SampleFactors { diurnal: 0.4, traffic: 1.0, jitter: 0.9, spike: 1.0 };

        base.aqi = 1.0;
        let low = PollutantSample::from_factors(at, 0, &base, Coordinate::default(), calm);
        assert_eq!(low.aqi, MIN_LIVE_AQI);

        base.aqi = 10_000.0;
        let high = PollutantSample::from_factors(at, 0, &base, Coordinate::default(), calm);
        assert_eq!(high.aqi, MAX_LIVE_AQI);
    }

    #[test]
    fn test_sample_bounds_hold_for_many_draws() {
        let mut rng = StdRng::seed_from_u64(0xA1_2024);
        let now = Utc.with_ymd_and_hms(2024, 7, 4, 15, 30, 0).unwrap();
        let coord = Coordinate::new(39.9, 116.4);
        let base = baseline(Some(&coord));

        for offset in 0..500 {
            let s = sample(offset % 73, now, &utc(), &base, coord, &mut rng);
            assert!((MIN_LIVE_AQI..=MAX_LIVE_AQI).contains(&s.aqi));
            assert!(s.pm25 >= 0.0 && s.no2 >= 0.0);
            assert_eq!(s.coordinates, coord);
        }
    }

    #[test]
    fn test_sample_timestamp_and_local_hour() {
        let mut rng = StdRng::seed_from_u64(7);
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 0, 0).unwrap();
        let s = sample(5, now, &utc(), &baseline(None), Coordinate::default(), &mut rng);
        assert_eq!(s.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap());

        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        assert_eq!(local_hour(&s.timestamp, &tokyo), 7);
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let now = Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).unwrap();
        let base = baseline(None);
        let a = sample(3, now, &utc(), &base, Coordinate::default(), &mut StdRng::seed_from_u64(42));
        let b = sample(3, now, &utc(), &base, Coordinate::default(), &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
