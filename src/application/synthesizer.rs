// Rolling window synthesizer - rebuilds the 73 hour window, carrying history over
use crate::application::clock::Clock;
use crate::domain::baseline::baseline;
use crate::domain::coordinate::Coordinate;
use crate::domain::sample::{PollutantSample, sample};
use crate::domain::series::{Series, WINDOW_LEN};
use crate::infrastructure::config::SimulationSettings;
use chrono::{FixedOffset, NaiveDate, Timelike};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::sync::Arc;

const NEWEST_OFFSET: u32 = (WINDOW_LEN - 1) as u32;

pub struct RollingWindowSynthesizer {
    clock: Arc<dyn Clock>,
    rng: StdRng,
    offset: FixedOffset,
    continuity_tail: Option<usize>,
}

impl RollingWindowSynthesizer {
    pub fn new(
        clock: Arc<dyn Clock>,
        rng: StdRng,
        offset: FixedOffset,
        continuity_tail: Option<usize>,
    ) -> Self {
        Self {
            clock,
            rng,
            offset,
            continuity_tail,
        }
    }

    pub fn from_settings(settings: &SimulationSettings, clock: Arc<dyn Clock>) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(clock, rng, settings.utc_offset(), settings.continuity_tail)
    }

    /// Build a fresh window ending now. Historical hours already present in
    /// `previous` (same local date and hour) are carried over as the same
    /// shared sample; the current hour is always regenerated.
    pub fn regenerate(&mut self, coord: Option<&Coordinate>, previous: Option<&Series>) -> Series {
        let now = self.clock.now();
        let base = baseline(coord);
        let coordinates = coord.copied().unwrap_or_default();
        let carried = self.carry_over(previous);

        let mut samples = Vec::with_capacity(WINDOW_LEN);
        for hour_offset in (0..=NEWEST_OFFSET).rev() {
            let target = now - chrono::Duration::hours(i64::from(hour_offset));
            let reused = if hour_offset > 0 {
                carried.get(&self.slot(&target)).cloned()
            } else {
                None
            };

            let next = reused.unwrap_or_else(|| {
                Arc::new(sample(
                    hour_offset,
                    now,
                    &self.offset,
                    &base,
                    coordinates,
                    &mut self.rng,
                ))
            });
            samples.push(next);
        }

        Series::new(samples)
    }

    fn carry_over(&self, previous: Option<&Series>) -> HashMap<(NaiveDate, u32), Arc<PollutantSample>> {
        let mut carried = HashMap::new();
        let Some(previous) = previous else {
            return carried;
        };

        let all = previous.samples();
        let tail = self.continuity_tail.unwrap_or(all.len()).min(all.len());
        for s in &all[all.len() - tail..] {
            carried
                .entry(self.slot(&s.timestamp))
                .or_insert_with(|| Arc::clone(s));
        }
        carried
    }

    /// (local date, hour of day) in the configured offset
    fn slot(&self, at: &chrono::DateTime<chrono::Utc>) -> (NaiveDate, u32) {
        let local = at.with_timezone(&self.offset);
        (local.date_naive(), local.hour())
    }
}
