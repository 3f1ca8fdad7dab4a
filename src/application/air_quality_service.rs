// Air quality facade - live series, provenance, forecasts and derived views
use crate::application::broadcaster::{BroadcastError, SeriesBroadcaster};
use crate::application::clock::Clock;
use crate::application::query_cache::{
    Cached, QueryCache, QueryError, QueryKey, QueryKind, QueryPolicy, TaskGuard,
};
use crate::application::rankings::{CityRanking, rank_cities};
use crate::application::upstream_repository::{LocationRepository, MeasurementRepository};
use crate::domain::baseline::baseline;
use crate::domain::coordinate::{Coordinate, SelectedLocation};
use crate::domain::exposure::{ExposureAssessment, ExposureProfile, assess};
use crate::domain::forecast::{ForecastPoint, hourly_forecast};
use crate::domain::health::HealthAdvice;
use crate::domain::historical::{LocationProfile, TimeRange, historical_series};
use crate::domain::measurement::{DataProvenance, StationReading};
use crate::domain::sample::PollutantSample;
use crate::domain::series::Series;
use chrono::FixedOffset;
use futures::FutureExt;
use futures::future::BoxFuture;
use rand::rngs::StdRng;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Serialize)]
pub struct RealtimeSnapshot {
    pub coordinate: Option<Coordinate>,
    pub provenance: DataProvenance,
    pub health: Option<HealthAdvice>,
    pub series: Series,
}

pub struct AirQualityService {
    broadcaster: Arc<SeriesBroadcaster>,
    measurements: Option<Arc<dyn MeasurementRepository>>,
    locations: Arc<dyn LocationRepository>,
    realtime_cache: QueryCache<DataProvenance>,
    measurement_cache: QueryCache<Vec<StationReading>>,
    historical_cache: QueryCache<Arc<Vec<PollutantSample>>>,
    clock: Arc<dyn Clock>,
    rng: Arc<Mutex<StdRng>>,
    offset: FixedOffset,
    fallback: Option<Coordinate>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AirQualityService {
    pub fn new(
        broadcaster: Arc<SeriesBroadcaster>,
        measurements: Option<Arc<dyn MeasurementRepository>>,
        locations: Arc<dyn LocationRepository>,
        clock: Arc<dyn Clock>,
        rng: StdRng,
        offset: FixedOffset,
        fallback: Option<Coordinate>,
    ) -> Self {
        Self {
            broadcaster,
            measurements,
            locations,
            realtime_cache: QueryCache::new(QueryPolicy::for_kind(QueryKind::Realtime)),
            measurement_cache: QueryCache::new(QueryPolicy::for_kind(QueryKind::Measurements)),
            historical_cache: QueryCache::new(QueryPolicy::for_kind(QueryKind::Historical)),
            clock,
            rng: Arc::new(Mutex::new(rng)),
            offset,
            fallback,
        }
    }

    pub fn broadcaster(&self) -> &Arc<SeriesBroadcaster> {
        &self.broadcaster
    }

    pub fn historical_cache(&self) -> &QueryCache<Arc<Vec<PollutantSample>>> {
        &self.historical_cache
    }

    pub fn realtime_cache(&self) -> &QueryCache<DataProvenance> {
        &self.realtime_cache
    }

    pub fn measurement_cache(&self) -> &QueryCache<Vec<StationReading>> {
        &self.measurement_cache
    }

    /// Start the live series. Without an explicit coordinate the stored
    /// selection is used, then the configured default.
    pub fn start(&self, coord: Option<Coordinate>) -> Result<Option<Coordinate>, BroadcastError> {
        let resolved = coord
            .or_else(|| self.locations.load().map(|l| l.coordinate()))
            .or(self.fallback);
        self.broadcaster.initialize(resolved)?;
        Ok(self.broadcaster.coordinate())
    }

    pub async fn realtime(&self) -> RealtimeSnapshot {
        let coordinate = self.broadcaster.coordinate();
        let provenance = self.provenance(coordinate.as_ref()).await;
        let series = self.broadcaster.current();
        tracing::debug!(measured = provenance.is_measured(), samples = series.len(), "Realtime snapshot");
        RealtimeSnapshot {
            coordinate,
            provenance,
            health: series.latest().map(|s| HealthAdvice::for_aqi(f64::from(s.aqi))),
            series,
        }
    }

    /// Whether a real station backs the location. Lookup failures only
    /// downgrade to demonstration data.
    pub async fn provenance(&self, coord: Option<&Coordinate>) -> DataProvenance {
        let (Some(repository), Some(coord)) = (self.measurements.as_ref(), coord) else {
            return DataProvenance::demonstration();
        };

        let key = QueryKey::for_coordinate(QueryKind::Realtime, Some(coord));
        let fetcher = self.provenance_fetcher(Arc::clone(repository), *coord);
        match self.realtime_cache.fetch(key, fetcher).await {
            Ok(Cached { value, .. }) => value,
            Err(e) => {
                tracing::warn!("Realtime lookup failed, using demonstration data: {}", e);
                DataProvenance::demonstration()
            }
        }
    }

    /// Refresh the live location's provenance on the realtime interval.
    /// `None` without a station source or a live coordinate.
    pub fn keep_warm(&self) -> Option<TaskGuard> {
        let repository = Arc::clone(self.measurements.as_ref()?);
        let coord = self.broadcaster.coordinate()?;
        let key = QueryKey::for_coordinate(QueryKind::Realtime, Some(&coord));
        self.realtime_cache
            .spawn_refetch(key, self.provenance_fetcher(repository, coord))
    }

    // Station readings sit in their own longer-lived cache underneath.
    fn provenance_fetcher(
        &self,
        repository: Arc<dyn MeasurementRepository>,
        target: Coordinate,
    ) -> impl Fn() -> BoxFuture<'static, anyhow::Result<DataProvenance>> + Clone + Send + Sync + 'static
    {
        let stations = self.measurement_cache.clone();
        move || {
            let stations = stations.clone();
            let repository = Arc::clone(&repository);
            async move {
                let key = QueryKey::for_coordinate(QueryKind::Measurements, Some(&target));
                let lookup = move || {
                    let repository = Arc::clone(&repository);
                    async move { repository.latest_near(&target).await }.boxed()
                };
                let provenance = match stations.fetch(key, lookup).await {
                    Ok(Cached { value, .. }) => DataProvenance::from_readings(Some(&value)),
                    Err(e) => {
                        tracing::warn!("Station lookup failed, using demonstration data: {}", e);
                        DataProvenance::demonstration()
                    }
                };
                Ok(provenance)
            }
            .boxed()
        }
    }

    pub fn latest_sample(&self) -> Option<PollutantSample> {
        self.broadcaster.current().latest().cloned()
    }

    pub fn forecast(&self, hours: u32, interval: u32) -> Vec<ForecastPoint> {
        let latest = self.latest_sample();
        hourly_forecast(
            latest.as_ref(),
            self.clock.now(),
            &self.offset,
            hours,
            interval,
            &mut *lock(&self.rng),
        )
    }

    pub fn rankings(&self, limit: Option<usize>) -> Vec<CityRanking> {
        rank_cities(limit, self.clock.now(), &self.offset, &mut *lock(&self.rng))
    }

    /// Synthetic history for the live location, reused while fresh.
    pub async fn historical(
        &self,
        range: TimeRange,
        profile: LocationProfile,
    ) -> Result<Arc<Vec<PollutantSample>>, QueryError> {
        let coordinates = self.broadcaster.coordinate().unwrap_or_default();
        let key = QueryKey::new(
            QueryKind::Historical,
            format!(
                "{:?}|{:?}|{:.4},{:.4}",
                range, profile, coordinates.lat, coordinates.lon
            ),
        );
        let clock = Arc::clone(&self.clock);
        let rng = Arc::clone(&self.rng);
        let fetcher = move || {
            let series = historical_series(range, profile, coordinates, clock.now(), &mut *lock(&rng));
            async move { Ok(Arc::new(series)) }.boxed()
        };

        Ok(self.historical_cache.fetch(key, fetcher).await?.value)
    }

    /// Risk for `aqi`, or for the latest live reading when absent.
    pub fn assess_exposure(&self, aqi: Option<f64>, profile: &ExposureProfile) -> ExposureAssessment {
        let aqi = aqi.unwrap_or_else(|| match self.latest_sample() {
            Some(sample) => f64::from(sample.aqi),
            None => baseline(self.broadcaster.coordinate().as_ref()).aqi,
        });
        assess(aqi, profile)
    }

    pub fn selected_location(&self) -> Option<SelectedLocation> {
        self.locations.load()
    }

    /// Persist the selection. It becomes the start location on the next run.
    pub fn select_location(&self, location: &SelectedLocation) -> anyhow::Result<()> {
        self.locations.save(location)?;
        tracing::info!(city = %location.city, "Saved selected location");
        Ok(())
    }
}
