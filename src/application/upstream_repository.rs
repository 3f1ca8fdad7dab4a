// Repository traits for upstream data sources
use crate::domain::coordinate::{Coordinate, SelectedLocation};
use crate::domain::events::{CategoryInfo, EventQuery, NaturalEvent};
use crate::domain::imagery::{EarthImage, ImageryRequest};
use crate::domain::measurement::StationReading;
use async_trait::async_trait;

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Events matching `query`, in upstream order
    async fn list_events(&self, query: &EventQuery) -> anyhow::Result<Vec<NaturalEvent>>;

    async fn list_categories(&self) -> anyhow::Result<Vec<CategoryInfo>>;
}

#[async_trait]
pub trait MeasurementRepository: Send + Sync {
    /// Latest readings from stations near `coord`. Empty when none are in range.
    async fn latest_near(&self, coord: &Coordinate) -> anyhow::Result<Vec<StationReading>>;
}

#[async_trait]
pub trait ImageryRepository: Send + Sync {
    async fn earth_image(&self, request: &ImageryRequest) -> anyhow::Result<EarthImage>;
}

/// Where the user's chosen location is kept between runs.
pub trait LocationRepository: Send + Sync {
    /// `None` when nothing usable is stored
    fn load(&self) -> Option<SelectedLocation>;

    fn save(&self, location: &SelectedLocation) -> anyhow::Result<()>;
}
