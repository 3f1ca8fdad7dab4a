// Natural event models (wildfires, dust, volcanoes) as reported by EONET
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Wildfires,
    Volcanoes,
    DustHaze,
    WaterColor,
}

impl EventCategory {
    pub fn id(self) -> u32 {
        match self {
            EventCategory::Wildfires => 8,
            EventCategory::Volcanoes => 12,
            EventCategory::DustHaze => 16,
            EventCategory::WaterColor => 17,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Open,
    Closed,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Open => "open",
            EventStatus::Closed => "closed",
        }
    }
}

/// Filters for an event listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct EventQuery {
    pub source: Option<String>,
    pub status: Option<EventStatus>,
    pub limit: Option<u32>,
    pub days: Option<u32>,
    pub category: Option<EventCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCategoryRef {
    pub id: u32,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSource {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventGeometry {
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    /// Either a single `[lon, lat]` point or a polygon ring.
    pub coordinates: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaturalEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub categories: Vec<EventCategoryRef>,
    #[serde(default)]
    pub sources: Vec<EventSource>,
    #[serde(default)]
    pub geometries: Vec<EventGeometry>,
}

impl NaturalEvent {
    pub fn first_observed(&self) -> Option<DateTime<Utc>> {
        self.geometries.first().map(|g| g.date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub layers: Option<String>,
}

/// Concatenate listings, keep the first event per id, newest first.
/// Events without geometry sort as if observed at the epoch.
pub fn merge_events<I>(listings: I) -> Vec<NaturalEvent>
where
    I: IntoIterator<Item = Vec<NaturalEvent>>,
{
    let mut seen = std::collections::HashSet::new();
    let mut merged: Vec<NaturalEvent> = listings
        .into_iter()
        .flatten()
        .filter(|e| seen.insert(e.id.clone()))
        .collect();

    merged.sort_by_key(|e| {
        std::cmp::Reverse(e.first_observed().unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
    });
    merged
}
