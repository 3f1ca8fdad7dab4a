// Natural events service - merges the event categories that affect air quality
use crate::application::query_cache::{QueryCache, QueryKey, QueryKind, QueryPolicy, TaskGuard};
use crate::application::upstream_repository::EventRepository;
use crate::domain::events::{
    CategoryInfo, EventCategory, EventQuery, EventStatus, NaturalEvent, merge_events,
};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::Arc;

/// Category and per-category listing limit.
pub const AIR_QUALITY_CATEGORIES: [(EventCategory, u32); 3] = [
    (EventCategory::Wildfires, 50),
    (EventCategory::DustHaze, 30),
    (EventCategory::Volcanoes, 20),
];

#[derive(Debug, Clone, Serialize)]
pub struct EventDigest {
    pub events: Vec<NaturalEvent>,
    pub failed_categories: Vec<EventCategory>,
    /// Some listing came from cache after a failed refresh
    pub stale: bool,
}

#[derive(Clone)]
pub struct EventsService {
    repository: Arc<dyn EventRepository>,
    cache: QueryCache<Vec<NaturalEvent>>,
}

fn category_query(category: EventCategory, limit: u32, days: Option<u32>) -> EventQuery {
    EventQuery {
        source: None,
        status: Some(EventStatus::Open),
        limit: Some(limit),
        days,
        category: Some(category),
    }
}

fn query_key(query: &EventQuery) -> QueryKey {
    let category = query.category.map(|c| c.id().to_string()).unwrap_or_default();
    let status = query.status.map(|s| s.as_str()).unwrap_or("any");
    let limit = query.limit.map(|l| l.to_string()).unwrap_or_default();
    let days = query.days.map(|d| d.to_string()).unwrap_or_default();
    let source = query.source.as_deref().unwrap_or("");
    QueryKey::new(
        QueryKind::Events,
        format!("{}|{}|{}|{}|{}", category, status, limit, days, source),
    )
}

impl EventsService {
    pub fn new(repository: Arc<dyn EventRepository>) -> Self {
        Self::with_policy(repository, QueryPolicy::for_kind(QueryKind::Events))
    }

    pub fn with_policy(repository: Arc<dyn EventRepository>, policy: QueryPolicy) -> Self {
        Self {
            repository,
            cache: QueryCache::new(policy),
        }
    }

    pub fn cache(&self) -> &QueryCache<Vec<NaturalEvent>> {
        &self.cache
    }

    fn fetcher(
        &self,
        query: EventQuery,
    ) -> impl Fn() -> BoxFuture<'static, anyhow::Result<Vec<NaturalEvent>>>
    + Clone
    + Send
    + Sync
    + 'static {
        let repository = Arc::clone(&self.repository);
        move || {
            let repository = Arc::clone(&repository);
            let query = query.clone();
            async move { repository.list_events(&query).await }.boxed()
        }
    }

    /// Wildfires, dust and volcanoes, merged newest first. A category that
    /// cannot be fetched is left out and reported.
    pub async fn air_quality_events(&self, days: Option<u32>) -> EventDigest {
        let listings = AIR_QUALITY_CATEGORIES.iter().map(|&(category, limit)| {
            let query = category_query(category, limit, days);
            let key = query_key(&query);
            let fetcher = self.fetcher(query);
            async move { (category, self.cache.fetch(key, fetcher).await) }
        });
        let results = futures::future::join_all(listings).await;

        let mut failed_categories = Vec::new();
        let mut stale = false;
        let mut found = Vec::with_capacity(results.len());
        for (category, result) in results {
            match result {
                Ok(cached) => {
                    stale |= cached.stale;
                    found.push(cached.value);
                }
                Err(e) => {
                    tracing::warn!(?category, "Event category unavailable: {}", e);
                    failed_categories.push(category);
                }
            }
        }

        let events = merge_events(found);
        tracing::debug!(
            events = events.len(),
            failed = failed_categories.len(),
            "Merged air quality events"
        );
        EventDigest {
            events,
            failed_categories,
            stale,
        }
    }

    pub async fn categories(&self) -> anyhow::Result<Vec<CategoryInfo>> {
        self.repository.list_categories().await
    }

    /// Refresh every category listing in the background on the events policy.
    pub fn keep_warm(&self, days: Option<u32>) -> Vec<TaskGuard> {
        AIR_QUALITY_CATEGORIES
            .iter()
            .filter_map(|&(category, limit)| {
                let query = category_query(category, limit, days);
                self.cache.spawn_refetch(query_key(&query), self.fetcher(query))
            })
            .collect()
    }
}
