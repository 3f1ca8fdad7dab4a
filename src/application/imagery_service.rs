// Earth imagery service - tiles change slowly, so they are cached for hours
use crate::application::query_cache::{QueryCache, QueryError, QueryKey, QueryKind, QueryPolicy};
use crate::application::upstream_repository::ImageryRepository;
use crate::domain::imagery::{EarthImage, ImageryRequest};
use futures::FutureExt;
use std::sync::Arc;

#[derive(Clone)]
pub struct ImageryService {
    repository: Arc<dyn ImageryRepository>,
    cache: QueryCache<EarthImage>,
}

impl ImageryService {
    pub fn new(repository: Arc<dyn ImageryRepository>) -> Self {
        Self::with_policy(repository, QueryPolicy::for_kind(QueryKind::Imagery))
    }

    pub fn with_policy(repository: Arc<dyn ImageryRepository>, policy: QueryPolicy) -> Self {
        Self {
            repository,
            cache: QueryCache::new(policy),
        }
    }

    pub fn cache(&self) -> &QueryCache<EarthImage> {
        &self.cache
    }

    pub async fn image(&self, request: ImageryRequest) -> Result<EarthImage, QueryError> {
        let key = QueryKey::new(QueryKind::Imagery, request.cache_params());
        let repository = Arc::clone(&self.repository);
        let fetcher = move || {
            let repository = Arc::clone(&repository);
            let request = request.clone();
            async move { repository.earth_image(&request).await }.boxed()
        };
        Ok(self.cache.fetch(key, fetcher).await?.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::coordinate::Coordinate;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingImagery(AtomicU32);

    #[async_trait]
    impl ImageryRepository for CountingImagery {
        async fn earth_image(&self, request: &ImageryRequest) -> anyhow::Result<EarthImage> {
            self.0.fetch_add(1, Ordering::SeqCst);
            if request.coordinate.lat > 80.0 {
                anyhow::bail!("no imagery available for the date");
            }
            Ok(EarthImage {
                content_type: "image/png".to_string(),
                bytes: Bytes::from_static(b"tile"),
            })
        }
    }

    fn request(lat: f64) -> ImageryRequest {
        ImageryRequest {
            coordinate: Coordinate::new(lat, 10.0),
            date: None,
            dim: 0.1,
        }
    }

    #[tokio::test]
    async fn test_tiles_are_cached_per_request() {
        let repository = Arc::new(CountingImagery(AtomicU32::new(0)));
        let service = ImageryService::new(repository.clone());

        service.image(request(10.0)).await.unwrap();
        service.image(request(10.0)).await.unwrap();
        service.image(request(11.0)).await.unwrap();
        assert_eq!(repository.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_surfaces_after_retries() {
        let repository = Arc::new(CountingImagery(AtomicU32::new(0)));
        let policy = QueryPolicy {
            retry_base: std::time::Duration::from_millis(1),
            ..QueryPolicy::for_kind(QueryKind::Imagery)
        };
        let service = ImageryService::with_policy(repository.clone(), policy);

        assert!(service.image(request(85.0)).await.is_err());
        assert_eq!(repository.0.load(Ordering::SeqCst), 3);
    }
}
