// Application layer - Services orchestrating domain logic
pub mod air_quality_service;
pub mod broadcaster;
pub mod clock;
pub mod events_service;
pub mod imagery_service;
pub mod query_cache;
pub mod rankings;
pub mod synthesizer;
pub mod upstream_repository;
