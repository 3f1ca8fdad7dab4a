// Domain layer - Pure models and formulas, no I/O
pub mod baseline;
pub mod cities;
pub mod coordinate;
pub mod events;
pub mod exposure;
pub mod forecast;
pub mod health;
pub mod historical;
pub mod imagery;
pub mod measurement;
pub mod sample;
pub mod series;
