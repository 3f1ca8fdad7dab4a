use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub simulation: SimulationSettings,
    pub cache: CacheSettings,
    pub nasa: NasaSettings,
    pub openaq: OpenAqSettings,
    #[serde(default)]
    pub webhook: WebhookSettings,
    pub preferences: PreferenceSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationSettings {
    pub refresh_secs: u64,
    /// Offset used to decide the hour of day for diurnal and rush-hour factors
    pub utc_offset_minutes: i32,
    /// How many trailing samples of the previous window may be carried over.
    /// Unset means the whole window.
    pub continuity_tail: Option<usize>,
    pub seed: Option<u64>,
    pub default_lat: Option<f64>,
    pub default_lon: Option<f64>,
}

impl SimulationSettings {
    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_secs.max(1))
    }

    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheSettings {
    pub gc_sweep_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NasaSettings {
    pub base_url: String,
    pub eonet_base_url: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAqSettings {
    pub enabled: bool,
    pub base_url: String,
    pub radius_m: u32,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WebhookSettings {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PreferenceSettings {
    pub path: String,
}

fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    Ok(config::Config::builder()
        .set_default("server.bind", "0.0.0.0:8080")?
        .set_default("simulation.refresh_secs", 30)?
        .set_default("simulation.utc_offset_minutes", 0)?
        .set_default("cache.gc_sweep_secs", 60)?
        .set_default("nasa.base_url", "https://api.nasa.gov")?
        .set_default("nasa.eonet_base_url", "https://eonet.gsfc.nasa.gov/api/v2.1")?
        .set_default("nasa.api_key", "DEMO_KEY")?
        .set_default("openaq.enabled", true)?
        .set_default("openaq.base_url", "https://api.openaq.org")?
        .set_default("openaq.radius_m", 50_000)?
        .set_default("preferences.path", "data/selected_location.json")?)
}

/// Defaults, then `config/app.*` if present, then `AQI_PULSE__SECTION__KEY` variables.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = builder()?
        .add_source(config::File::with_name("config/app").required(false))
        .add_source(
            config::Environment::with_prefix("AQI_PULSE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
pub fn load_config_from_str(toml: &str) -> anyhow::Result<AppConfig> {
    let settings = builder()?
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.simulation.refresh_period(), Duration::from_secs(30));
        assert_eq!(config.nasa.api_key, "DEMO_KEY");
        assert!(config.webhook.url.is_none());
        assert!(config.simulation.continuity_tail.is_none());
        assert_eq!(config.simulation.utc_offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_file_overrides() {
        let config = load_config_from_str(
            r#"
            [simulation]
            refresh_secs = 5
            utc_offset_minutes = -300
            continuity_tail = 6
            seed = 42

            [webhook]
            url = "http://127.0.0.1:5678/webhook/commands"
            "#,
        )
        .unwrap();
        assert_eq!(config.simulation.refresh_period(), Duration::from_secs(5));
        assert_eq!(config.simulation.utc_offset().local_minus_utc(), -300 * 60);
        assert_eq!(config.simulation.continuity_tail, Some(6));
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(
            config.webhook.url.as_deref(),
            Some("http://127.0.0.1:5678/webhook/commands")
        );
    }

    #[test]
    fn test_out_of_range_offset_falls_back_to_utc() {
        let settings = SimulationSettings {
            refresh_secs: 0,
            utc_offset_minutes: 100_000,
            continuity_tail: None,
            seed: None,
            default_lat: None,
            default_lon: None,
        };
        assert_eq!(settings.utc_offset().local_minus_utc(), 0);
        assert_eq!(settings.refresh_period(), Duration::from_secs(1));
    }
}
