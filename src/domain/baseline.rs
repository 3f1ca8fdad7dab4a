// Regional baseline model - coarse geographic bucketing of pollutant levels
use super::coordinate::Coordinate;
use serde::Serialize;

const BASE_AQI: f64 = 35.0;
const BASE_PM25: f64 = 12.0;
const BASE_NO2: f64 = 18.0;
const BASE_O3: f64 = 25.0;
const BASE_SO2: f64 = 2.0;
const BASE_CO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionClass {
    Industrial,
    Urban,
    Coastal,
    Rural,
}

impl RegionClass {
    /// First match wins, so the industrial box shadows most of the urban one.
    /// NaN fails every comparison and lands in `Rural`.
    pub fn classify(coord: &Coordinate) -> Self {
        let lat = coord.lat.abs();
        let lon = coord.lon.abs();

        if lat < 40.0 && lon < 90.0 {
            RegionClass::Industrial
        } else if lat < 45.0 && lon < 100.0 {
            RegionClass::Urban
        } else if lat < 35.0 {
            RegionClass::Coastal
        } else {
            RegionClass::Rural
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            RegionClass::Industrial => 1.5,
            RegionClass::Urban => 1.3,
            RegionClass::Coastal => 0.8,
            RegionClass::Rural => 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionalBaseline {
    pub region: RegionClass,
    pub aqi: f64,
    pub pm25: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub co: f64,
}

impl RegionalBaseline {
    fn scaled(region: RegionClass) -> Self {
        let factor = region.multiplier();
        Self {
            region,
            aqi: BASE_AQI * factor,
            pm25: BASE_PM25 * factor,
            no2: BASE_NO2 * factor,
            o3: BASE_O3 * factor,
            so2: BASE_SO2 * factor,
            co: BASE_CO * factor,
        }
    }
}

/// Baseline concentrations for a coordinate. Without one, the rural profile applies.
pub fn baseline(coord: Option<&Coordinate>) -> RegionalBaseline {
    let region = coord.map(RegionClass::classify).unwrap_or(RegionClass::Rural);
    RegionalBaseline::scaled(region)
}
