// Static catalogue of North American cities used for rankings
use super::coordinate::Coordinate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct City {
    pub name: &'static str,
    pub country: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl City {
    const fn new(name: &'static str, country: &'static str, lat: f64, lng: f64) -> Self {
        Self {
            name,
            country,
            lat,
            lng,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

pub const NORTH_AMERICAN_CITIES: &[City] = &[
    City::new("New York", "United States", 40.7128, -74.0060),
    City::new("Los Angeles", "United States", 34.0522, -118.2437),
    City::new("Chicago", "United States", 41.8781, -87.6298),
    City::new("Houston", "United States", 29.7604, -95.3698),
    City::new("Phoenix", "United States", 33.4484, -112.0740),
    City::new("Philadelphia", "United States", 39.9526, -75.1652),
    City::new("San Antonio", "United States", 29.4241, -98.4936),
    City::new("San Diego", "United States", 32.7157, -117.1611),
    City::new("Dallas", "United States", 32.7767, -96.7970),
    City::new("San Jose", "United States", 37.3382, -121.8863),
    City::new("Austin", "United States", 30.2672, -97.7431),
    City::new("Jacksonville", "United States", 30.3322, -81.6557),
    City::new("San Francisco", "United States", 37.7749, -122.4194),
    City::new("Seattle", "United States", 47.6062, -122.3321),
    City::new("Denver", "United States", 39.7392, -104.9903),
    City::new("Miami", "United States", 25.7617, -80.1918),
    City::new("Boston", "United States", 42.3601, -71.0589),
    City::new("Atlanta", "United States", 33.7490, -84.3880),
    City::new("Washington, D.C.", "United States", 38.9072, -77.0369),
    City::new("Las Vegas", "United States", 36.1699, -115.1398),
    City::new("Toronto", "Canada", 43.6532, -79.3832),
    City::new("Montreal", "Canada", 45.5017, -73.5673),
    City::new("Vancouver", "Canada", 49.2827, -123.1207),
    City::new("Calgary", "Canada", 51.0447, -114.0719),
    City::new("Edmonton", "Canada", 53.5461, -113.4938),
    City::new("Ottawa", "Canada", 45.4215, -75.6972),
    City::new("Winnipeg", "Canada", 49.8951, -97.1384),
    City::new("Quebec City", "Canada", 46.8139, -71.2080),
    City::new("Halifax", "Canada", 44.6488, -63.5752),
    City::new("Mexico City", "Mexico", 19.4326, -99.1332),
    City::new("Guadalajara", "Mexico", 20.6597, -103.3496),
    City::new("Monterrey", "Mexico", 25.6866, -100.3161),
    City::new("Puebla", "Mexico", 19.0414, -98.2063),
    City::new("Tijuana", "Mexico", 32.5149, -117.0382),
    City::new("Mérida", "Mexico", 20.9674, -89.5926),
    City::new("Cancún", "Mexico", 21.1619, -86.8515),
    City::new("Guatemala City", "Guatemala", 14.6349, -90.5069),
    City::new("San Salvador", "El Salvador", 13.6929, -89.2182),
    City::new("Tegucigalpa", "Honduras", 14.0723, -87.1921),
    City::new("Managua", "Nicaragua", 12.1364, -86.2514),
    City::new("San José", "Costa Rica", 9.9281, -84.0907),
    City::new("Panama City", "Panama", 8.9824, -79.5199),
    City::new("Havana", "Cuba", 23.1136, -82.3666),
    City::new("Santo Domingo", "Dominican Republic", 18.4861, -69.9312),
    City::new("Port-au-Prince", "Haiti", 18.5944, -72.3074),
    City::new("Kingston", "Jamaica", 17.9712, -76.7936),
    City::new("San Juan", "Puerto Rico", 18.4655, -66.1057),
];

pub fn find_city(name: &str) -> Option<&'static City> {
    NORTH_AMERICAN_CITIES
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
}
