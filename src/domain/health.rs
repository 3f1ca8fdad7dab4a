// AQI bands and public health guidance
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AqiLevel {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiLevel {
    pub fn from_aqi(aqi: f64) -> Self {
        if aqi <= 50.0 {
            AqiLevel::Good
        } else if aqi <= 100.0 {
            AqiLevel::Moderate
        } else if aqi <= 150.0 {
            AqiLevel::UnhealthyForSensitiveGroups
        } else if aqi <= 200.0 {
            AqiLevel::Unhealthy
        } else if aqi <= 300.0 {
            AqiLevel::VeryUnhealthy
        } else {
            AqiLevel::Hazardous
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AqiLevel::Good => "Good",
            AqiLevel::Moderate => "Moderate",
            AqiLevel::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiLevel::Unhealthy => "Unhealthy",
            AqiLevel::VeryUnhealthy => "Very Unhealthy",
            AqiLevel::Hazardous => "Hazardous",
        }
    }

    /// EPA reporting colour
    pub fn color(self) -> &'static str {
        match self {
            AqiLevel::Good => "#00E400",
            AqiLevel::Moderate => "#FFFF00",
            AqiLevel::UnhealthyForSensitiveGroups => "#FF7E00",
            AqiLevel::Unhealthy => "#FF0000",
            AqiLevel::VeryUnhealthy => "#8F3F97",
            AqiLevel::Hazardous => "#7E0023",
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            AqiLevel::Good => {
                "Air quality is satisfactory. Enjoy your usual outdoor activities."
            }
            AqiLevel::Moderate => {
                "Air quality is acceptable. Consider reducing intense outdoor activities if you are unusually sensitive."
            }
            AqiLevel::UnhealthyForSensitiveGroups => {
                "Members of sensitive groups may experience health effects. The general public is less likely to be affected."
            }
            AqiLevel::Unhealthy => {
                "Everyone may begin to experience health effects. Members of sensitive groups may experience more serious health effects."
            }
            AqiLevel::VeryUnhealthy => {
                "Health alert: everyone may experience more serious health effects."
            }
            AqiLevel::Hazardous => {
                "Health warning of emergency conditions. The entire population is more likely to be affected."
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthAdvice {
    pub aqi: f64,
    pub level: AqiLevel,
    pub label: &'static str,
    pub color: &'static str,
    pub recommendation: &'static str,
}

impl HealthAdvice {
    pub fn for_aqi(aqi: f64) -> Self {
        let level = AqiLevel::from_aqi(aqi);
        Self {
            aqi,
            level,
            label: level.label(),
            color: level.color(),
            recommendation: level.recommendation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_edges_are_inclusive() {
        assert_eq!(AqiLevel::from_aqi(0.0), AqiLevel::Good);
        assert_eq!(AqiLevel::from_aqi(50.0), AqiLevel::Good);
        assert_eq!(AqiLevel::from_aqi(50.5), AqiLevel::Moderate);
        assert_eq!(AqiLevel::from_aqi(150.0), AqiLevel::UnhealthyForSensitiveGroups);
        assert_eq!(AqiLevel::from_aqi(300.0), AqiLevel::VeryUnhealthy);
        assert_eq!(AqiLevel::from_aqi(301.0), AqiLevel::Hazardous);
    }

    #[test]
    fn test_advice_carries_level_text() {
        let advice = HealthAdvice::for_aqi(175.0);
        assert_eq!(advice.level, AqiLevel::Unhealthy);
        assert_eq!(advice.color, "#FF0000");
        assert!(advice.recommendation.starts_with("Everyone may begin"));
    }
}
