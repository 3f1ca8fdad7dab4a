// Personal exposure risk and cost estimation
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Moderate,
    Vigorous,
}

impl ActivityLevel {
    fn multiplier(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.0,
            ActivityLevel::Moderate => 1.5,
            ActivityLevel::Vigorous => 2.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommuteType {
    None,
    Walking,
    Public,
    Car,
}

impl CommuteType {
    fn multiplier(self) -> f64 {
        match self {
            CommuteType::None => 1.0,
            CommuteType::Walking => 1.8,
            CommuteType::Public => 1.4,
            CommuteType::Car => 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkEnvironment {
    Office,
    Outdoor,
    Industrial,
    Remote,
}

impl WorkEnvironment {
    fn multiplier(self) -> f64 {
        match self {
            WorkEnvironment::Office => 1.0,
            WorkEnvironment::Outdoor => 2.5,
            WorkEnvironment::Industrial => 3.0,
            WorkEnvironment::Remote => 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthCondition {
    Asthma,
    Respiratory,
    Heart,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureProfile {
    pub hours_outdoors: f64,
    pub activity_level: ActivityLevel,
    pub use_mask: bool,
    pub has_air_purifier: bool,
    pub commute_type: CommuteType,
    pub work_environment: WorkEnvironment,
    pub health_conditions: Vec<HealthCondition>,
}

impl Default for ExposureProfile {
    fn default() -> Self {
        Self {
            hours_outdoors: 4.0,
            activity_level: ActivityLevel::Moderate,
            use_mask: false,
            has_air_purifier: false,
            commute_type: CommuteType::Car,
            work_environment: WorkEnvironment::Office,
            health_conditions: Vec::new(),
        }
    }
}

impl ExposureProfile {
    fn has(&self, condition: HealthCondition) -> bool {
        self.health_conditions.contains(&condition)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
    Severe,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score <= 20.0 {
            RiskLevel::Low
        } else if score <= 40.0 {
            RiskLevel::Moderate
        } else if score <= 60.0 {
            RiskLevel::High
        } else if score <= 80.0 {
            RiskLevel::VeryHigh
        } else {
            RiskLevel::Severe
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RiskLevel::Low => "Minimal health impact expected",
            RiskLevel::Moderate => "Some health effects possible",
            RiskLevel::High => "Significant health risk",
            RiskLevel::VeryHigh => "Serious health concerns",
            RiskLevel::Severe => "Critical health risk",
        }
    }
}

/// Score in [0, 100]: AQI relative to the "good" ceiling, scaled by time outside,
/// breathing rate and setting, reduced by protective measures.
pub fn exposure_risk(aqi: f64, profile: &ExposureProfile) -> f64 {
    let mut factor = aqi / 50.0;
    factor *= profile.hours_outdoors / 8.0;
    factor *= profile.activity_level.multiplier();
    factor *= profile.commute_type.multiplier();
    factor *= profile.work_environment.multiplier();

    if profile.use_mask {
        factor *= 0.6;
    }
    if profile.has_air_purifier {
        factor *= 0.7;
    }

    (factor * 20.0).clamp(0.0, 100.0)
}

/// Monthly cost estimate in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub healthcare: f64,
    pub productivity: f64,
    pub medication: f64,
    pub equipment: f64,
    pub total: f64,
}

pub fn cost_breakdown(risk_score: f64, profile: &ExposureProfile) -> CostBreakdown {
    let base = risk_score * 2.0;
    let mut healthcare = base * 0.4;
    let productivity = base * 0.3;
    let mut medication = base * 0.2;
    let mut equipment = base * 0.1;

    if profile.has(HealthCondition::Asthma) {
        medication += 15.0;
    }
    if profile.has(HealthCondition::Heart) {
        healthcare += 20.0;
    }
    if profile.has(HealthCondition::Respiratory) {
        healthcare += 25.0;
    }
    if !profile.has_air_purifier {
        equipment += 50.0;
    }
    if !profile.use_mask {
        equipment += 5.0;
    }

    let total = healthcare + productivity + medication + equipment;
    CostBreakdown {
        healthcare: healthcare.round(),
        productivity: productivity.round(),
        medication: medication.round(),
        equipment: equipment.round(),
        total: total.round(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub action: &'static str,
    pub impact: Impact,
    pub cost: u32,
    pub description: &'static str,
}

pub fn recommendations(risk_score: f64, profile: &ExposureProfile) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if risk_score > 30.0 {
        out.push(Recommendation {
            action: "Reduce outdoor time",
            impact: Impact::High,
            cost: 0,
            description: "Limit outdoor activities during peak pollution hours",
        });
    }
    if risk_score > 50.0 && !profile.use_mask {
        out.push(Recommendation {
            action: "Use N95 mask outdoors",
            impact: Impact::High,
            cost: 15,
            description: "Reduce inhalation of harmful particles by 60%",
        });
    }
    if risk_score > 40.0 && !profile.has_air_purifier {
        out.push(Recommendation {
            action: "Install HEPA air purifier",
            impact: Impact::Medium,
            cost: 200,
            description: "Improve indoor air quality significantly",
        });
    }
    if risk_score > 60.0 {
        out.push(Recommendation {
            action: "Reschedule outdoor exercise",
            impact: Impact::Medium,
            cost: 0,
            description: "Move workouts to indoor facilities or cleaner times",
        });
    }
    if profile.hours_outdoors > 6.0 && risk_score > 30.0 {
        out.push(Recommendation {
            action: "Reduce outdoor exposure",
            impact: Impact::High,
            cost: 0,
            description: "Consider working from home if possible",
        });
    }

    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExposureAssessment {
    pub aqi: f64,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub description: &'static str,
    pub costs: CostBreakdown,
    pub recommendations: Vec<Recommendation>,
}

pub fn assess(aqi: f64, profile: &ExposureProfile) -> ExposureAssessment {
    let risk_score = exposure_risk(aqi, profile);
    let risk_level = RiskLevel::from_score(risk_score);
    ExposureAssessment {
        aqi,
        risk_score,
        risk_level,
        description: risk_level.description(),
        costs: cost_breakdown(risk_score, profile),
        recommendations: recommendations(risk_score, profile),
    }
}
