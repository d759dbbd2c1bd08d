//! Health Risk Score calculation
//!
//! Global invariants enforced:
//! - Deterministic, per-row scoring
//! - Each factor is a monotone step function; only its most severe step counts
//! - Step boundaries are strict (a value exactly on a threshold does not trigger it)
//! - Total is clamped to [0, 100]

use crate::dataset::HealthRecord;
use crate::predictor::Profile;
use serde::{Deserialize, Serialize};

/// Upper bound of the Health Risk Score
pub const MAX_SCORE: f64 = 100.0;

/// BMI steps, triggered when BMI is above each value
const BMI_STEPS: [f64; 3] = [22.0, 25.0, 30.0];
/// Weekly fast-food meal steps, triggered above each value
const FAST_FOOD_STEPS: [f64; 3] = [3.0, 6.0, 10.0];
/// Daily sleep steps, triggered below each value
const SLEEP_STEPS: [f64; 3] = [7.0, 6.0, 5.0];
/// Weekly activity steps, triggered below each value
const ACTIVITY_STEPS: [f64; 3] = [5.0, 3.0, 1.0];
/// Energy score steps, triggered below each value
const ENERGY_STEPS: [f64; 3] = [7.0, 5.0, 3.0];

/// Points awarded at each of a factor's three steps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepPoints {
    pub mild: f64,
    pub moderate: f64,
    pub severe: f64,
}

impl StepPoints {
    pub const fn new(mild: f64, moderate: f64, severe: f64) -> Self {
        StepPoints {
            mild,
            moderate,
            severe,
        }
    }
}

/// Configurable points for every factor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskPoints {
    pub bmi: StepPoints,
    pub fast_food: StepPoints,
    pub sleep: StepPoints,
    pub activity: StepPoints,
    pub energy: StepPoints,
}

impl Default for RiskPoints {
    fn default() -> Self {
        RiskPoints {
            bmi: StepPoints::new(8.0, 15.0, 25.0),
            fast_food: StepPoints::new(6.0, 12.0, 20.0),
            sleep: StepPoints::new(5.0, 10.0, 15.0),
            activity: StepPoints::new(3.0, 6.0, 10.0),
            energy: StepPoints::new(3.0, 6.0, 10.0),
        }
    }
}

/// Risk band classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    Low,      // < 30
    Moderate, // 30-60
    High,     // >= 60
}

impl RiskBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "low",
            RiskBand::Moderate => "moderate",
            RiskBand::High => "high",
        }
    }
}

/// Configurable risk band thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandThresholds {
    pub moderate: f64,
    pub high: f64,
}

impl Default for BandThresholds {
    fn default() -> Self {
        BandThresholds {
            moderate: 30.0,
            high: 60.0,
        }
    }
}

/// Everything the scorer needs: points per factor and band thresholds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RiskRules {
    pub points: RiskPoints,
    pub bands: BandThresholds,
}

/// The five scored inputs, shared by dataset rows and hand-entered profiles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskInputs {
    pub bmi: f64,
    pub fast_food_meals_per_week: f64,
    pub sleep_hours_per_day: f64,
    pub activity_hours_per_week: f64,
    pub energy_level_score: f64,
}

impl From<&HealthRecord> for RiskInputs {
    fn from(record: &HealthRecord) -> Self {
        RiskInputs {
            bmi: record.bmi,
            fast_food_meals_per_week: record.fast_food_meals_per_week as f64,
            sleep_hours_per_day: record.sleep_hours_per_day,
            activity_hours_per_week: record.physical_activity_hours_per_week,
            energy_level_score: record.energy_level_score as f64,
        }
    }
}

impl From<&Profile> for RiskInputs {
    fn from(profile: &Profile) -> Self {
        RiskInputs {
            bmi: profile.bmi,
            fast_food_meals_per_week: profile.fast_food_meals_per_week,
            sleep_hours_per_day: profile.sleep_hours_per_day,
            activity_hours_per_week: profile.activity_hours_per_week,
            energy_level_score: profile.energy_level_score,
        }
    }
}

/// Per-factor contributions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RiskFactors {
    pub bmi: f64,
    pub fast_food: f64,
    pub sleep: f64,
    pub activity: f64,
    pub energy: f64,
}

impl RiskFactors {
    pub fn total(&self) -> f64 {
        self.bmi + self.fast_food + self.sleep + self.activity + self.energy
    }
}

/// Clamped score, its band and the breakdown that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthRiskScore {
    pub score: f64,
    pub band: RiskBand,
    pub factors: RiskFactors,
}

/// Points for a factor that grows riskier as the value rises
fn points_above(value: f64, steps: &[f64; 3], points: &StepPoints) -> f64 {
    if value > steps[2] {
        points.severe
    } else if value > steps[1] {
        points.moderate
    } else if value > steps[0] {
        points.mild
    } else {
        0.0
    }
}

/// Points for a factor that grows riskier as the value falls
fn points_below(value: f64, steps: &[f64; 3], points: &StepPoints) -> f64 {
    if value < steps[2] {
        points.severe
    } else if value < steps[1] {
        points.moderate
    } else if value < steps[0] {
        points.mild
    } else {
        0.0
    }
}

/// Calculate the factor breakdown
pub fn calculate_risk_factors(inputs: &RiskInputs, points: &RiskPoints) -> RiskFactors {
    RiskFactors {
        bmi: points_above(inputs.bmi, &BMI_STEPS, &points.bmi),
        fast_food: points_above(
            inputs.fast_food_meals_per_week,
            &FAST_FOOD_STEPS,
            &points.fast_food,
        ),
        sleep: points_below(inputs.sleep_hours_per_day, &SLEEP_STEPS, &points.sleep),
        activity: points_below(
            inputs.activity_hours_per_week,
            &ACTIVITY_STEPS,
            &points.activity,
        ),
        energy: points_below(inputs.energy_level_score, &ENERGY_STEPS, &points.energy),
    }
}

/// Assign risk band with default thresholds
pub fn assign_risk_band(score: f64) -> RiskBand {
    assign_risk_band_with_thresholds(score, &BandThresholds::default())
}

/// Assign risk band with custom thresholds
pub fn assign_risk_band_with_thresholds(score: f64, thresholds: &BandThresholds) -> RiskBand {
    if score < thresholds.moderate {
        RiskBand::Low
    } else if score < thresholds.high {
        RiskBand::Moderate
    } else {
        RiskBand::High
    }
}

/// Score arbitrary inputs
pub fn score_inputs(inputs: &RiskInputs, rules: &RiskRules) -> HealthRiskScore {
    let factors = calculate_risk_factors(inputs, &rules.points);
    let score = factors.total().clamp(0.0, MAX_SCORE);
    HealthRiskScore {
        score,
        band: assign_risk_band_with_thresholds(score, &rules.bands),
        factors,
    }
}

/// Score a dataset row
pub fn score_record(record: &HealthRecord, rules: &RiskRules) -> HealthRiskScore {
    score_inputs(&RiskInputs::from(record), rules)
}

/// Score a hand-entered profile
pub fn score_profile(profile: &Profile, rules: &RiskRules) -> HealthRiskScore {
    score_inputs(&RiskInputs::from(profile), rules)
}

/// Cohort-level risk indicator derived from filtered averages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CohortRiskLevel {
    Low,
    Moderate,
    High,
}

impl CohortRiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            CohortRiskLevel::Low => "Low Risk",
            CohortRiskLevel::Moderate => "Moderate Risk",
            CohortRiskLevel::High => "High Risk",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            CohortRiskLevel::High => {
                "High fast food intake and BMI detected. Consider lifestyle changes."
            }
            CohortRiskLevel::Moderate => {
                "Moderate health risk. Small improvements can make a big difference."
            }
            CohortRiskLevel::Low => "Great balance! Your habits look healthy.",
        }
    }
}

/// Cohort indicator together with the averages it was derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRisk {
    pub level: CohortRiskLevel,
    pub label: String,
    pub message: String,
    pub avg_fast_food: f64,
    pub avg_bmi: f64,
}

/// Classify a cohort by its average fast-food intake and BMI
///
/// High: avg_ff > 10 and avg_bmi > 27.
/// Moderate: 6 <= avg_ff <= 10, or 24 <= avg_bmi <= 27.
/// Low: everything else.
pub fn assess_cohort(avg_fast_food: f64, avg_bmi: f64) -> CohortRisk {
    let level = if avg_fast_food > 10.0 && avg_bmi > 27.0 {
        CohortRiskLevel::High
    } else if (6.0..=10.0).contains(&avg_fast_food) || (24.0..=27.0).contains(&avg_bmi) {
        CohortRiskLevel::Moderate
    } else {
        CohortRiskLevel::Low
    };

    CohortRisk {
        level,
        label: level.label().to_string(),
        message: level.message().to_string(),
        avg_fast_food,
        avg_bmi,
    }
}
