//! Personalized Health Predictor
//!
//! Scores every historical row by weighted L1 distance to a hand-entered
//! profile, keeps the nearest `k`, and averages outcome columns over that
//! neighbourhood.
//!
//! Global invariants enforced:
//! - Ties are broken by original row order
//! - Parallel distance computation yields the same neighbourhood as a serial one
//! - Same profile + same table => same neighbourhood and same outputs

use crate::dataset::HealthRecord;
use crate::insights::mean;
use crate::risk::{score_profile, score_record, HealthRiskScore, RiskRules};
use anyhow::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Default neighbourhood size
pub const DEFAULT_NEIGHBORS: usize = 50;

/// Hand-entered lifestyle profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub age: f64,
    pub bmi: f64,
    pub fast_food_meals_per_week: f64,
    pub sleep_hours_per_day: f64,
    pub activity_hours_per_week: f64,
    pub energy_level_score: f64,
}

impl Profile {
    /// Reject values no dataset row could be compared against
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("age", self.age),
            ("bmi", self.bmi),
            ("fast food meals per week", self.fast_food_meals_per_week),
            ("sleep hours per day", self.sleep_hours_per_day),
            ("activity hours per week", self.activity_hours_per_week),
            ("energy level score", self.energy_level_score),
        ] {
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!(
                    "profile {} must be a non-negative number (got {})",
                    name,
                    value
                );
            }
        }
        if self.sleep_hours_per_day > 24.0 {
            anyhow::bail!(
                "profile sleep hours per day must be at most 24 (got {})",
                self.sleep_hours_per_day
            );
        }
        Ok(())
    }
}

/// Per-column weights of the L1 distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWeights {
    pub age: f64,
    pub bmi: f64,
    pub fast_food: f64,
    pub sleep: f64,
    pub activity: f64,
    pub energy: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        SimilarityWeights {
            age: 0.5,
            bmi: 2.0,
            fast_food: 1.5,
            sleep: 1.5,
            activity: 1.0,
            energy: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictorSettings {
    pub weights: SimilarityWeights,
    pub neighbors: usize,
}

impl Default for PredictorSettings {
    fn default() -> Self {
        PredictorSettings {
            weights: SimilarityWeights::default(),
            neighbors: DEFAULT_NEIGHBORS,
        }
    }
}

/// A selected row and its distance to the profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
}

/// Neighbourhood averages of the outcome columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PredictedOutcomes {
    pub overall_health_score: f64,
    pub doctor_visits_per_year: f64,
    /// Share of neighbours reporting digestive issues (None if none had a valid flag)
    pub digestive_issue_rate: Option<f64>,
    pub average_daily_calories: f64,
    pub risk_score: f64,
}

/// Complete prediction for one profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub profile: Profile,
    pub profile_risk: HealthRiskScore,
    pub neighbors_used: usize,
    pub mean_distance: f64,
    pub outcomes: PredictedOutcomes,
    pub neighbors: Vec<Neighbor>,
}

/// Weighted L1 distance between a profile and a row
pub fn distance(profile: &Profile, record: &HealthRecord, weights: &SimilarityWeights) -> f64 {
    weights.age * (profile.age - record.age as f64).abs()
        + weights.bmi * (profile.bmi - record.bmi).abs()
        + weights.fast_food
            * (profile.fast_food_meals_per_week - record.fast_food_meals_per_week as f64).abs()
        + weights.sleep * (profile.sleep_hours_per_day - record.sleep_hours_per_day).abs()
        + weights.activity
            * (profile.activity_hours_per_week - record.physical_activity_hours_per_week).abs()
        + weights.energy * (profile.energy_level_score - record.energy_level_score as f64).abs()
}

/// The `settings.neighbors` nearest rows, closest first
pub fn nearest_neighbors(
    profile: &Profile,
    records: &[HealthRecord],
    settings: &PredictorSettings,
) -> Vec<Neighbor> {
    let mut scored: Vec<Neighbor> = records
        .par_iter()
        .enumerate()
        .map(|(index, record)| Neighbor {
            index,
            distance: distance(profile, record, &settings.weights),
        })
        .collect();

    scored.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.index.cmp(&b.index))
    });
    scored.truncate(settings.neighbors);
    scored
}

/// Predict outcomes for a profile from its nearest neighbours
pub fn predict(
    profile: &Profile,
    records: &[HealthRecord],
    settings: &PredictorSettings,
    rules: &RiskRules,
) -> Result<Prediction> {
    profile.validate()?;
    if records.is_empty() {
        anyhow::bail!("cannot predict from an empty dataset");
    }
    if settings.neighbors == 0 {
        anyhow::bail!("neighbour count must be at least 1");
    }

    let neighbors = nearest_neighbors(profile, records, settings);
    let rows: Vec<&HealthRecord> = neighbors.iter().map(|n| &records[n.index]).collect();

    // rows is non-empty, so the plain means always exist
    let avg = |f: fn(&HealthRecord) -> f64| mean(rows.iter().map(|r| f(r))).unwrap_or(0.0);

    let outcomes = PredictedOutcomes {
        overall_health_score: avg(|r| r.overall_health_score),
        doctor_visits_per_year: avg(|r| r.doctor_visits_per_year),
        digestive_issue_rate: mean(
            rows.iter()
                .filter_map(|r| r.digestive_issues_num)
                .map(f64::from),
        ),
        average_daily_calories: avg(|r| r.average_daily_calories),
        risk_score: mean(rows.iter().map(|r| score_record(r, rules).score)).unwrap_or(0.0),
    };

    tracing::debug!(
        neighbors = neighbors.len(),
        rows = records.len(),
        "prediction computed"
    );

    Ok(Prediction {
        profile: *profile,
        profile_risk: score_profile(profile, rules),
        neighbors_used: neighbors.len(),
        mean_distance: mean(neighbors.iter().map(|n| n.distance)).unwrap_or(0.0),
        outcomes,
        neighbors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::record;

    fn profile() -> Profile {
        Profile {
            age: 30.0,
            bmi: 25.0,
            fast_food_meals_per_week: 5.0,
            sleep_hours_per_day: 7.0,
            activity_hours_per_week: 3.0,
            energy_level_score: 6.0,
        }
    }

    #[test]
    fn test_distance_formula() {
        let row = record("Male", 40, 27.0, 8, 6.0, 5.0, 4, "No");
        // 0.5*10 + 2*2 + 1.5*3 + 1.5*1 + 1*2 + 1*2 = 5 + 4 + 4.5 + 1.5 + 2 + 2
        let d = distance(&profile(), &row, &SimilarityWeights::default());
        assert!((d - 19.0).abs() < 1e-9);
    }

    #[test]
    fn test_identical_row_has_zero_distance() {
        let row = record("Female", 30, 25.0, 5, 7.0, 3.0, 6, "Yes");
        let weights = SimilarityWeights::default();
        assert_eq!(distance(&profile(), &row, &weights), 0.0);
    }

    #[test]
    fn test_ties_broken_by_row_order() {
        // Rows 0..4 are all at the same distance
        let rows: Vec<HealthRecord> = (0..5)
            .map(|_| record("Male", 31, 25.0, 5, 7.0, 3.0, 6, "No"))
            .collect();
        let settings = PredictorSettings {
            neighbors: 3,
            ..Default::default()
        };
        let picked: Vec<usize> = nearest_neighbors(&profile(), &rows, &settings)
            .iter()
            .map(|n| n.index)
            .collect();
        assert_eq!(picked, vec![0, 1, 2]);
    }

    #[test]
    fn test_nearest_are_closest_first() {
        let rows = vec![
            record("Male", 60, 35.0, 14, 4.0, 0.0, 2, "Yes"),
            record("Male", 30, 25.0, 5, 7.0, 3.0, 6, "No"),
            record("Male", 35, 26.0, 6, 7.0, 3.0, 6, "No"),
        ];
        let settings = PredictorSettings {
            neighbors: 2,
            ..Default::default()
        };
        let picked: Vec<usize> = nearest_neighbors(&profile(), &rows, &settings)
            .iter()
            .map(|n| n.index)
            .collect();
        assert_eq!(picked, vec![1, 2]);
    }

    #[test]
    fn test_small_table_uses_every_row() {
        let rows = vec![
            record("Male", 30, 25.0, 5, 7.0, 3.0, 6, "Yes"),
            record("Female", 50, 30.0, 10, 5.0, 1.0, 3, "No"),
        ];
        let prediction = predict(
            &profile(),
            &rows,
            &PredictorSettings::default(),
            &RiskRules::default(),
        )
        .unwrap();
        assert_eq!(prediction.neighbors_used, 2);
        assert_eq!(prediction.outcomes.digestive_issue_rate, Some(0.5));
        assert_eq!(prediction.outcomes.overall_health_score, 6.0);
    }

    #[test]
    fn test_empty_table_is_error() {
        let result = predict(
            &profile(),
            &[],
            &PredictorSettings::default(),
            &RiskRules::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_neighbors_is_error() {
        let rows = vec![record("Male", 30, 25.0, 5, 7.0, 3.0, 6, "Yes")];
        let settings = PredictorSettings {
            neighbors: 0,
            ..Default::default()
        };
        assert!(predict(&profile(), &rows, &settings, &RiskRules::default()).is_err());
    }

    #[test]
    fn test_unknown_digestive_values_are_skipped() {
        let rows = vec![
            record("Male", 30, 25.0, 5, 7.0, 3.0, 6, "Unknown"),
            record("Male", 30, 25.0, 5, 7.0, 3.0, 6, "Unknown"),
        ];
        let prediction = predict(
            &profile(),
            &rows,
            &PredictorSettings::default(),
            &RiskRules::default(),
        )
        .unwrap();
        assert_eq!(prediction.outcomes.digestive_issue_rate, None);
    }

    #[test]
    fn test_invalid_profile_is_error() {
        let rows = vec![record("Male", 30, 25.0, 5, 7.0, 3.0, 6, "No")];
        for bad in [
            Profile {
                bmi: -1.0,
                ..profile()
            },
            Profile {
                age: f64::NAN,
                ..profile()
            },
            Profile {
                sleep_hours_per_day: 30.0,
                ..profile()
            },
        ] {
            let result = predict(
                &bad,
                &rows,
                &PredictorSettings::default(),
                &RiskRules::default(),
            );
            assert!(result.is_err());
        }
    }

    #[test]
    fn test_profile_risk_is_reported() {
        let rows = vec![record("Male", 30, 25.0, 5, 7.0, 3.0, 6, "No")];
        let prediction = predict(
            &profile(),
            &rows,
            &PredictorSettings::default(),
            &RiskRules::default(),
        )
        .unwrap();
        // BMI 25.0 -> 8, fast food 5 -> 6, sleep 7 -> 0, activity 3 -> 3, energy 6 -> 3
        assert_eq!(prediction.profile_risk.score, 20.0);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let rows: Vec<HealthRecord> = (0..120)
            .map(|i| {
                record(
                    if i % 2 == 0 { "Male" } else { "Female" },
                    18 + (i % 50),
                    18.0 + (i % 17) as f64,
                    i % 15,
                    4.0 + (i % 5) as f64,
                    (i % 9) as f64,
                    1 + (i % 10),
                    if i % 3 == 0 { "Yes" } else { "No" },
                )
            })
            .collect();
        let settings = PredictorSettings::default();
        let rules = RiskRules::default();
        let first = predict(&profile(), &rows, &settings, &rules).unwrap();
        let second = predict(&profile(), &rows, &settings, &rules).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.neighbors_used, DEFAULT_NEIGHBORS);
    }
}
