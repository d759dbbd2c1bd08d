//! Derived views over a filtered record set
//!
//! Grouped chart series, summary metrics and the rule-based insight generator.
//!
//! Global invariants enforced:
//! - Views are strictly derived (never stored, always computed)
//! - Deterministic ordering (ascending group keys, explicit tie-breaks)
//! - Empty input yields empty series / `None`, never NaN

use crate::dataset::HealthRecord;
use crate::risk::{assess_cohort, CohortRisk};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mean of a column for one weekly fast-food meal count
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupMean {
    pub fast_food_meals: i64,
    pub mean: f64,
}

/// Mean of a column for one categorical label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledMean {
    pub label: String,
    pub mean: f64,
}

/// Count of rows for one categorical label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledCount {
    pub label: String,
    pub count: usize,
}

/// Highest and lowest mean-BMI fast-food groups
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BmiExtremes {
    pub highest: GroupMean,
    pub lowest: GroupMean,
}

/// Averages of the lifestyle columns driving the insight rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CohortAverages {
    pub fast_food: f64,
    pub bmi: f64,
    pub energy: f64,
    pub sleep: f64,
    pub activity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    HighFastFood,
    Overweight,
    LowEnergy,
    ShortSleep,
    LowActivity,
    Balanced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub message: String,
}

/// Scatter point for the energy-vs-sleep chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub sleep: f64,
    pub energy: i64,
    pub fast_food: i64,
    pub activity: f64,
    pub age: i64,
    pub gender: String,
}

/// Everything known about a filtered cohort in one place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub record_count: usize,
    pub averages: CohortAverages,
    pub risk: CohortRisk,
    pub insights: Vec<Insight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_health_score: Option<f64>,
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Mean of `column` per fast-food meal count, ascending by meal count
pub fn mean_by_fast_food(
    records: &[HealthRecord],
    column: impl Fn(&HealthRecord) -> f64,
) -> Vec<GroupMean> {
    let mut groups: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = groups
            .entry(record.fast_food_meals_per_week)
            .or_insert((0.0, 0));
        entry.0 += column(record);
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(fast_food_meals, (sum, count))| GroupMean {
            fast_food_meals,
            mean: sum / count as f64,
        })
        .collect()
}

/// Mean BMI per fast-food meal count
pub fn bmi_by_fast_food(records: &[HealthRecord]) -> Vec<GroupMean> {
    mean_by_fast_food(records, |r| r.bmi)
}

/// Mean daily calories per fast-food meal count
pub fn calories_by_fast_food(records: &[HealthRecord]) -> Vec<GroupMean> {
    mean_by_fast_food(records, |r| r.average_daily_calories)
}

/// Highest and lowest group in a series; the first group in key order wins ties
pub fn bmi_extremes(series: &[GroupMean]) -> Option<BmiExtremes> {
    let first = *series.first()?;
    let mut extremes = BmiExtremes {
        highest: first,
        lowest: first,
    };
    for group in &series[1..] {
        if group.mean > extremes.highest.mean {
            extremes.highest = *group;
        }
        if group.mean < extremes.lowest.mean {
            extremes.lowest = *group;
        }
    }
    Some(extremes)
}

/// Lifestyle averages of a cohort (None when empty)
pub fn cohort_averages(records: &[HealthRecord]) -> Option<CohortAverages> {
    Some(CohortAverages {
        fast_food: mean(records.iter().map(|r| r.fast_food_meals_per_week as f64))?,
        bmi: mean(records.iter().map(|r| r.bmi))?,
        energy: mean(records.iter().map(|r| r.energy_level_score as f64))?,
        sleep: mean(records.iter().map(|r| r.sleep_hours_per_day))?,
        activity: mean(records.iter().map(|r| r.physical_activity_hours_per_week))?,
    })
}

/// Apply the insight rules, in fixed order
///
/// Falls back to a single balanced-lifestyle insight when no rule fires.
pub fn generate_insights(averages: &CohortAverages) -> Vec<Insight> {
    let rules: [(bool, InsightKind, &str); 5] = [
        (
            averages.fast_food > 9.0,
            InsightKind::HighFastFood,
            "High fast food consumption is observed, which is linked to higher BMI and lower energy levels.",
        ),
        (
            averages.bmi > 27.0,
            InsightKind::Overweight,
            "Average BMI is in the overweight range, indicating increased health risk.",
        ),
        (
            averages.energy < 5.0,
            InsightKind::LowEnergy,
            "Energy levels are low, possibly due to poor sleep or unhealthy diet patterns.",
        ),
        (
            averages.sleep < 6.0,
            InsightKind::ShortSleep,
            "Sleep duration is below recommended levels, which can affect metabolism and focus.",
        ),
        (
            averages.activity < 3.0,
            InsightKind::LowActivity,
            "Physical activity is quite low, increasing long-term health risks.",
        ),
    ];

    let mut insights: Vec<Insight> = rules
        .iter()
        .filter(|(fired, _, _)| *fired)
        .map(|(_, kind, message)| Insight {
            kind: *kind,
            message: message.to_string(),
        })
        .collect();

    if insights.is_empty() {
        insights.push(Insight {
            kind: InsightKind::Balanced,
            message: "Great job! Your lifestyle indicators look balanced and healthy.".to_string(),
        });
    }
    insights
}

/// Row counts per digestive-issue value, most frequent first
pub fn digestive_distribution(records: &[HealthRecord]) -> Vec<LabeledCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.digestive_issues.as_str()).or_insert(0) += 1;
    }
    let mut sorted: Vec<LabeledCount> = counts
        .into_iter()
        .map(|(label, count)| LabeledCount {
            label: label.to_string(),
            count,
        })
        .collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    sorted
}

/// Mean yearly doctor visits per digestive-issue value, ascending by label
pub fn doctor_visits_by_digestive(records: &[HealthRecord]) -> Vec<LabeledMean> {
    let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = groups
            .entry(record.digestive_issues.as_str())
            .or_insert((0.0, 0));
        entry.0 += record.doctor_visits_per_year;
        entry.1 += 1;
    }
    groups
        .into_iter()
        .map(|(label, (sum, count))| LabeledMean {
            label: label.to_string(),
            mean: sum / count as f64,
        })
        .collect()
}

/// Mean overall health score (0-10)
pub fn average_health_score(records: &[HealthRecord]) -> Option<f64> {
    mean(records.iter().map(|r| r.overall_health_score))
}

/// Mean energy level score
pub fn average_energy(records: &[HealthRecord]) -> Option<f64> {
    mean(records.iter().map(|r| r.energy_level_score as f64))
}

/// Points for the energy-vs-sleep scatter chart
pub fn sleep_energy_points(records: &[HealthRecord]) -> Vec<ScatterPoint> {
    records
        .iter()
        .map(|r| ScatterPoint {
            sleep: r.sleep_hours_per_day,
            energy: r.energy_level_score,
            fast_food: r.fast_food_meals_per_week,
            activity: r.physical_activity_hours_per_week,
            age: r.age,
            gender: r.gender.clone(),
        })
        .collect()
}

/// Summarize a cohort: averages, risk indicator and insights
pub fn summarize(records: &[HealthRecord]) -> Option<CohortSummary> {
    let averages = cohort_averages(records)?;
    Some(CohortSummary {
        record_count: records.len(),
        risk: assess_cohort(averages.fast_food, averages.bmi),
        insights: generate_insights(&averages),
        average_health_score: average_health_score(records),
        averages,
    })
}
