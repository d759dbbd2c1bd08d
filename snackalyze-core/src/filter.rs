//! Multi-predicate row filter
//!
//! Eight independent constraints, combined with logical AND:
//! gender (equality or `All`), fast-food meals, age, BMI, digestive issues
//! (set membership), energy score, activity hours and sleep hours (inclusive
//! ranges).
//!
//! Global invariants enforced:
//! - Filtering preserves original row order
//! - Filtering is idempotent
//! - Widening any single range never shrinks the result
//! - An empty range or empty digestive set matches nothing

use crate::dataset::{Dataset, DatasetBounds, HealthRecord, DIGESTIVE_OPTIONS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Inclusive `[min, max]` range; empty when `min > max`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    pub fn new(min: T, max: T) -> Self {
        Bounds { min, max }
    }

    pub fn contains(&self, value: T) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn is_empty(&self) -> bool {
        // NaN bounds count as empty
        matches!(
            self.min.partial_cmp(&self.max),
            None | Some(std::cmp::Ordering::Greater)
        )
    }
}

impl<T: fmt::Display> fmt::Display for Bounds<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.min, self.max)
    }
}

/// Gender constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderFilter {
    All,
    Only(String),
}

impl GenderFilter {
    /// `"All"` (any case) is the wildcard; anything else is an exact match
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("all") {
            GenderFilter::All
        } else {
            GenderFilter::Only(value.to_string())
        }
    }

    pub fn matches(&self, gender: &str) -> bool {
        match self {
            GenderFilter::All => true,
            GenderFilter::Only(wanted) => wanted == gender,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            GenderFilter::All => "All",
            GenderFilter::Only(g) => g,
        }
    }
}

/// Complete constraint set applied to the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub gender: GenderFilter,
    pub fast_food: Bounds<i64>,
    pub age: Bounds<i64>,
    pub bmi: Bounds<f64>,
    pub digestive: BTreeSet<String>,
    pub energy: Bounds<i64>,
    pub activity: Bounds<f64>,
    pub sleep: Bounds<f64>,
}

impl FilterCriteria {
    /// Criteria spanning the full data range (every row matches)
    pub fn unrestricted(bounds: &DatasetBounds) -> Self {
        FilterCriteria {
            gender: GenderFilter::All,
            fast_food: bounds.fast_food,
            age: bounds.age,
            bmi: bounds.bmi,
            digestive: default_digestive_set(),
            energy: bounds.energy,
            activity: bounds.activity,
            sleep: bounds.sleep,
        }
    }

    /// Criteria that accept any value (used when no bounds are known)
    pub fn open() -> Self {
        FilterCriteria {
            gender: GenderFilter::All,
            fast_food: Bounds::new(i64::MIN, i64::MAX),
            age: Bounds::new(i64::MIN, i64::MAX),
            bmi: Bounds::new(f64::NEG_INFINITY, f64::INFINITY),
            digestive: default_digestive_set(),
            energy: Bounds::new(i64::MIN, i64::MAX),
            activity: Bounds::new(f64::NEG_INFINITY, f64::INFINITY),
            sleep: Bounds::new(f64::NEG_INFINITY, f64::INFINITY),
        }
    }

    /// Check a single record against all eight constraints
    pub fn matches(&self, r: &HealthRecord) -> bool {
        self.gender.matches(&r.gender)
            && self.fast_food.contains(r.fast_food_meals_per_week)
            && self.age.contains(r.age)
            && self.bmi.contains(r.bmi)
            && self.digestive.contains(&r.digestive_issues)
            && self.energy.contains(r.energy_level_score)
            && self.activity.contains(r.physical_activity_hours_per_week)
            && self.sleep.contains(r.sleep_hours_per_day)
    }

    /// Indices of matching records, ascending
    pub fn select(&self, records: &[HealthRecord]) -> Vec<usize> {
        records
            .iter()
            .enumerate()
            .filter(|(_, r)| self.matches(r))
            .map(|(i, _)| i)
            .collect()
    }

    /// Matching records, in original order
    pub fn apply(&self, records: &[HealthRecord]) -> Vec<HealthRecord> {
        records
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect()
    }

    /// One-line summary of the active filters
    pub fn describe(&self) -> String {
        format!(
            "Gender: {} | Age: {} | BMI: {} | Fast Food: {} | Digestive Issues: {}",
            self.gender.label(),
            self.age,
            self.bmi,
            self.fast_food,
            describe_digestive(&self.digestive),
        )
    }
}

fn default_digestive_set() -> BTreeSet<String> {
    DIGESTIVE_OPTIONS.iter().map(|s| s.to_string()).collect()
}

/// List the digestive selection with known options first, in their canonical order
fn describe_digestive(selected: &BTreeSet<String>) -> String {
    if selected.is_empty() {
        return "none".to_string();
    }
    let mut labels: Vec<&str> = DIGESTIVE_OPTIONS
        .iter()
        .copied()
        .filter(|opt| selected.contains(*opt))
        .collect();
    labels.extend(
        selected
            .iter()
            .map(String::as_str)
            .filter(|s| !DIGESTIVE_OPTIONS.contains(s)),
    );
    labels.join(", ")
}

/// Partially specified criteria; missing bounds fall back to the data range
#[derive(Debug, Clone, Default)]
pub struct FilterOverrides {
    pub gender: Option<String>,
    pub fast_food_min: Option<i64>,
    pub fast_food_max: Option<i64>,
    pub age_min: Option<i64>,
    pub age_max: Option<i64>,
    pub bmi_min: Option<f64>,
    pub bmi_max: Option<f64>,
    pub digestive: Option<Vec<String>>,
    pub energy_min: Option<i64>,
    pub energy_max: Option<i64>,
    pub activity_min: Option<f64>,
    pub activity_max: Option<f64>,
    pub sleep_min: Option<f64>,
    pub sleep_max: Option<f64>,
}

impl FilterOverrides {
    /// Merge overrides onto the dataset's unrestricted criteria
    pub fn resolve(&self, bounds: Option<&DatasetBounds>) -> FilterCriteria {
        let base = bounds
            .map(FilterCriteria::unrestricted)
            .unwrap_or_else(FilterCriteria::open);

        FilterCriteria {
            gender: self
                .gender
                .as_deref()
                .map(GenderFilter::parse)
                .unwrap_or(base.gender),
            fast_food: Bounds::new(
                self.fast_food_min.unwrap_or(base.fast_food.min),
                self.fast_food_max.unwrap_or(base.fast_food.max),
            ),
            age: Bounds::new(
                self.age_min.unwrap_or(base.age.min),
                self.age_max.unwrap_or(base.age.max),
            ),
            bmi: Bounds::new(
                self.bmi_min.unwrap_or(base.bmi.min),
                self.bmi_max.unwrap_or(base.bmi.max),
            ),
            digestive: self
                .digestive
                .as_ref()
                .map(|values| values.iter().cloned().collect())
                .unwrap_or(base.digestive),
            energy: Bounds::new(
                self.energy_min.unwrap_or(base.energy.min),
                self.energy_max.unwrap_or(base.energy.max),
            ),
            activity: Bounds::new(
                self.activity_min.unwrap_or(base.activity.min),
                self.activity_max.unwrap_or(base.activity.max),
            ),
            sleep: Bounds::new(
                self.sleep_min.unwrap_or(base.sleep.min),
                self.sleep_max.unwrap_or(base.sleep.max),
            ),
        }
    }
}

/// Filtered view over a dataset: criteria, matching indices and rows
#[derive(Debug, Clone)]
pub struct FilteredView {
    pub criteria: FilterCriteria,
    /// Original row index of each filtered record
    pub indices: Vec<usize>,
    pub records: Vec<HealthRecord>,
    /// Row count of the unfiltered dataset
    pub total: usize,
}

impl FilteredView {
    pub fn new(dataset: &Dataset, criteria: FilterCriteria) -> Self {
        let indices = criteria.select(dataset.records());
        let records = indices
            .iter()
            .map(|&i| dataset.records()[i].clone())
            .collect();

        tracing::debug!(
            matched = indices.len(),
            total = dataset.len(),
            "filters applied"
        );
        FilteredView {
            criteria,
            indices,
            records,
            total: dataset.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
