//! Dataset loading and export
//!
//! Reads the fixed-schema health CSV into memory and derives the numeric
//! digestive-issue flag.
//!
//! Global invariants enforced:
//! - Row order is file order and never changes after load
//! - Unknown extra columns are ignored; missing schema columns are an error
//! - Export writes the same header for empty and non-empty record sets

use crate::filter::Bounds;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

/// Default file name for filtered exports
pub const DEFAULT_EXPORT_FILE: &str = "filtered_snackalyze_data.csv";

/// Accepted values of the `Digestive_Issues` column
pub const DIGESTIVE_OPTIONS: [&str; 2] = ["Yes", "No"];

/// Export column order (schema columns followed by the derived flag)
const EXPORT_HEADER: [&str; 12] = [
    "Gender",
    "Age",
    "BMI",
    "Fast_Food_Meals_Per_Week",
    "Average_Daily_Calories",
    "Sleep_Hours_Per_Day",
    "Energy_Level_Score",
    "Physical_Activity_Hours_Per_Week",
    "Digestive_Issues",
    "Doctor_Visits_Per_Year",
    "Overall_Health_Score",
    "Digestive_Issues_Num",
];

/// One row of the health dataset
///
/// Field order matches `EXPORT_HEADER`; the CSV writer relies on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Age")]
    pub age: i64,
    #[serde(rename = "BMI")]
    pub bmi: f64,
    #[serde(rename = "Fast_Food_Meals_Per_Week")]
    pub fast_food_meals_per_week: i64,
    #[serde(rename = "Average_Daily_Calories")]
    pub average_daily_calories: f64,
    #[serde(rename = "Sleep_Hours_Per_Day")]
    pub sleep_hours_per_day: f64,
    #[serde(rename = "Energy_Level_Score")]
    pub energy_level_score: i64,
    #[serde(rename = "Physical_Activity_Hours_Per_Week")]
    pub physical_activity_hours_per_week: f64,
    #[serde(rename = "Digestive_Issues")]
    pub digestive_issues: String,
    #[serde(rename = "Doctor_Visits_Per_Year")]
    pub doctor_visits_per_year: f64,
    #[serde(rename = "Overall_Health_Score")]
    pub overall_health_score: f64,
    /// Derived: 1 for "Yes", 0 for "No", empty otherwise
    #[serde(rename = "Digestive_Issues_Num", skip_deserializing, default)]
    pub digestive_issues_num: Option<u8>,
}

impl HealthRecord {
    /// Recompute derived columns from the raw ones
    pub fn derive_columns(&mut self) {
        self.digestive_issues_num = digestive_flag(&self.digestive_issues);
    }
}

/// Map the categorical digestive-issue value to its numeric flag
pub fn digestive_flag(value: &str) -> Option<u8> {
    match value {
        "Yes" => Some(1),
        "No" => Some(0),
        _ => None,
    }
}

/// Min/max of every filterable numeric column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetBounds {
    pub fast_food: Bounds<i64>,
    pub age: Bounds<i64>,
    pub bmi: Bounds<f64>,
    pub energy: Bounds<i64>,
    pub activity: Bounds<f64>,
    pub sleep: Bounds<f64>,
}

/// In-memory copy of the health dataset
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<HealthRecord>,
}

impl Dataset {
    /// Load a dataset from a CSV file
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open dataset: {}", path.display()))?;
        let dataset = Self::from_reader(file)
            .with_context(|| format!("failed to parse dataset: {}", path.display()))?;

        tracing::debug!(
            records = dataset.len(),
            path = %path.display(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    /// Parse CSV from any reader (header row required)
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        for (index, result) in csv_reader.deserialize::<HealthRecord>().enumerate() {
            let row = index + 1;
            let record = result.with_context(|| format!("invalid record at data row {}", row))?;
            records.push(record);
        }

        Ok(Self::from_records(records))
    }

    /// Build a dataset from already-parsed records
    pub fn from_records(mut records: Vec<HealthRecord>) -> Self {
        for record in &mut records {
            record.derive_columns();
        }
        Dataset { records }
    }

    pub fn records(&self) -> &[HealthRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct genders in first-appearance order
    pub fn genders(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for record in &self.records {
            if !seen.iter().any(|g| g == &record.gender) {
                seen.push(record.gender.clone());
            }
        }
        seen
    }

    /// Column ranges used as unrestricted filter defaults
    ///
    /// Returns `None` for an empty dataset.
    pub fn bounds(&self) -> Option<DatasetBounds> {
        let records = &self.records;
        Some(DatasetBounds {
            fast_food: int_bounds(records.iter().map(|r| r.fast_food_meals_per_week))?,
            age: int_bounds(records.iter().map(|r| r.age))?,
            bmi: float_bounds(records.iter().map(|r| r.bmi))?,
            energy: int_bounds(records.iter().map(|r| r.energy_level_score))?,
            activity: float_bounds(records.iter().map(|r| r.physical_activity_hours_per_week))?,
            sleep: float_bounds(records.iter().map(|r| r.sleep_hours_per_day))?,
        })
    }
}

fn int_bounds(values: impl Iterator<Item = i64>) -> Option<Bounds<i64>> {
    values.fold(None, |acc, v| match acc {
        None => Some(Bounds::new(v, v)),
        Some(b) => Some(Bounds::new(b.min.min(v), b.max.max(v))),
    })
}

fn float_bounds(values: impl Iterator<Item = f64>) -> Option<Bounds<f64>> {
    values
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some(Bounds::new(v, v)),
            Some(b) => Some(Bounds::new(b.min.min(v), b.max.max(v))),
        })
}

/// Write records as CSV, header first
///
/// Includes the derived `Digestive_Issues_Num` column.
pub fn write_csv<W: Write>(records: &[HealthRecord], writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    csv_writer
        .write_record(EXPORT_HEADER)
        .context("failed to write CSV header")?;
    for record in records {
        csv_writer
            .serialize(record)
            .context("failed to write CSV record")?;
    }
    csv_writer.flush().context("failed to flush CSV output")?;
    Ok(())
}

/// Render records as a CSV string
pub fn to_csv_string(records: &[HealthRecord]) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(records, &mut buffer)?;
    String::from_utf8(buffer).context("CSV output is not valid UTF-8")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a record with neutral outcome columns
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn record(
        gender: &str,
        age: i64,
        bmi: f64,
        fast_food: i64,
        sleep: f64,
        activity: f64,
        energy: i64,
        digestive: &str,
    ) -> HealthRecord {
        HealthRecord {
            gender: gender.to_string(),
            age,
            bmi,
            fast_food_meals_per_week: fast_food,
            average_daily_calories: 2000.0 + fast_food as f64 * 100.0,
            sleep_hours_per_day: sleep,
            energy_level_score: energy,
            physical_activity_hours_per_week: activity,
            digestive_issues: digestive.to_string(),
            doctor_visits_per_year: 2.0,
            overall_health_score: 6.0,
            digestive_issues_num: digestive_flag(digestive),
        }
    }

    const SAMPLE: &str = "\
Gender,Age,BMI,Fast_Food_Meals_Per_Week,Average_Daily_Calories,Sleep_Hours_Per_Day,Energy_Level_Score,Physical_Activity_Hours_Per_Week,Digestive_Issues,Doctor_Visits_Per_Year,Overall_Health_Score
Male,34,27.5,8,2650,6.5,5,2.5,Yes,4,5
Female,22,21.3,2,1900,8.0,8,6.0,No,1,8
";

    #[test]
    fn test_parse_sample_and_derive_flag() {
        let dataset = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(dataset.len(), 2);
        let first = &dataset.records()[0];
        assert_eq!(first.gender, "Male");
        assert_eq!(first.fast_food_meals_per_week, 8);
        assert_eq!(first.bmi, 27.5);
        assert_eq!(first.digestive_issues_num, Some(1));
        assert_eq!(dataset.records()[1].digestive_issues_num, Some(0));
    }

    #[test]
    fn test_unknown_digestive_value_has_no_flag() {
        assert_eq!(digestive_flag("Sometimes"), None);
        assert_eq!(digestive_flag("yes"), None);
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let csv = "\
Person_ID,Gender,Age,BMI,Fast_Food_Meals_Per_Week,Average_Daily_Calories,Sleep_Hours_Per_Day,Energy_Level_Score,Physical_Activity_Hours_Per_Week,Digestive_Issues,Doctor_Visits_Per_Year,Overall_Health_Score
17,Other,40,24.0,4,2200,7.0,6,3.0,No,2,7
";
        let dataset = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records()[0].gender, "Other");
    }

    #[test]
    fn test_missing_column_is_error() {
        let csv = "Gender,Age\nMale,30\n";
        assert!(Dataset::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_bounds_cover_all_rows() {
        let dataset = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        let bounds = dataset.bounds().unwrap();
        assert_eq!(bounds.age, Bounds::new(22, 34));
        assert_eq!(bounds.fast_food, Bounds::new(2, 8));
        assert_eq!(bounds.bmi, Bounds::new(21.3, 27.5));
        assert_eq!(bounds.sleep, Bounds::new(6.5, 8.0));
    }

    #[test]
    fn test_empty_dataset_has_no_bounds() {
        let dataset = Dataset::from_records(Vec::new());
        assert!(dataset.bounds().is_none());
        assert!(dataset.genders().is_empty());
    }

    #[test]
    fn test_genders_first_appearance_order() {
        let dataset = Dataset::from_records(vec![
            record("Female", 30, 22.0, 2, 7.0, 4.0, 6, "No"),
            record("Male", 30, 22.0, 2, 7.0, 4.0, 6, "No"),
            record("Female", 31, 23.0, 3, 7.0, 4.0, 6, "Yes"),
        ]);
        assert_eq!(dataset.genders(), vec!["Female", "Male"]);
    }

    #[test]
    fn test_export_round_trips_through_loader() {
        let dataset = Dataset::from_reader(SAMPLE.as_bytes()).unwrap();
        let csv = to_csv_string(dataset.records()).unwrap();
        assert!(csv.starts_with("Gender,Age,BMI,"));
        let header = csv.lines().next().unwrap();
        assert!(header.ends_with("Digestive_Issues_Num"));

        let reloaded = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(reloaded.records(), dataset.records());
    }

    #[test]
    fn test_export_empty_still_has_header() {
        let csv = to_csv_string(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("Gender,"));
    }
}
