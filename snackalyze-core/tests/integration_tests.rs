//! Integration tests for loading, filtering, reporting and export

use snackalyze_core::dataset::{to_csv_string, Dataset};
use snackalyze_core::filter::{FilterOverrides, FilteredView, GenderFilter};
use snackalyze_core::html::render_html_report;
use snackalyze_core::insights::summarize;
use snackalyze_core::predictor::{predict, PredictorSettings};
use snackalyze_core::report::{self, NO_DATA_WARNING};
use snackalyze_core::{config, load_filtered, Profile, RiskRules};
use std::fs;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load(name: &str) -> Dataset {
    Dataset::load(&fixture_path(name)).unwrap()
}

fn filtered(dataset: &Dataset, overrides: FilterOverrides) -> FilteredView {
    FilteredView::new(dataset, overrides.resolve(dataset.bounds().as_ref()))
}

#[test]
fn test_load_small_fixture() {
    let dataset = load("small.csv");
    assert_eq!(dataset.len(), 6);
    assert_eq!(dataset.genders(), vec!["Male", "Female"]);

    let bounds = dataset.bounds().unwrap();
    assert_eq!((bounds.fast_food.min, bounds.fast_food.max), (1, 12));
    assert_eq!((bounds.age.min, bounds.age.max), (19, 58));
    assert_eq!((bounds.sleep.min, bounds.sleep.max), (4.0, 8.5));

    let flags: Vec<Option<u8>> = dataset
        .records()
        .iter()
        .map(|r| r.digestive_issues_num)
        .collect();
    assert_eq!(
        flags,
        vec![Some(0), Some(1), Some(1), Some(0), Some(0), Some(1)]
    );
}

#[test]
fn test_missing_file_reports_path() {
    let err = Dataset::load(&fixture_path("does-not-exist.csv")).unwrap_err();
    assert!(format!("{:#}", err).contains("does-not-exist.csv"));
}

#[test]
fn test_load_filtered_by_gender() {
    let criteria = {
        let dataset = load("small.csv");
        let mut c = FilterOverrides::default().resolve(dataset.bounds().as_ref());
        c.gender = GenderFilter::parse("Female");
        c
    };
    let (dataset, view) = load_filtered(&fixture_path("small.csv"), &criteria).unwrap();
    assert_eq!(view.total, dataset.len());
    assert_eq!(view.indices, vec![1, 3, 4]);
}

#[test]
fn test_digestive_filter() {
    let dataset = load("small.csv");
    let view = filtered(
        &dataset,
        FilterOverrides {
            digestive: Some(vec!["Yes".to_string()]),
            ..Default::default()
        },
    );
    assert_eq!(view.indices, vec![1, 2, 5]);
}

#[test]
fn test_risk_ranking_on_fixture() {
    let dataset = load("small.csv");
    let view = filtered(&dataset, FilterOverrides::default());
    let ranking = report::build_risk_ranking(&view, &RiskRules::default(), None);

    let order: Vec<(usize, f64)> = ranking.rows.iter().map(|r| (r.row, r.risk.score)).collect();
    assert_eq!(
        order,
        vec![
            (1, 80.0),
            (2, 49.0),
            (5, 41.0),
            (4, 20.0),
            (0, 11.0),
            (3, 0.0)
        ]
    );
}

#[test]
fn test_export_round_trip() {
    let dataset = load("small.csv");
    let view = filtered(
        &dataset,
        FilterOverrides {
            gender: Some("Female".to_string()),
            ..Default::default()
        },
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("filtered.csv");
    fs::write(&path, to_csv_string(&view.records).unwrap()).unwrap();

    let reloaded = Dataset::load(&path).unwrap();
    assert_eq!(reloaded.records(), view.records.as_slice());

    let header = fs::read_to_string(&path).unwrap();
    assert!(header
        .lines()
        .next()
        .unwrap()
        .ends_with("Overall_Health_Score,Digestive_Issues_Num"));
}

#[test]
fn test_empty_selection_everywhere() {
    let dataset = load("small.csv");
    let view = filtered(
        &dataset,
        FilterOverrides {
            bmi_min: Some(40.0),
            ..Default::default()
        },
    );
    assert!(view.is_empty());
    assert!(summarize(&view.records).is_none());

    let text = report::render_dashboard_text(&report::build_dashboard(&view));
    assert!(text.contains(NO_DATA_WARNING));
    assert!(text.contains("Records: 0 of 6"));

    let html = render_html_report(&view, &RiskRules::default(), None);
    assert!(html.contains(NO_DATA_WARNING));

    let csv = to_csv_string(&view.records).unwrap();
    assert_eq!(csv.lines().count(), 1);
}

#[test]
fn test_prediction_on_sample() {
    let dataset = load("health_sample.csv");
    assert_eq!(dataset.len(), 120);

    let profile = Profile {
        age: 35.0,
        bmi: 27.0,
        fast_food_meals_per_week: 8.0,
        sleep_hours_per_day: 6.5,
        activity_hours_per_week: 4.0,
        energy_level_score: 6.0,
    };
    let prediction = predict(
        &profile,
        dataset.records(),
        &PredictorSettings::default(),
        &RiskRules::default(),
    )
    .unwrap();

    assert_eq!(prediction.neighbors_used, 50);
    assert!(prediction
        .neighbors
        .windows(2)
        .all(|w| w[0].distance <= w[1].distance));
    assert!((0.0..=1.0).contains(&prediction.outcomes.digestive_issue_rate.unwrap()));
    assert!((0.0..=100.0).contains(&prediction.outcomes.risk_score));
}

#[test]
fn test_config_changes_scoring() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(".snackalyzerc.json"),
        r#"{"risk": {"points": {"bmi": {"severe": 40}}, "bands": {"moderate": 10, "high": 45}}}"#,
    )
    .unwrap();
    let resolved = config::load_and_resolve(dir.path(), None).unwrap();

    let dataset = load("small.csv");
    let view = filtered(&dataset, FilterOverrides::default());
    let scored = report::score_rows(&view, &resolved.risk);

    // Row 1: 40 + 20 + 15 + 10 + 10, clamped
    assert_eq!(scored[1].risk.score, 95.0);
    // Row 2 scores 49 which is high under the custom bands
    assert_eq!(scored[2].risk.band.as_str(), "high");
    // Row 0 scores 11 which is moderate under the custom bands
    assert_eq!(scored[0].risk.band.as_str(), "moderate");
}

#[test]
fn test_full_html_report() {
    let dataset = load("health_sample.csv");
    let view = filtered(&dataset, FilterOverrides::default());
    let html = render_html_report(&view, &RiskRules::default(), None);
    assert!(html.contains("Rows: <strong>120</strong> of 120"));
    assert_eq!(html.matches("<tr data-row=").count(), 120);
}
