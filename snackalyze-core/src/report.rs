//! Reporting and output generation
//!
//! One report type per dashboard page, each rendered as plain text or JSON.
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs
//! - An empty filtered set renders only the no-data warning

use crate::advisor::Recommendation;
use crate::dataset::HealthRecord;
use crate::filter::FilteredView;
use crate::insights::{
    average_energy, average_health_score, bmi_by_fast_food, bmi_extremes, calories_by_fast_food,
    digestive_distribution, doctor_visits_by_digestive, summarize, BmiExtremes, GroupMean, Insight,
    LabeledCount, LabeledMean,
};
use crate::predictor::Prediction;
use crate::risk::{score_record, CohortRisk, HealthRiskScore, RiskRules};
use serde::Serialize;

/// Shown instead of every section when no row survives the filters
pub const NO_DATA_WARNING: &str = "No data available for the selected filters. Try adjusting them.";

/// Header shared by every page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportScope {
    pub filters: String,
    pub record_count: usize,
    pub total_records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ReportScope {
    fn from_view(view: &FilteredView) -> Self {
        ReportScope {
            filters: view.criteria.describe(),
            record_count: view.len(),
            total_records: view.total,
            warning: view.is_empty().then(|| NO_DATA_WARNING.to_string()),
        }
    }

    fn is_empty(&self) -> bool {
        self.warning.is_some()
    }
}

/// Main dashboard page: chart series, cohort risk and insights
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    #[serde(flatten)]
    pub scope: ReportScope,
    pub bmi_by_fast_food: Vec<GroupMean>,
    pub calories_by_fast_food: Vec<GroupMean>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<CohortRisk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bmi_extremes: Option<BmiExtremes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_energy: Option<f64>,
    pub insights: Vec<Insight>,
}

/// Insights page: digestive distribution and health outcomes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightsReport {
    #[serde(flatten)]
    pub scope: ReportScope,
    pub digestive_distribution: Vec<LabeledCount>,
    pub doctor_visits_by_digestive: Vec<LabeledMean>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_health_score: Option<f64>,
}

/// A filtered row with its original position and Health Risk Score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRow {
    /// Zero-based row index in the source file
    pub row: usize,
    #[serde(flatten)]
    pub record: HealthRecord,
    pub risk: HealthRiskScore,
}

/// Data explorer page: filtered rows with risk scores
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataReport {
    #[serde(flatten)]
    pub scope: ReportScope,
    pub rows: Vec<ScoredRow>,
}

/// Recommendations page: the filter scope plus whatever the advisor returned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationReport {
    #[serde(flatten)]
    pub scope: ReportScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
}

pub fn build_dashboard(view: &FilteredView) -> DashboardReport {
    let scope = ReportScope::from_view(view);
    let bmi_series = bmi_by_fast_food(&view.records);
    let summary = summarize(&view.records);

    DashboardReport {
        scope,
        bmi_extremes: bmi_extremes(&bmi_series),
        bmi_by_fast_food: bmi_series,
        calories_by_fast_food: calories_by_fast_food(&view.records),
        average_energy: average_energy(&view.records),
        insights: summary
            .as_ref()
            .map(|s| s.insights.clone())
            .unwrap_or_default(),
        risk: summary.map(|s| s.risk),
    }
}

pub fn build_insights(view: &FilteredView) -> InsightsReport {
    InsightsReport {
        scope: ReportScope::from_view(view),
        digestive_distribution: digestive_distribution(&view.records),
        doctor_visits_by_digestive: doctor_visits_by_digestive(&view.records),
        average_health_score: average_health_score(&view.records),
    }
}

/// Score every filtered row, keeping file order
pub fn score_rows(view: &FilteredView, rules: &RiskRules) -> Vec<ScoredRow> {
    view.indices
        .iter()
        .zip(&view.records)
        .map(|(&row, record)| ScoredRow {
            row,
            record: record.clone(),
            risk: score_record(record, rules),
        })
        .collect()
}

pub fn build_data(view: &FilteredView, rules: &RiskRules) -> DataReport {
    DataReport {
        scope: ReportScope::from_view(view),
        rows: score_rows(view, rules),
    }
}

/// Filtered rows ranked by risk, optionally cut to the first `top`
pub fn build_risk_ranking(
    view: &FilteredView,
    rules: &RiskRules,
    top: Option<usize>,
) -> DataReport {
    DataReport {
        scope: ReportScope::from_view(view),
        rows: rank_by_risk(score_rows(view, rules), top),
    }
}

pub fn build_recommendation_report(
    view: &FilteredView,
    recommendation: Option<Recommendation>,
) -> RecommendationReport {
    RecommendationReport {
        scope: ReportScope::from_view(view),
        recommendation,
    }
}

/// Sort rows deterministically: score descending, then source row ascending
pub fn rank_by_risk(mut rows: Vec<ScoredRow>, top: Option<usize>) -> Vec<ScoredRow> {
    rows.sort_by(|a, b| {
        b.risk
            .score
            .total_cmp(&a.risk.score)
            .then_with(|| a.row.cmp(&b.row))
    });
    if let Some(n) = top {
        rows.truncate(n);
    }
    rows
}

fn render_scope(output: &mut String, title: &str, scope: &ReportScope) {
    output.push_str(&format!("{}\n", title));
    output.push_str(&format!("Filters: {}\n", scope.filters));
    output.push_str(&format!(
        "Records: {} of {}\n",
        scope.record_count, scope.total_records
    ));
    if let Some(ref warning) = scope.warning {
        output.push('\n');
        output.push_str(&format!("{}\n", warning));
    }
}

/// Render the dashboard page as text
pub fn render_dashboard_text(report: &DashboardReport) -> String {
    let mut output = String::new();
    render_scope(&mut output, "Snackalyze Dashboard", &report.scope);
    if report.scope.is_empty() {
        return output;
    }

    if let Some(ref risk) = report.risk {
        output.push('\n');
        output.push_str(&format!(
            "Risk Indicator: {} (avg fast food {:.1}/week, avg BMI {:.1})\n",
            risk.label, risk.avg_fast_food, risk.avg_bmi
        ));
        output.push_str(&format!("  {}\n", risk.message));
    }

    output.push('\n');
    if let Some(ref ext) = report.bmi_extremes {
        output.push_str(&format!(
            "Highest BMI: {:.2} at {} fast food meals/week\n",
            ext.highest.mean, ext.highest.fast_food_meals
        ));
        output.push_str(&format!(
            "Lowest BMI:  {:.2} at {} fast food meals/week\n",
            ext.lowest.mean, ext.lowest.fast_food_meals
        ));
    }
    if let Some(energy) = report.average_energy {
        output.push_str(&format!("Average Energy Level: {:.2}\n", energy));
    }

    output.push('\n');
    output.push_str("BMI and calories by fast food meals per week\n");
    output.push_str(&format!(
        "{:<8} {:<10} {}\n",
        "MEALS", "AVG BMI", "AVG CALORIES"
    ));
    // Both series group the same rows, so their keys line up
    for (bmi, cal) in report
        .bmi_by_fast_food
        .iter()
        .zip(&report.calories_by_fast_food)
    {
        output.push_str(&format!(
            "{:<8} {:<10} {:.1}\n",
            bmi.fast_food_meals,
            format!("{:.2}", bmi.mean),
            cal.mean
        ));
    }

    if !report.insights.is_empty() {
        output.push('\n');
        output.push_str("Insights\n");
        for insight in &report.insights {
            output.push_str(&format!("- {}\n", insight.message));
        }
    }

    output
}

/// Render the insights page as text
pub fn render_insights_text(report: &InsightsReport) -> String {
    let mut output = String::new();
    render_scope(&mut output, "Snackalyze Insights", &report.scope);
    if report.scope.is_empty() {
        return output;
    }

    let total: usize = report.digestive_distribution.iter().map(|c| c.count).sum();
    output.push('\n');
    output.push_str("Digestive Issues Distribution\n");
    output.push_str(&format!("{:<12} {:<8} {}\n", "ANSWER", "COUNT", "SHARE"));
    for entry in &report.digestive_distribution {
        let share = if total > 0 {
            entry.count as f64 * 100.0 / total as f64
        } else {
            0.0
        };
        output.push_str(&format!(
            "{} {:<8} {:.1}%\n",
            truncate_or_pad(&entry.label, 12),
            entry.count,
            share
        ));
    }

    output.push('\n');
    output.push_str("Doctor Visits by Digestive Issues\n");
    output.push_str(&format!("{:<12} {}\n", "ANSWER", "AVG VISITS/YEAR"));
    for entry in &report.doctor_visits_by_digestive {
        output.push_str(&format!(
            "{} {:.2}\n",
            truncate_or_pad(&entry.label, 12),
            entry.mean
        ));
    }

    if let Some(score) = report.average_health_score {
        output.push('\n');
        output.push_str(&format!("Average Overall Health Score: {:.2}\n", score));
    }

    output
}

/// Render the data explorer page as a text table
pub fn render_data_text(report: &DataReport) -> String {
    let mut output = String::new();
    render_scope(&mut output, "Snackalyze Data", &report.scope);
    if report.scope.is_empty() {
        return output;
    }

    output.push('\n');
    output.push_str(&format!(
        "{:<6} {:<8} {:<4} {:<6} {:<4} {:<8} {:<6} {:<6} {:<6} {:<6} {:<6} {:<6} {:<6} {}\n",
        "ROW",
        "GENDER",
        "AGE",
        "BMI",
        "FF",
        "KCAL",
        "SLEEP",
        "ACT",
        "ENERGY",
        "DIGEST",
        "VISITS",
        "HEALTH",
        "RISK",
        "BAND"
    ));
    for r in &report.rows {
        let rec = &r.record;
        output.push_str(&format!(
            "{:<6} {:<8} {:<4} {:<6} {:<4} {:<8} {:<6} {:<6} {:<6} {:<6} {:<6} {:<6} {:<6} {}\n",
            r.row,
            truncate_or_pad(&rec.gender, 8),
            rec.age,
            format!("{:.1}", rec.bmi),
            rec.fast_food_meals_per_week,
            format!("{:.0}", rec.average_daily_calories),
            format!("{:.1}", rec.sleep_hours_per_day),
            format!("{:.1}", rec.physical_activity_hours_per_week),
            rec.energy_level_score,
            truncate_or_pad(&rec.digestive_issues, 6),
            format!("{:.1}", rec.doctor_visits_per_year),
            format!("{:.1}", rec.overall_health_score),
            format!("{:.0}", r.risk.score),
            r.risk.band.as_str()
        ));
    }

    output
}

/// Render a risk ranking with per-factor points
pub fn render_risk_text(report: &DataReport) -> String {
    let mut output = String::new();
    render_scope(&mut output, "Snackalyze Health Risk Scores", &report.scope);
    if report.scope.is_empty() {
        return output;
    }

    output.push('\n');
    output.push_str(&format!(
        "{:<6} {:<6} {:<10} {:<5} {:<5} {:<6} {:<5} {}\n",
        "ROW", "SCORE", "BAND", "BMI", "FF", "SLEEP", "ACT", "ENERGY"
    ));
    for r in &report.rows {
        let f = &r.risk.factors;
        output.push_str(&format!(
            "{:<6} {:<6} {:<10} {:<5} {:<5} {:<6} {:<5} {}\n",
            r.row,
            format!("{:.0}", r.risk.score),
            r.risk.band.as_str(),
            f.bmi,
            f.fast_food,
            f.sleep,
            f.activity,
            f.energy
        ));
    }
    if report.rows.len() < report.scope.record_count {
        output.push_str(&format!(
            "\nShowing top {} of {} filtered rows\n",
            report.rows.len(),
            report.scope.record_count
        ));
    }

    output
}

/// Render a personal prediction as text
pub fn render_prediction_text(prediction: &Prediction) -> String {
    let mut output = String::new();
    let p = &prediction.profile;
    let risk = &prediction.profile_risk;
    let out = &prediction.outcomes;

    output.push_str("Personalized Health Prediction\n");
    output.push_str(&format!(
        "Profile: age {}, BMI {:.1}, {} fast food meals/week, {:.1} h sleep/day\n",
        p.age, p.bmi, p.fast_food_meals_per_week, p.sleep_hours_per_day
    ));
    output.push_str(&format!(
        "         {:.1} h activity/week, energy {}\n",
        p.activity_hours_per_week, p.energy_level_score
    ));
    output.push('\n');
    output.push_str(&format!(
        "Health Risk Score: {:.0}/100 ({})\n",
        risk.score,
        risk.band.as_str()
    ));
    output.push_str(&format!(
        "  BMI {}, fast food {}, sleep {}, activity {}, energy {}\n",
        risk.factors.bmi,
        risk.factors.fast_food,
        risk.factors.sleep,
        risk.factors.activity,
        risk.factors.energy
    ));
    output.push('\n');
    output.push_str(&format!(
        "Based on the {} most similar people (mean distance {:.2}):\n",
        prediction.neighbors_used, prediction.mean_distance
    ));
    output.push_str(&format!(
        "  Overall health score:   {:.2}\n",
        out.overall_health_score
    ));
    output.push_str(&format!(
        "  Doctor visits per year: {:.2}\n",
        out.doctor_visits_per_year
    ));
    let digestive = match out.digestive_issue_rate {
        Some(rate) => format!("{:.1}%", rate * 100.0),
        None => "n/a".to_string(),
    };
    output.push_str(&format!("  Digestive issues:       {}\n", digestive));
    output.push_str(&format!(
        "  Average daily calories: {:.0}\n",
        out.average_daily_calories
    ));
    output.push_str(&format!(
        "  Average risk score:     {:.1}\n",
        out.risk_score
    ));

    output
}

/// Render a recommendation as text
pub fn render_recommendation_text(recommendation: &Recommendation) -> String {
    match recommendation {
        Recommendation::Generated { text } => format!("Recommendations\n\n{}\n", text),
        Recommendation::Unavailable { reason } => {
            format!("Recommendations unavailable: {}\n", reason)
        }
    }
}

/// Render the recommendations page; a personal recommendation still shows under the no-data warning
pub fn render_recommendation_report_text(report: &RecommendationReport) -> String {
    let mut output = String::new();
    render_scope(&mut output, "Snackalyze Recommendations", &report.scope);
    if let Some(ref recommendation) = report.recommendation {
        output.push('\n');
        output.push_str(&render_recommendation_text(recommendation));
    }
    output
}

/// Render any report as pretty JSON
pub fn render_json<T: Serialize>(report: &T) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}
