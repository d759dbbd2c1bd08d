//! HTML report generation
//!
//! Generates a self-contained dashboard page with embedded CSS and JavaScript.
//! Charts are drawn on `<canvas>` from inline JSON, so the page works offline.

use crate::advisor::Recommendation;
use crate::filter::FilteredView;
use crate::insights::{
    cohort_averages, sleep_energy_points, CohortAverages, GroupMean, LabeledCount, LabeledMean,
    ScatterPoint,
};
use crate::report::{
    build_dashboard, build_data, build_insights, DashboardReport, DataReport, InsightsReport,
    NO_DATA_WARNING,
};
use crate::risk::{CohortRiskLevel, RiskRules};
use serde::Serialize;

/// Default output file for `snackalyze report`
pub const DEFAULT_REPORT_FILE: &str = "snackalyze-report.html";

/// Chart series embedded in the page as `window.__snkCharts`
#[derive(Serialize)]
struct ChartData<'a> {
    bmi: &'a [GroupMean],
    calories: &'a [GroupMean],
    scatter: &'a [ScatterPoint],
    digestive: &'a [LabeledCount],
    visits: &'a [LabeledMean],
}

/// Render a filtered view as a standalone HTML dashboard
pub fn render_html_report(
    view: &FilteredView,
    rules: &RiskRules,
    recommendation: Option<&Recommendation>,
) -> String {
    let dashboard = build_dashboard(view);
    let body = if view.is_empty() {
        format!(
            r#"<div class="warning">{}</div>"#,
            html_escape(NO_DATA_WARNING)
        )
    } else {
        let insights = build_insights(view);
        let data = build_data(view, rules);
        let scatter = sleep_energy_points(&view.records);
        let charts = ChartData {
            bmi: &dashboard.bmi_by_fast_food,
            calories: &dashboard.calories_by_fast_food,
            scatter: &scatter,
            digestive: &insights.digestive_distribution,
            visits: &insights.doctor_visits_by_digestive,
        };

        [
            render_summary(cohort_averages(&view.records).as_ref(), &dashboard),
            render_risk_card(&dashboard),
            render_trend_charts(),
            render_metrics(&dashboard),
            render_insights(&dashboard),
            render_outcomes(&insights),
            render_data_table(&data),
            format!(
                "<script>window.__snkCharts = {};</script>",
                embed_json(&charts)
            ),
        ]
        .join("\n")
    };
    let recommendation_html = match recommendation {
        Some(rec) => render_recommendation(rec),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Snackalyze Report</title>
    <style>{css}</style>
</head>
<body>
    <div class="container">
        {header}
        {body}
        {recommendation}
        {footer}
    </div>
    <script>{js}</script>
</body>
</html>"#,
        css = inline_css(),
        js = inline_javascript(),
        header = render_header(&dashboard),
        body = body,
        recommendation = recommendation_html,
        footer = render_footer(),
    )
}

/// Serialize for a `<script>` block; `</` is escaped so data cannot close the tag
fn embed_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/")
}

fn inline_css() -> &'static str {
    r#"
/* Reset & Base */
* {
    box-sizing: border-box;
    margin: 0;
    padding: 0;
}

body {
    font-family: system-ui, -apple-system, 'Segoe UI', sans-serif;
    line-height: 1.6;
    color: #111827;
    background: #ffffff;
}

.container {
    max-width: 1400px;
    margin: 0 auto;
    padding: 2rem;
}

/* Header */
header {
    margin-bottom: 1rem;
    padding-bottom: 1rem;
    border-bottom: 2px solid #e5e7eb;
}

header h1 {
    font-size: 2rem;
    font-weight: 700;
    margin-bottom: 0.5rem;
}

header .meta {
    color: #6b7280;
    font-size: 0.875rem;
}

.filter-bar {
    background: #f3f4f6;
    border-radius: 0.5rem;
    padding: 0.5rem 1rem;
    margin-bottom: 2rem;
    font-size: 0.875rem;
    color: #374151;
}

.warning {
    background: #fef3c7;
    border-left: 4px solid #f59e0b;
    padding: 1rem;
    border-radius: 0.5rem;
    margin-bottom: 2rem;
}

/* Summary */
.summary {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
    gap: 1rem;
    margin-bottom: 2rem;
}

.summary-card {
    background: #f9fafb;
    padding: 1rem;
    border-radius: 0.5rem;
    border-left: 4px solid #f97316;
}

.summary-card h3 {
    font-size: 0.875rem;
    font-weight: 600;
    color: #6b7280;
    margin-bottom: 0.5rem;
}

.summary-card .value {
    font-size: 1.5rem;
    font-weight: 700;
}

/* Cohort risk */
.risk-card {
    padding: 1.25rem;
    border-radius: 0.5rem;
    margin-bottom: 2rem;
    color: #ffffff;
}

.risk-card h2 {
    font-size: 1.5rem;
    margin-bottom: 0.25rem;
}

.risk-high { background: #dc2626; }
.risk-moderate { background: #f59e0b; }
.risk-low { background: #16a34a; }

/* Section */
.section {
    margin-bottom: 2rem;
}

.section h2 {
    font-size: 1.5rem;
    font-weight: 700;
    margin-bottom: 1rem;
}

.chart-grid {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(420px, 1fr));
    gap: 1.5rem;
}

.chart-label {
    font-size: 0.875rem;
    font-weight: 600;
    color: #374151;
    margin-bottom: 0.25rem;
}

canvas {
    width: 100%;
    display: block;
}

.insights li {
    list-style: none;
    padding: 0.5rem 0.75rem;
    margin-bottom: 0.5rem;
    background: #eff6ff;
    border-left: 4px solid #3b82f6;
    border-radius: 0.25rem;
}

/* Table */
.table-wrap {
    max-height: 600px;
    overflow: auto;
}

table {
    width: 100%;
    border-collapse: collapse;
    background: #ffffff;
}

thead {
    background: #f9fafb;
    position: sticky;
    top: 0;
}

th {
    padding: 0.5rem;
    text-align: left;
    font-weight: 600;
    font-size: 0.8rem;
    color: #374151;
    border-bottom: 2px solid #e5e7eb;
    cursor: pointer;
    user-select: none;
}

th.asc::after { content: ' \25B2'; }
th.desc::after { content: ' \25BC'; }

td {
    padding: 0.5rem;
    border-bottom: 1px solid #e5e7eb;
    font-size: 0.8rem;
}

.band-high { color: #dc2626; font-weight: 600; }
.band-moderate { color: #d97706; font-weight: 600; }
.band-low { color: #16a34a; }

.recommendation {
    white-space: pre-wrap;
    background: #f0fdf4;
    border-left: 4px solid #22c55e;
    padding: 1rem;
    border-radius: 0.5rem;
    font-family: inherit;
}

.recommendation.unavailable {
    background: #fef2f2;
    border-left-color: #ef4444;
}

footer {
    margin-top: 3rem;
    padding-top: 1rem;
    border-top: 1px solid #e5e7eb;
    color: #9ca3af;
    font-size: 0.75rem;
    text-align: center;
}

@media (prefers-color-scheme: dark) {
    body { background: #111827; color: #f9fafb; }
    .summary-card, thead, table { background: #1f2937; }
    .filter-bar { background: #1f2937; color: #d1d5db; }
    .insights li { background: #1e3a5f; }
    th { color: #d1d5db; border-bottom-color: #374151; }
    td { border-bottom-color: #374151; }
    .chart-label { color: #d1d5db; }
    .recommendation { background: #14532d; }
    .warning { background: #78350f; }
}
"#
}

fn inline_javascript() -> &'static str {
    r#"
(function() {
    var sortColumn = 'row';
    var sortDirection = 'asc';

    function sortTable(column) {
        var tbody = document.querySelector('#data-table tbody');
        if (!tbody) return;
        var rows = Array.from(tbody.querySelectorAll('tr'));

        if (sortColumn === column) {
            sortDirection = sortDirection === 'asc' ? 'desc' : 'asc';
        } else {
            sortColumn = column;
            sortDirection = 'desc';
        }

        document.querySelectorAll('#data-table th').forEach(function(th) { th.classList.remove('asc', 'desc'); });
        var active = document.querySelector('#data-table th[data-column="' + column + '"]');
        if (active) active.classList.add(sortDirection);

        rows.sort(function(a, b) {
            var aVal = a.dataset[column] || '', bVal = b.dataset[column] || '';
            var aNum = parseFloat(aVal), bNum = parseFloat(bVal);
            if (!isNaN(aNum) && !isNaN(bNum)) return sortDirection === 'asc' ? aNum - bNum : bNum - aNum;
            return sortDirection === 'asc' ? aVal.localeCompare(bVal) : bVal.localeCompare(aVal);
        });
        rows.forEach(function(row) { tbody.appendChild(row); });
    }

    var charts = window.__snkCharts;
    var palette = ['#f97316', '#3b82f6', '#22c55e', '#a855f7', '#ef4444', '#eab308'];

    function isDark() { return !!(window.matchMedia && window.matchMedia('(prefers-color-scheme: dark)').matches); }

    function setup(id, fallbackW) {
        var el = document.getElementById(id);
        if (!el) return null;
        el.width = el.offsetWidth || fallbackW;
        var ctx = el.getContext('2d');
        ctx.clearRect(0, 0, el.width, el.height);
        var dark = isDark();
        return { ctx: ctx, W: el.width, H: el.height, fg: dark ? '#9ca3af' : '#6b7280', grd: dark ? '#374151' : '#e5e7eb' };
    }

    function axes(c, lP, tP, cW, cH, minV, maxV, decimals) {
        var ctx = c.ctx, range = maxV - minV;
        ctx.font = '10px system-ui,sans-serif';
        for (var t = 0; t <= 4; t++) {
            var yv = minV + range * t / 4, yp = tP + cH - (t / 4) * cH;
            ctx.fillStyle = c.fg; ctx.textAlign = 'right';
            ctx.fillText(yv.toFixed(decimals), lP - 4, yp + 4);
            ctx.strokeStyle = c.grd; ctx.lineWidth = 0.5;
            ctx.beginPath(); ctx.moveTo(lP, yp); ctx.lineTo(lP + cW, yp); ctx.stroke();
        }
    }

    function span(vals) {
        var minV = Math.min.apply(null, vals), maxV = Math.max.apply(null, vals);
        if (maxV - minV < 1e-9) { minV -= 1; maxV += 1; }
        return [minV, maxV];
    }

    function drawLineChart(id, series, color, decimals) {
        var c = setup(id, 500);
        if (!c || !series || series.length === 0) return;
        var lP = 52, rP = 12, tP = 12, cW = c.W - lP - rP, cH = c.H - tP - 36, N = series.length;
        var xs = series.map(function(g) { return g.fast_food_meals; });
        var ys = series.map(function(g) { return g.mean; });
        var yr = span(ys), xr = span(xs);
        axes(c, lP, tP, cW, cH, yr[0], yr[1], decimals);
        var pts = series.map(function(g) {
            return {
                x: lP + (g.fast_food_meals - xr[0]) / (xr[1] - xr[0]) * cW,
                y: tP + cH - (g.mean - yr[0]) / (yr[1] - yr[0]) * cH
            };
        });
        var ctx = c.ctx;
        ctx.beginPath();
        pts.forEach(function(p, i) { if (i === 0) ctx.moveTo(p.x, p.y); else ctx.lineTo(p.x, p.y); });
        ctx.strokeStyle = color; ctx.lineWidth = 2; ctx.stroke();
        ctx.fillStyle = color;
        pts.forEach(function(p) { ctx.beginPath(); ctx.arc(p.x, p.y, 3, 0, Math.PI * 2); ctx.fill(); });
        ctx.fillStyle = c.fg; ctx.textAlign = 'center'; ctx.font = '9px system-ui,sans-serif';
        var skip = Math.ceil(N / 12);
        for (var i = 0; i < N; i += skip) ctx.fillText(xs[i], pts[i].x, tP + cH + 14);
        ctx.fillText('Fast food meals per week', lP + cW / 2, tP + cH + 30);
    }

    function drawScatter(id, points) {
        var c = setup(id, 900);
        if (!c || !points || points.length === 0) return;
        var lP = 40, rP = 12, tP = 12, cW = c.W - lP - rP, cH = c.H - tP - 36;
        var sr = span(points.map(function(p) { return p.sleep; }));
        var er = span(points.map(function(p) { return p.energy; }));
        var fr = span(points.map(function(p) { return p.fast_food; }));
        var ar = span(points.map(function(p) { return p.activity; }));
        axes(c, lP, tP, cW, cH, er[0], er[1], 0);
        var ctx = c.ctx;
        points.forEach(function(p) {
            var x = lP + (p.sleep - sr[0]) / (sr[1] - sr[0]) * cW;
            var y = tP + cH - (p.energy - er[0]) / (er[1] - er[0]) * cH;
            var heat = (p.fast_food - fr[0]) / (fr[1] - fr[0]);
            var r = 3 + 7 * (p.activity - ar[0]) / (ar[1] - ar[0]);
            ctx.globalAlpha = 0.6;
            ctx.fillStyle = 'hsl(' + Math.round(120 - 120 * heat) + ',80%,45%)';
            ctx.beginPath(); ctx.arc(x, y, r, 0, Math.PI * 2); ctx.fill();
        });
        ctx.globalAlpha = 1.0;
        ctx.fillStyle = c.fg; ctx.textAlign = 'center'; ctx.font = '9px system-ui,sans-serif';
        for (var t = 0; t <= 4; t++) {
            var sv = sr[0] + (sr[1] - sr[0]) * t / 4;
            ctx.fillText(sv.toFixed(1), lP + cW * t / 4, tP + cH + 14);
        }
        ctx.fillText('Sleep hours per day (colour: fast food, size: activity)', lP + cW / 2, tP + cH + 30);
    }

    function drawPie(id, slices) {
        var c = setup(id, 400);
        if (!c || !slices || slices.length === 0) return;
        var total = slices.reduce(function(s, x) { return s + x.count; }, 0);
        if (total === 0) return;
        var ctx = c.ctx, cx = c.W / 3, cy = c.H / 2, rad = Math.min(c.W / 3, c.H / 2) - 10;
        var start = -Math.PI / 2;
        slices.forEach(function(s, i) {
            var angle = s.count / total * Math.PI * 2;
            ctx.fillStyle = palette[i % palette.length];
            ctx.beginPath(); ctx.moveTo(cx, cy); ctx.arc(cx, cy, rad, start, start + angle); ctx.closePath(); ctx.fill();
            start += angle;
            var ly = 20 + i * 20;
            ctx.fillRect(c.W * 2 / 3, ly - 9, 12, 12);
            ctx.fillStyle = c.fg; ctx.textAlign = 'left'; ctx.font = '12px system-ui,sans-serif';
            ctx.fillText(s.label + ' ' + (s.count * 100 / total).toFixed(1) + '%', c.W * 2 / 3 + 18, ly + 1);
        });
    }

    function drawBar(id, bars) {
        var c = setup(id, 400);
        if (!c || !bars || bars.length === 0) return;
        var lP = 40, rP = 12, tP = 12, cW = c.W - lP - rP, cH = c.H - tP - 28, N = bars.length;
        var maxV = Math.max.apply(null, bars.map(function(b) { return b.mean; }));
        if (maxV <= 0) maxV = 1;
        axes(c, lP, tP, cW, cH, 0, maxV, 1);
        var ctx = c.ctx, bW = cW / N, gap = bW * 0.3;
        bars.forEach(function(b, i) {
            var bh = b.mean / maxV * cH, bx = lP + i * bW + gap / 2;
            ctx.fillStyle = palette[i % palette.length];
            ctx.fillRect(bx, tP + cH - bh, bW - gap, bh);
            ctx.fillStyle = c.fg; ctx.textAlign = 'center'; ctx.font = '11px system-ui,sans-serif';
            ctx.fillText(b.label, bx + (bW - gap) / 2, tP + cH + 16);
        });
    }

    function drawAll() {
        if (!charts) return;
        drawLineChart('snk-bmi-chart', charts.bmi, '#f97316', 1);
        drawLineChart('snk-calories-chart', charts.calories, '#3b82f6', 0);
        drawScatter('snk-scatter-chart', charts.scatter);
        drawPie('snk-digestive-chart', charts.digestive);
        drawBar('snk-visits-chart', charts.visits);
    }

    document.addEventListener('DOMContentLoaded', function() {
        document.querySelectorAll('#data-table th').forEach(function(th) {
            th.addEventListener('click', function() { sortTable(this.dataset.column); });
        });
        drawAll();
        window.addEventListener('resize', drawAll);
    });
})();
"#
}

fn render_header(dashboard: &DashboardReport) -> String {
    format!(
        r#"<header>
    <h1>Snackalyze Report</h1>
    <div class="meta">
        <span>Fast food consumption and lifestyle health</span> •
        <span>Rows: <strong>{count}</strong> of {total}</span>
    </div>
</header>
<div class="filter-bar">{filters}</div>"#,
        count = dashboard.scope.record_count,
        total = dashboard.scope.total_records,
        filters = html_escape(&dashboard.scope.filters),
    )
}

fn summary_card(title: &str, value: String) -> String {
    format!(
        r#"
    <div class="summary-card">
        <h3>{}</h3>
        <div class="value">{}</div>
    </div>"#,
        title, value
    )
}

fn render_summary(averages: Option<&CohortAverages>, dashboard: &DashboardReport) -> String {
    let mut cards = summary_card("Records", dashboard.scope.record_count.to_string());
    if let Some(avg) = averages {
        cards.push_str(&summary_card(
            "Avg Fast Food / Week",
            format!("{:.1}", avg.fast_food),
        ));
        cards.push_str(&summary_card("Avg BMI", format!("{:.1}", avg.bmi)));
        cards.push_str(&summary_card("Avg Sleep (h)", format!("{:.1}", avg.sleep)));
        cards.push_str(&summary_card(
            "Avg Activity (h/week)",
            format!("{:.1}", avg.activity),
        ));
    }
    format!(
        r#"<div class="summary">{}
</div>"#,
        cards
    )
}

fn render_risk_card(dashboard: &DashboardReport) -> String {
    let Some(ref risk) = dashboard.risk else {
        return String::new();
    };
    let class = match risk.level {
        CohortRiskLevel::High => "risk-high",
        CohortRiskLevel::Moderate => "risk-moderate",
        CohortRiskLevel::Low => "risk-low",
    };
    format!(
        r#"<div class="risk-card {class}">
    <h2>{label}</h2>
    <p>{message}</p>
    <p>Average fast food: {ff:.1} meals/week • Average BMI: {bmi:.1}</p>
</div>"#,
        class = class,
        label = html_escape(&risk.label),
        message = html_escape(&risk.message),
        ff = risk.avg_fast_food,
        bmi = risk.avg_bmi,
    )
}

fn render_trend_charts() -> String {
    r#"<section class="section" id="trends">
    <h2>Trends</h2>
    <div class="chart-grid">
        <div>
            <div class="chart-label">Average BMI by Fast Food Meals per Week</div>
            <canvas id="snk-bmi-chart" height="260"></canvas>
        </div>
        <div>
            <div class="chart-label">Average Daily Calories by Fast Food Meals per Week</div>
            <canvas id="snk-calories-chart" height="260"></canvas>
        </div>
    </div>
    <div class="chart-label" style="margin-top:1.5rem">Energy Level vs Sleep Hours</div>
    <canvas id="snk-scatter-chart" height="320"></canvas>
</section>"#
        .to_string()
}

fn render_metrics(dashboard: &DashboardReport) -> String {
    let mut cards = String::new();
    if let Some(ref ext) = dashboard.bmi_extremes {
        cards.push_str(&summary_card(
            "Highest Avg BMI",
            format!(
                "{:.2} <small>({} meals/week)</small>",
                ext.highest.mean, ext.highest.fast_food_meals
            ),
        ));
        cards.push_str(&summary_card(
            "Lowest Avg BMI",
            format!(
                "{:.2} <small>({} meals/week)</small>",
                ext.lowest.mean, ext.lowest.fast_food_meals
            ),
        ));
    }
    if let Some(energy) = dashboard.average_energy {
        cards.push_str(&summary_card("Avg Energy Level", format!("{:.2}", energy)));
    }
    format!(
        r#"<section class="section" id="metrics">
    <h2>Key Metrics</h2>
    <div class="summary">{}
    </div>
</section>"#,
        cards
    )
}

fn render_insights(dashboard: &DashboardReport) -> String {
    let items: String = dashboard
        .insights
        .iter()
        .map(|i| format!("\n        <li>{}</li>", html_escape(&i.message)))
        .collect();
    format!(
        r#"<section class="section" id="insights">
    <h2>Insights</h2>
    <ul class="insights">{}
    </ul>
</section>"#,
        items
    )
}

fn render_outcomes(insights: &InsightsReport) -> String {
    let health = insights
        .average_health_score
        .map(|s| summary_card("Avg Overall Health Score", format!("{:.2}", s)))
        .unwrap_or_default();
    format!(
        r#"<section class="section" id="outcomes">
    <h2>Digestive Health and Doctor Visits</h2>
    <div class="chart-grid">
        <div>
            <div class="chart-label">Digestive Issues Distribution</div>
            <canvas id="snk-digestive-chart" height="240"></canvas>
        </div>
        <div>
            <div class="chart-label">Average Doctor Visits per Year by Digestive Issues</div>
            <canvas id="snk-visits-chart" height="240"></canvas>
        </div>
    </div>
    <div class="summary" style="margin-top:1.5rem">{}
    </div>
</section>"#,
        health
    )
}

fn render_data_table(data: &DataReport) -> String {
    let mut rows = String::new();
    for r in &data.rows {
        let rec = &r.record;
        let band = r.risk.band.as_str();
        rows.push_str(&format!(
            r#"
            <tr data-row="{row}" data-gender="{gender}" data-age="{age}" data-bmi="{bmi}" data-ff="{ff}" data-sleep="{sleep}" data-activity="{act}" data-energy="{energy}" data-digestive="{dig}" data-score="{score}">
                <td>{row}</td><td>{gender}</td><td>{age}</td><td>{bmi:.1}</td><td>{ff}</td><td>{cal:.0}</td><td>{sleep:.1}</td><td>{act:.1}</td><td>{energy}</td><td>{dig}</td><td>{visits:.1}</td><td>{health:.1}</td><td class="band-{band}">{score:.0}</td><td class="band-{band}">{band}</td>
            </tr>"#,
            row = r.row,
            gender = html_escape(&rec.gender),
            age = rec.age,
            bmi = rec.bmi,
            ff = rec.fast_food_meals_per_week,
            cal = rec.average_daily_calories,
            sleep = rec.sleep_hours_per_day,
            act = rec.physical_activity_hours_per_week,
            energy = rec.energy_level_score,
            dig = html_escape(&rec.digestive_issues),
            visits = rec.doctor_visits_per_year,
            health = rec.overall_health_score,
            score = r.risk.score,
            band = band,
        ));
    }

    format!(
        r#"<section class="section" id="data">
    <h2>Filtered Data ({count} rows)</h2>
    <div class="table-wrap">
    <table id="data-table">
        <thead>
            <tr>
                <th data-column="row">Row</th><th data-column="gender">Gender</th><th data-column="age">Age</th><th data-column="bmi">BMI</th><th data-column="ff">Fast Food</th><th>Calories</th><th data-column="sleep">Sleep</th><th data-column="activity">Activity</th><th data-column="energy">Energy</th><th data-column="digestive">Digestive</th><th>Visits</th><th>Health</th><th data-column="score">Risk Score</th><th data-column="score">Band</th>
            </tr>
        </thead>
        <tbody>{rows}
        </tbody>
    </table>
    </div>
</section>"#,
        count = data.rows.len(),
        rows = rows,
    )
}

fn render_recommendation(recommendation: &Recommendation) -> String {
    let (class, text) = match recommendation {
        Recommendation::Generated { text } => ("recommendation", text.as_str()),
        Recommendation::Unavailable { reason } => ("recommendation unavailable", reason.as_str()),
    };
    format!(
        r#"<section class="section" id="recommendations">
    <h2>Personalized Recommendations</h2>
    <pre class="{}">{}</pre>
</section>"#,
        class,
        html_escape(text)
    )
}

fn render_footer() -> String {
    r#"<footer>
    <p>Generated by Snackalyze</p>
</footer>"#
        .to_string()
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::record;
    use crate::dataset::Dataset;
    use crate::filter::FilterOverrides;

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            record("Male", 25, 24.0, 3, 7.5, 4.0, 7, "No"),
            record("Female", 41, 31.0, 12, 4.0, 0.5, 2, "Yes"),
            record("Male", 58, 28.0, 12, 6.0, 2.0, 5, "Yes"),
        ])
    }

    fn view(ds: &Dataset, overrides: FilterOverrides) -> FilteredView {
        FilteredView::new(ds, overrides.resolve(ds.bounds().as_ref()))
    }

    #[test]
    fn test_report_is_self_contained() {
        let ds = dataset();
        let html = render_html_report(&view(&ds, Default::default()), &RiskRules::default(), None);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<style>"));
        assert!(!html.contains("<link"));
        assert!(!html.contains("src=\"http"));
        for id in [
            "snk-bmi-chart",
            "snk-calories-chart",
            "snk-scatter-chart",
            "snk-digestive-chart",
            "snk-visits-chart",
            "data-table",
        ] {
            assert!(html.contains(&format!("id=\"{}\"", id)), "missing {}", id);
        }
        assert!(html.contains("window.__snkCharts = {"));
        assert!(!html.contains("recommendations"));
    }

    #[test]
    fn test_risk_card_and_table() {
        let ds = dataset();
        let html = render_html_report(&view(&ds, Default::default()), &RiskRules::default(), None);
        // avg fast food 9, avg BMI 27.67 -> moderate
        assert!(html.contains("risk-card risk-moderate"));
        assert!(html.contains(r#"<td class="band-high">80</td>"#));
    }

    #[test]
    fn test_empty_view_shows_warning_only() {
        let ds = dataset();
        let v = view(
            &ds,
            FilterOverrides {
                gender: Some("Other".to_string()),
                ..Default::default()
            },
        );
        let html = render_html_report(&v, &RiskRules::default(), None);
        assert!(html.contains(NO_DATA_WARNING));
        assert!(!html.contains("<table"));
        assert!(!html.contains("window.__snkCharts = "));
    }

    #[test]
    fn test_recommendation_is_escaped() {
        let ds = dataset();
        let rec = Recommendation::Generated {
            text: "<script>alert('x')</script> & eat greens".to_string(),
        };
        let html = render_html_report(
            &view(&ds, Default::default()),
            &RiskRules::default(),
            Some(&rec),
        );
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; eat greens"));
        assert!(!html.contains("<script>alert"));
    }

    #[test]
    fn test_unavailable_recommendation_is_shown() {
        let ds = dataset();
        let rec = Recommendation::Unavailable {
            reason: "API key not set".to_string(),
        };
        let html = render_html_report(
            &view(&ds, Default::default()),
            &RiskRules::default(),
            Some(&rec),
        );
        assert!(html.contains(r#"<pre class="recommendation unavailable">API key not set</pre>"#));
    }

    #[test]
    fn test_embedded_json_cannot_close_script() {
        let row = record("</script><b>", 30, 22.0, 2, 8.0, 5.0, 8, "No");
        let ds = Dataset::from_records(vec![row]);
        let html = render_html_report(&view(&ds, Default::default()), &RiskRules::default(), None);
        assert!(!html.contains("</script><b>"));
        assert!(html.contains("<\\/script><b>"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let ds = dataset();
        let a = render_html_report(&view(&ds, Default::default()), &RiskRules::default(), None);
        let b = render_html_report(&view(&ds, Default::default()), &RiskRules::default(), None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&#39;");
    }
}
