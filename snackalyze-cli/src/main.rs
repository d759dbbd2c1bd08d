//! Snackalyze CLI - fast food and lifestyle health dashboard

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output
// - Reports go to stdout, status lines and logs go to stderr

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use snackalyze_core::advisor::{self, HttpTextGenerator, Recommendation};
use snackalyze_core::dataset::{self, DEFAULT_EXPORT_FILE};
use snackalyze_core::filter::FilterOverrides;
use snackalyze_core::html::{render_html_report, DEFAULT_REPORT_FILE};
use snackalyze_core::insights::summarize;
use snackalyze_core::predictor::{predict, PredictorSettings};
use snackalyze_core::report::{self, NO_DATA_WARNING};
use snackalyze_core::{config, Dataset, FilteredView, Prediction, Profile, ResolvedConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const PROFILE_FLAGS: &str = "--age --bmi --fast-food --sleep --activity --energy";

#[derive(Parser)]
#[command(name = "snackalyze")]
#[command(about = "Explore how fast food and lifestyle habits relate to health outcomes")]
#[command(version = env!("SNACKALYZE_VERSION"))]
struct Cli {
    /// Path to the dataset CSV (overrides config file, default: data.csv)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Path to config file (default: auto-discover)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cohort risk, BMI and calorie trends, key metrics and insights
    Dashboard {
        #[command(flatten)]
        filters: FilterArgs,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Digestive issue distribution, doctor visits and health score
    Insights {
        #[command(flatten)]
        filters: FilterArgs,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Filtered rows with their Health Risk Score
    Data {
        #[command(flatten)]
        filters: FilterArgs,

        /// Output format (default: text on stdout, inferred from the extension with --output)
        #[arg(long)]
        format: Option<DataFormat>,

        /// Write to a file instead of stdout (bare flag: filtered_snackalyze_data.csv)
        #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_EXPORT_FILE)]
        output: Option<PathBuf>,
    },
    /// Rank filtered rows by Health Risk Score, highest first
    Risk {
        #[command(flatten)]
        filters: FilterArgs,

        /// Show only top N rows
        #[arg(long)]
        top: Option<usize>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Predict outcomes for a profile from the most similar people
    Predict {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Neighbourhood size (overrides config file, default: 50)
        #[arg(long)]
        neighbors: Option<usize>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Ask the generative-text API for lifestyle recommendations
    Recommend {
        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        profile: ProfileArgs,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Write a self-contained HTML dashboard
    Report {
        #[command(flatten)]
        filters: FilterArgs,

        /// Output file path
        #[arg(long, default_value = DEFAULT_REPORT_FILE)]
        output: PathBuf,

        /// Include generated recommendations (calls the external API)
        #[arg(long)]
        recommend: bool,
    },
    /// Validate or show the configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without loading data
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

/// Row filters; a missing bound defaults to the dataset minimum or maximum
#[derive(Args, Clone, Default)]
struct FilterArgs {
    /// Gender to keep ("All" keeps everyone)
    #[arg(long)]
    gender: Option<String>,

    /// Minimum fast food meals per week
    #[arg(long)]
    fast_food_min: Option<i64>,

    /// Maximum fast food meals per week
    #[arg(long)]
    fast_food_max: Option<i64>,

    #[arg(long)]
    age_min: Option<i64>,

    #[arg(long)]
    age_max: Option<i64>,

    #[arg(long)]
    bmi_min: Option<f64>,

    #[arg(long)]
    bmi_max: Option<f64>,

    /// Digestive issue answers to keep, comma separated (default: Yes,No)
    #[arg(long, value_delimiter = ',')]
    digestive: Option<Vec<String>>,

    #[arg(long)]
    energy_min: Option<i64>,

    #[arg(long)]
    energy_max: Option<i64>,

    /// Minimum physical activity hours per week
    #[arg(long)]
    activity_min: Option<f64>,

    /// Maximum physical activity hours per week
    #[arg(long)]
    activity_max: Option<f64>,

    /// Minimum sleep hours per day
    #[arg(long)]
    sleep_min: Option<f64>,

    /// Maximum sleep hours per day
    #[arg(long)]
    sleep_max: Option<f64>,
}

impl From<FilterArgs> for FilterOverrides {
    fn from(args: FilterArgs) -> Self {
        FilterOverrides {
            gender: args.gender,
            fast_food_min: args.fast_food_min,
            fast_food_max: args.fast_food_max,
            age_min: args.age_min,
            age_max: args.age_max,
            bmi_min: args.bmi_min,
            bmi_max: args.bmi_max,
            digestive: args.digestive,
            energy_min: args.energy_min,
            energy_max: args.energy_max,
            activity_min: args.activity_min,
            activity_max: args.activity_max,
            sleep_min: args.sleep_min,
            sleep_max: args.sleep_max,
        }
    }
}

/// Hand-entered lifestyle profile
#[derive(Args, Clone, Default)]
struct ProfileArgs {
    #[arg(long)]
    age: Option<f64>,

    #[arg(long)]
    bmi: Option<f64>,

    /// Fast food meals per week
    #[arg(long)]
    fast_food: Option<f64>,

    /// Sleep hours per day
    #[arg(long)]
    sleep: Option<f64>,

    /// Physical activity hours per week
    #[arg(long)]
    activity: Option<f64>,

    /// Energy level score (1-10)
    #[arg(long)]
    energy: Option<f64>,
}

impl ProfileArgs {
    /// All six flags, none of them, or an error naming the missing ones
    fn to_profile(&self) -> anyhow::Result<Option<Profile>> {
        let fields = [
            ("--age", self.age),
            ("--bmi", self.bmi),
            ("--fast-food", self.fast_food),
            ("--sleep", self.sleep),
            ("--activity", self.activity),
            ("--energy", self.energy),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect();

        if missing.len() == fields.len() {
            return Ok(None);
        }
        if !missing.is_empty() {
            anyhow::bail!("incomplete profile, missing: {}", missing.join(", "));
        }

        Ok(Some(Profile {
            age: self.age.unwrap_or_default(),
            bmi: self.bmi.unwrap_or_default(),
            fast_food_meals_per_week: self.fast_food.unwrap_or_default(),
            sleep_hours_per_day: self.sleep.unwrap_or_default(),
            activity_hours_per_week: self.activity.unwrap_or_default(),
            energy_level_score: self.energy.unwrap_or_default(),
        }))
    }

    fn require_profile(&self) -> anyhow::Result<Profile> {
        match self.to_profile()? {
            Some(profile) => Ok(profile),
            None => anyhow::bail!("a profile is required: {}", PROFILE_FLAGS),
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum DataFormat {
    Text,
    Json,
    Csv,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let data = cli.data.as_deref();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Dashboard { filters, format } => {
            let (_, dataset) = load_session(data, config_path)?;
            let view = apply_filters(&dataset, filters);
            let dashboard = report::build_dashboard(&view);
            match format {
                OutputFormat::Text => print!("{}", report::render_dashboard_text(&dashboard)),
                OutputFormat::Json => println!("{}", report::render_json(&dashboard)),
            }
        }
        Commands::Insights { filters, format } => {
            let (_, dataset) = load_session(data, config_path)?;
            let view = apply_filters(&dataset, filters);
            let insights = report::build_insights(&view);
            match format {
                OutputFormat::Text => print!("{}", report::render_insights_text(&insights)),
                OutputFormat::Json => println!("{}", report::render_json(&insights)),
            }
        }
        Commands::Data {
            filters,
            format,
            output,
        } => {
            let (config, dataset) = load_session(data, config_path)?;
            let view = apply_filters(&dataset, filters);
            let rendered = match export_format(format, output.as_deref()) {
                DataFormat::Text => {
                    report::render_data_text(&report::build_data(&view, &config.risk))
                }
                DataFormat::Json => format!(
                    "{}\n",
                    report::render_json(&report::build_data(&view, &config.risk))
                ),
                DataFormat::Csv => {
                    if view.is_empty() {
                        eprintln!("{}", NO_DATA_WARNING);
                    }
                    dataset::to_csv_string(&view.records)?
                }
            };

            match output {
                Some(path) => {
                    write_atomic(&path, &rendered)?;
                    eprintln!("Exported {} rows to {}", view.len(), path.display());
                }
                None => print!("{}", rendered),
            }
        }
        Commands::Risk {
            filters,
            top,
            format,
        } => {
            let (config, dataset) = load_session(data, config_path)?;
            let view = apply_filters(&dataset, filters);
            let ranking = report::build_risk_ranking(&view, &config.risk, top);
            match format {
                OutputFormat::Text => print!("{}", report::render_risk_text(&ranking)),
                OutputFormat::Json => println!("{}", report::render_json(&ranking)),
            }
        }
        Commands::Predict {
            profile,
            neighbors,
            format,
        } => {
            let profile = profile.require_profile()?;
            let (config, dataset) = load_session(data, config_path)?;
            let prediction = run_prediction(&config, &dataset, &profile, neighbors)?;
            match format {
                OutputFormat::Text => print!("{}", report::render_prediction_text(&prediction)),
                OutputFormat::Json => println!("{}", report::render_json(&prediction)),
            }
        }
        Commands::Recommend {
            filters,
            profile,
            format,
        } => {
            let profile = profile.to_profile()?;
            let (config, dataset) = load_session(data, config_path)?;
            let view = apply_filters(&dataset, filters);
            let prediction = profile
                .map(|p| run_prediction(&config, &dataset, &p, None))
                .transpose()?;

            // An empty cohort still gets advice when a personal profile was given
            let summary = summarize(&view.records);
            let recommendation = advisor::prompt_for(summary.as_ref(), prediction.as_ref())
                .map(|prompt| run_recommendation(&config, &prompt));

            let page = report::build_recommendation_report(&view, recommendation);
            match format {
                OutputFormat::Text => {
                    print!("{}", report::render_recommendation_report_text(&page))
                }
                OutputFormat::Json => println!("{}", report::render_json(&page)),
            }
        }
        Commands::Report {
            filters,
            output,
            recommend,
        } => {
            let (config, dataset) = load_session(data, config_path)?;
            let view = apply_filters(&dataset, filters);

            let mut recommendation = None;
            if recommend {
                if let Some(summary) = summarize(&view.records) {
                    let prompt = advisor::build_prompt(&summary, None);
                    recommendation = Some(run_recommendation(&config, &prompt));
                }
            }

            let html = render_html_report(&view, &config.risk, recommendation.as_ref());
            write_atomic(&output, &html)?;
            eprintln!("HTML report written to: {}", output.display());
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                let explicit = path.as_deref().or(config_path);
                let resolved = config::load_and_resolve(&project_root, explicit);

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let explicit = path.as_deref().or(config_path);
                let resolved = config::load_and_resolve(&project_root, explicit)
                    .context("failed to load configuration")?;
                print_config(&resolved, data);
            }
        },
    }

    Ok(())
}

/// Install the stderr log subscriber; `-v` flags win over RUST_LOG
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve configuration and load the dataset it points at
fn load_session(
    data: Option<&Path>,
    config_path: Option<&Path>,
) -> anyhow::Result<(ResolvedConfig, Dataset)> {
    let project_root = std::env::current_dir()?;
    let config = config::load_and_resolve(&project_root, config_path)
        .context("failed to load configuration")?;

    if let Some(ref p) = config.config_path {
        eprintln!("Using config: {}", p.display());
    }

    // CLI flag overrides config file value
    let data_path = data
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.data_path.clone());
    if !data_path.exists() {
        anyhow::bail!("Dataset does not exist: {}", data_path.display());
    }

    let dataset = Dataset::load(&data_path)?;
    tracing::info!(records = dataset.len(), "dataset ready");
    Ok((config, dataset))
}

fn apply_filters(dataset: &Dataset, filters: FilterArgs) -> FilteredView {
    let criteria = FilterOverrides::from(filters).resolve(dataset.bounds().as_ref());
    FilteredView::new(dataset, criteria)
}

fn run_prediction(
    config: &ResolvedConfig,
    dataset: &Dataset,
    profile: &Profile,
    neighbors: Option<usize>,
) -> anyhow::Result<Prediction> {
    let settings = PredictorSettings {
        neighbors: neighbors.unwrap_or(config.predictor.neighbors),
        ..config.predictor
    };
    predict(profile, dataset.records(), &settings, &config.risk).context("prediction failed")
}

fn run_recommendation(config: &ResolvedConfig, prompt: &str) -> Recommendation {
    let generator = HttpTextGenerator::from_env(config.llm.clone());

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Generating recommendations...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let recommendation = advisor::recommend(&generator, prompt);
    spinner.finish_and_clear();
    recommendation
}

/// An explicit --format wins; a file export otherwise follows its extension, defaulting to CSV
fn export_format(format: Option<DataFormat>, output: Option<&Path>) -> DataFormat {
    if let Some(format) = format {
        return format;
    }
    let Some(path) = output else {
        return DataFormat::Text;
    };
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => DataFormat::Json,
        Some(ext) if ext.eq_ignore_ascii_case("txt") => DataFormat::Text,
        _ => DataFormat::Csv,
    }
}

fn print_config(resolved: &ResolvedConfig, data: Option<&Path>) {
    let risk = &resolved.risk;
    let predictor = &resolved.predictor;
    let llm = &resolved.llm;

    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!(
        "  Data: {}",
        data.unwrap_or(resolved.data_path.as_path()).display()
    );
    println!();
    println!("Risk points (mild / moderate / severe):");
    for (name, steps) in [
        ("bmi", &risk.points.bmi),
        ("fast_food", &risk.points.fast_food),
        ("sleep", &risk.points.sleep),
        ("activity", &risk.points.activity),
        ("energy", &risk.points.energy),
    ] {
        println!(
            "  {}: {} / {} / {}",
            name, steps.mild, steps.moderate, steps.severe
        );
    }
    println!();
    println!("Risk bands:");
    println!("  moderate: {}", risk.bands.moderate);
    println!("  high: {}", risk.bands.high);
    println!();
    println!("Predictor:");
    println!("  neighbors: {}", predictor.neighbors);
    println!("  weights:");
    println!("    age: {}", predictor.weights.age);
    println!("    bmi: {}", predictor.weights.bmi);
    println!("    fast_food: {}", predictor.weights.fast_food);
    println!("    sleep: {}", predictor.weights.sleep);
    println!("    activity: {}", predictor.weights.activity);
    println!("    energy: {}", predictor.weights.energy);
    println!();
    println!("LLM:");
    println!("  endpoint: {}", llm.endpoint);
    println!("  model: {}", llm.model);
    println!(
        "  api_key_env: {} ({})",
        llm.api_key_env,
        if std::env::var_os(&llm.api_key_env).is_some() {
            "set"
        } else {
            "not set"
        }
    );
    println!("  timeout_secs: {}", llm.timeout_secs);
    println!("  max_tokens: {}", llm.max_tokens);
    println!("  temperature: {}", llm.temperature);
}

/// Write a file with the atomic write pattern (temp + rename)
fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    use std::fs;

    // Create parent directories if needed
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    fs::write(&temp_path, contents)
        .with_context(|| format!("Failed to write temporary file: {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temporary file to: {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_data(args: &[&str]) -> (Option<DataFormat>, Option<PathBuf>) {
        let argv = ["snackalyze", "data"].iter().chain(args).copied();
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Data { format, output, .. } => (format, output),
            _ => panic!("expected the data command"),
        }
    }

    #[test]
    fn test_bare_output_exports_csv() {
        let (format, output) = parse_data(&["--output"]);
        assert_eq!(format, None);
        assert_eq!(output, Some(PathBuf::from(DEFAULT_EXPORT_FILE)));
        assert_eq!(export_format(format, output.as_deref()), DataFormat::Csv);
    }

    #[test]
    fn test_output_extension_picks_format() {
        let (format, output) = parse_data(&["--output", "rows.json"]);
        assert_eq!(export_format(format, output.as_deref()), DataFormat::Json);

        let (format, output) = parse_data(&["--output", "rows.txt"]);
        assert_eq!(export_format(format, output.as_deref()), DataFormat::Text);

        let (format, output) = parse_data(&["--output", "exports/rows"]);
        assert_eq!(export_format(format, output.as_deref()), DataFormat::Csv);
    }

    #[test]
    fn test_explicit_format_wins() {
        let (format, output) = parse_data(&["--format", "text", "--output"]);
        assert_eq!(export_format(format, output.as_deref()), DataFormat::Text);

        let (format, output) = parse_data(&["--format", "json", "--output", "rows.csv"]);
        assert_eq!(export_format(format, output.as_deref()), DataFormat::Json);
    }

    #[test]
    fn test_stdout_defaults_to_text() {
        let (format, output) = parse_data(&[]);
        assert_eq!(output, None);
        assert_eq!(export_format(format, output.as_deref()), DataFormat::Text);
    }

    #[test]
    fn test_profile_flags_all_or_nothing() {
        assert!(ProfileArgs::default().to_profile().unwrap().is_none());
        let partial = ProfileArgs {
            age: Some(30.0),
            ..Default::default()
        };
        let err = partial.to_profile().unwrap_err().to_string();
        assert!(err.contains("--bmi"));
        assert!(ProfileArgs::default().require_profile().is_err());
    }
}
