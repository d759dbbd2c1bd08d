//! Configuration file support for Snackalyze
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.snackalyzerc.json` in the working directory
//! 3. `snackalyze.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::advisor::LlmSettings;
use crate::predictor::{PredictorSettings, SimilarityWeights, DEFAULT_NEIGHBORS};
use crate::risk::{BandThresholds, RiskPoints, RiskRules, StepPoints};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Dataset path used when neither the CLI nor the config names one
pub const DEFAULT_DATA_PATH: &str = "data.csv";

/// Default chat-completions endpoint
pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LLM_API_KEY_ENV: &str = "SNACKALYZE_LLM_API_KEY";

/// Snackalyze configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnackalyzeConfig {
    /// Path to the dataset CSV (default: data.csv)
    #[serde(default)]
    pub data: Option<PathBuf>,

    /// Health Risk Score points and bands
    #[serde(default)]
    pub risk: Option<RiskConfig>,

    /// Nearest-neighbour predictor settings
    #[serde(default)]
    pub predictor: Option<PredictorConfig>,

    /// Generative-text API settings
    #[serde(default)]
    pub llm: Option<LlmConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskConfig {
    #[serde(default)]
    pub points: Option<PointsConfig>,
    #[serde(default)]
    pub bands: Option<BandConfig>,
}

/// Custom step points per factor; missing factors keep their defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointsConfig {
    /// BMI above 22 / 25 / 30 (default: 8, 15, 25)
    pub bmi: Option<StepConfig>,
    /// Fast-food meals above 3 / 6 / 10 (default: 6, 12, 20)
    pub fast_food: Option<StepConfig>,
    /// Sleep below 7 / 6 / 5 hours (default: 5, 10, 15)
    pub sleep: Option<StepConfig>,
    /// Activity below 5 / 3 / 1 hours (default: 3, 6, 10)
    pub activity: Option<StepConfig>,
    /// Energy below 7 / 5 / 3 (default: 3, 6, 10)
    pub energy: Option<StepConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    pub mild: Option<f64>,
    pub moderate: Option<f64>,
    pub severe: Option<f64>,
}

/// Custom risk band thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BandConfig {
    /// Score threshold for moderate risk (default: 30)
    pub moderate: Option<f64>,
    /// Score threshold for high risk (default: 60)
    pub high: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictorConfig {
    /// Neighbourhood size (default: 50)
    pub neighbors: Option<usize>,
    #[serde(default)]
    pub weights: Option<SimilarityWeightConfig>,
}

/// Custom distance weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimilarityWeightConfig {
    /// Default: 0.5
    pub age: Option<f64>,
    /// Default: 2.0
    pub bmi: Option<f64>,
    /// Default: 1.5
    pub fast_food: Option<f64>,
    /// Default: 1.5
    pub sleep: Option<f64>,
    /// Default: 1.0
    pub activity: Option<f64>,
    /// Default: 1.0
    pub energy: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// OpenAI-compatible chat-completions URL
    pub endpoint: Option<String>,
    pub model: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: Option<u64>,
    /// Default: 400
    pub max_tokens: Option<u32>,
    /// Default: 0.7
    pub temperature: Option<f64>,
}

/// Resolved configuration with defaults filled in
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub data_path: PathBuf,
    pub risk: RiskRules,
    pub predictor: PredictorSettings,
    pub llm: LlmSettings,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

fn resolve_steps(config: Option<&StepConfig>, default: StepPoints) -> StepPoints {
    match config {
        Some(s) => StepPoints::new(
            s.mild.unwrap_or(default.mild),
            s.moderate.unwrap_or(default.moderate),
            s.severe.unwrap_or(default.severe),
        ),
        None => default,
    }
}

impl SnackalyzeConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref risk) = self.risk {
            if let Some(ref points) = risk.points {
                for (name, steps) in [
                    ("bmi", &points.bmi),
                    ("fast_food", &points.fast_food),
                    ("sleep", &points.sleep),
                    ("activity", &points.activity),
                    ("energy", &points.energy),
                ] {
                    let Some(steps) = steps else { continue };
                    for (level, val) in [
                        ("mild", steps.mild),
                        ("moderate", steps.moderate),
                        ("severe", steps.severe),
                    ] {
                        if let Some(v) = val {
                            if v < 0.0 {
                                anyhow::bail!(
                                    "risk.points.{}.{} must be non-negative (got {})",
                                    name,
                                    level,
                                    v
                                );
                            }
                        }
                    }
                }
            }

            if let Some(ref bands) = risk.bands {
                let defaults = BandThresholds::default();
                let moderate = bands.moderate.unwrap_or(defaults.moderate);
                let high = bands.high.unwrap_or(defaults.high);

                if moderate <= 0.0 {
                    anyhow::bail!("risk.bands.moderate must be positive (got {})", moderate);
                }
                if moderate >= high {
                    anyhow::bail!(
                        "risk.bands.moderate ({}) must be less than risk.bands.high ({})",
                        moderate,
                        high
                    );
                }
                if high > 100.0 {
                    anyhow::bail!("risk.bands.high must be at most 100 (got {})", high);
                }
            }
        }

        if let Some(ref predictor) = self.predictor {
            if predictor.neighbors == Some(0) {
                anyhow::bail!("predictor.neighbors must be at least 1");
            }
            if let Some(ref w) = predictor.weights {
                for (name, val) in [
                    ("age", w.age),
                    ("bmi", w.bmi),
                    ("fast_food", w.fast_food),
                    ("sleep", w.sleep),
                    ("activity", w.activity),
                    ("energy", w.energy),
                ] {
                    if let Some(v) = val {
                        if v < 0.0 {
                            anyhow::bail!(
                                "predictor.weights.{} must be non-negative (got {})",
                                name,
                                v
                            );
                        }
                    }
                }
            }
        }

        if let Some(ref llm) = self.llm {
            if llm.timeout_secs == Some(0) {
                anyhow::bail!("llm.timeout_secs must be positive");
            }
            if llm.max_tokens == Some(0) {
                anyhow::bail!("llm.max_tokens must be positive");
            }
            if let Some(t) = llm.temperature {
                if !(0.0..=2.0).contains(&t) {
                    anyhow::bail!("llm.temperature must be between 0 and 2 (got {})", t);
                }
            }
            for (name, val) in [
                ("endpoint", &llm.endpoint),
                ("model", &llm.model),
                ("api_key_env", &llm.api_key_env),
            ] {
                if val.as_deref().is_some_and(|s| s.trim().is_empty()) {
                    anyhow::bail!("llm.{} must not be empty", name);
                }
            }
        }

        Ok(())
    }

    /// Resolve config into the form used by the library
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let default_points = RiskPoints::default();
        let points_cfg = self.risk.as_ref().and_then(|r| r.points.as_ref());
        let points = match points_cfg {
            Some(p) => RiskPoints {
                bmi: resolve_steps(p.bmi.as_ref(), default_points.bmi),
                fast_food: resolve_steps(p.fast_food.as_ref(), default_points.fast_food),
                sleep: resolve_steps(p.sleep.as_ref(), default_points.sleep),
                activity: resolve_steps(p.activity.as_ref(), default_points.activity),
                energy: resolve_steps(p.energy.as_ref(), default_points.energy),
            },
            None => default_points,
        };

        let default_bands = BandThresholds::default();
        let bands = match self.risk.as_ref().and_then(|r| r.bands.as_ref()) {
            Some(b) => BandThresholds {
                moderate: b.moderate.unwrap_or(default_bands.moderate),
                high: b.high.unwrap_or(default_bands.high),
            },
            None => default_bands,
        };

        let default_weights = SimilarityWeights::default();
        let weights = match self.predictor.as_ref().and_then(|p| p.weights.as_ref()) {
            Some(w) => SimilarityWeights {
                age: w.age.unwrap_or(default_weights.age),
                bmi: w.bmi.unwrap_or(default_weights.bmi),
                fast_food: w.fast_food.unwrap_or(default_weights.fast_food),
                sleep: w.sleep.unwrap_or(default_weights.sleep),
                activity: w.activity.unwrap_or(default_weights.activity),
                energy: w.energy.unwrap_or(default_weights.energy),
            },
            None => default_weights,
        };
        let neighbors = self
            .predictor
            .as_ref()
            .and_then(|p| p.neighbors)
            .unwrap_or(DEFAULT_NEIGHBORS);

        let llm_defaults = LlmSettings::default();
        let llm = match &self.llm {
            Some(l) => LlmSettings {
                endpoint: l.endpoint.clone().unwrap_or(llm_defaults.endpoint),
                model: l.model.clone().unwrap_or(llm_defaults.model),
                api_key_env: l.api_key_env.clone().unwrap_or(llm_defaults.api_key_env),
                timeout_secs: l.timeout_secs.unwrap_or(llm_defaults.timeout_secs),
                max_tokens: l.max_tokens.unwrap_or(llm_defaults.max_tokens),
                temperature: l.temperature.unwrap_or(llm_defaults.temperature),
            },
            None => llm_defaults,
        };

        Ok(ResolvedConfig {
            data_path: self
                .data
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
            risk: RiskRules { points, bands },
            predictor: PredictorSettings { weights, neighbors },
            llm,
            config_path: None,
        })
    }
}

/// Discover and load a config file from the working directory
///
/// Search order:
/// 1. `.snackalyzerc.json`
/// 2. `snackalyze.config.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(SnackalyzeConfig, PathBuf)>> {
    for name in [".snackalyzerc.json", "snackalyze.config.json"] {
        let path = project_root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<SnackalyzeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: SnackalyzeConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (SnackalyzeConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}
