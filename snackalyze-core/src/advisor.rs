//! Lifestyle recommendations from an external generative-text API
//!
//! The cohort summary (and optionally a personal prediction) is rendered into
//! a plain-text prompt and sent once to an OpenAI-compatible chat-completions
//! endpoint. Whatever text comes back is shown verbatim.
//!
//! Global invariants enforced:
//! - Exactly one request per recommendation, no retries
//! - Any failure degrades to `Recommendation::Unavailable`, never a panic or abort
//! - Prompt text is a pure function of its inputs

use crate::config::{DEFAULT_LLM_API_KEY_ENV, DEFAULT_LLM_ENDPOINT, DEFAULT_LLM_MODEL};
use crate::insights::CohortSummary;
use crate::predictor::Prediction;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const SYSTEM_PROMPT: &str = "You are a nutrition and lifestyle assistant. \
Give short, practical, non-diagnostic suggestions based on the summary you are given. \
Use a bulleted list of at most five items.";

/// Longest slice of an error body kept in `AdvisorError::Status`
const MAX_ERROR_BODY: usize = 200;

/// Errors raised while talking to the generative-text API
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("API key not set: environment variable {0} is missing or empty")]
    MissingApiKey(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed API response: {0}")]
    Malformed(String),
}

/// Settings for the chat-completions client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the bearer key
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        LlmSettings {
            endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            api_key_env: DEFAULT_LLM_API_KEY_ENV.to_string(),
            timeout_secs: 30,
            max_tokens: 400,
            temperature: 0.7,
        }
    }
}

/// Something that turns a prompt into text
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String, AdvisorError>;
}

/// Outcome of a recommendation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Recommendation {
    Generated { text: String },
    Unavailable { reason: String },
}

/// Blocking HTTP client for OpenAI-compatible chat-completions endpoints
#[derive(Debug, Clone)]
pub struct HttpTextGenerator {
    settings: LlmSettings,
    api_key: Option<String>,
}

impl HttpTextGenerator {
    pub fn new(settings: LlmSettings, api_key: Option<String>) -> Self {
        HttpTextGenerator { settings, api_key }
    }

    /// Read the bearer key from the environment variable named in `settings`
    pub fn from_env(settings: LlmSettings) -> Self {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        HttpTextGenerator { settings, api_key }
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.settings.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
        })
    }
}

impl TextGenerator for HttpTextGenerator {
    fn generate(&self, prompt: &str) -> Result<String, AdvisorError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AdvisorError::MissingApiKey(self.settings.api_key_env.clone()))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.settings.timeout_secs))
            .build()
            .map_err(|e| AdvisorError::Transport(e.to_string()))?;

        tracing::debug!(
            endpoint = %self.settings.endpoint,
            model = %self.settings.model,
            prompt_len = prompt.len(),
            "requesting recommendation"
        );

        let response = client
            .post(&self.settings.endpoint)
            .bearer_auth(api_key)
            .json(&self.request_body(prompt))
            .send()
            .map_err(|e| AdvisorError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| AdvisorError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(AdvisorError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        parse_completion(&body)
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Extract `choices[0].message.content` from a chat-completions body
pub fn parse_completion(body: &str) -> Result<String, AdvisorError> {
    let completion: ChatCompletion =
        serde_json::from_str(body).map_err(|e| AdvisorError::Malformed(e.to_string()))?;

    let content = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AdvisorError::Malformed("response has no choices".to_string()))?
        .message
        .content
        .map(|c| c.trim().to_string())
        .unwrap_or_default();

    if content.is_empty() {
        return Err(AdvisorError::Malformed(
            "response message has no content".to_string(),
        ));
    }
    Ok(content)
}

/// Build the prompt describing a cohort and, optionally, a personal prediction
pub fn build_prompt(summary: &CohortSummary, prediction: Option<&Prediction>) -> String {
    let avg = &summary.averages;
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Based on the following lifestyle summary of {} people, suggest healthier habits.\n\n",
        summary.record_count
    ));
    prompt.push_str(&format!(
        "Average fast food meals per week: {:.1}\n",
        avg.fast_food
    ));
    prompt.push_str(&format!("Average BMI: {:.1}\n", avg.bmi));
    prompt.push_str(&format!("Average energy: {:.1}\n", avg.energy));
    prompt.push_str(&format!("Average sleep per day: {:.1}\n", avg.sleep));
    prompt.push_str(&format!(
        "Average physical activity hours per week: {:.1}\n",
        avg.activity
    ));
    if let Some(score) = summary.average_health_score {
        prompt.push_str(&format!("Average health score: {:.1}\n", score));
    }
    prompt.push_str(&format!(
        "Risk indicator: {} ({})\n",
        summary.risk.label, summary.risk.message
    ));

    if !summary.insights.is_empty() {
        prompt.push_str("\nObservations:\n");
        for insight in &summary.insights {
            prompt.push_str(&format!("- {}\n", insight.message));
        }
    }

    if let Some(p) = prediction {
        push_profile(&mut prompt, p);
    }

    prompt
}

/// Build the prompt for a personal prediction alone, used when no cohort rows are selected
pub fn build_profile_prompt(prediction: &Prediction) -> String {
    let mut prompt = String::from("Suggest healthier habits for this personal profile.\n");
    push_profile(&mut prompt, prediction);
    prompt
}

/// Pick the prompt for whatever is available; nothing to describe yields `None`
pub fn prompt_for(
    summary: Option<&CohortSummary>,
    prediction: Option<&Prediction>,
) -> Option<String> {
    match (summary, prediction) {
        (Some(summary), prediction) => Some(build_prompt(summary, prediction)),
        (None, Some(prediction)) => Some(build_profile_prompt(prediction)),
        (None, None) => None,
    }
}

fn push_profile(prompt: &mut String, p: &Prediction) {
    let profile = &p.profile;
    prompt.push_str("\nPersonal profile:\n");
    prompt.push_str(&format!(
        "- Age {:.0}, BMI {:.1}, {:.0} fast food meals per week\n",
        profile.age, profile.bmi, profile.fast_food_meals_per_week
    ));
    prompt.push_str(&format!(
        "- {:.1} hours of sleep per day, {:.1} hours of activity per week, energy {:.0}/10\n",
        profile.sleep_hours_per_day,
        profile.activity_hours_per_week,
        profile.energy_level_score
    ));
    prompt.push_str(&format!(
        "- Health Risk Score {:.0}/100 ({})\n",
        p.profile_risk.score,
        p.profile_risk.band.as_str()
    ));
    prompt.push_str(&format!(
        "- The {} most similar people average a health score of {:.1}\n",
        p.neighbors_used, p.outcomes.overall_health_score
    ));
    prompt.push_str(&format!(
        "- They average {:.1} doctor visits per year\n",
        p.outcomes.doctor_visits_per_year
    ));
    if let Some(rate) = p.outcomes.digestive_issue_rate {
        prompt.push_str(&format!(
            "- {:.0}% of them report digestive issues\n",
            rate * 100.0
        ));
    }
}

/// Ask `generator` once for a recommendation
pub fn recommend(generator: &dyn TextGenerator, prompt: &str) -> Recommendation {
    match generator.generate(prompt) {
        Ok(text) => Recommendation::Generated { text },
        Err(e) => {
            tracing::warn!(error = %e, "recommendation unavailable");
            Recommendation::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::record;
    use crate::insights::summarize;
    use crate::predictor::{predict, PredictorSettings, Profile};
    use crate::risk::RiskRules;
    use std::cell::Cell;

    struct FakeGenerator {
        reply: Result<&'static str, &'static str>,
        calls: Cell<usize>,
    }

    impl FakeGenerator {
        fn new(reply: Result<&'static str, &'static str>) -> Self {
            FakeGenerator {
                reply,
                calls: Cell::new(0),
            }
        }
    }

    impl TextGenerator for FakeGenerator {
        fn generate(&self, _prompt: &str) -> Result<String, AdvisorError> {
            self.calls.set(self.calls.get() + 1);
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(msg) => Err(AdvisorError::Transport(msg.to_string())),
            }
        }
    }

    fn summary() -> CohortSummary {
        let rows = vec![
            record("Male", 40, 31.0, 12, 5.0, 1.0, 3, "Yes"),
            record("Female", 35, 29.0, 11, 5.5, 2.0, 4, "No"),
        ];
        summarize(&rows).unwrap()
    }

    #[test]
    fn test_prompt_mentions_cohort() {
        let prompt = build_prompt(&summary(), None);
        assert!(prompt.contains("summary of 2 people"));
        assert!(prompt.contains("Average fast food meals per week: 11.5"));
        assert!(prompt.contains("Average BMI: 30.0"));
        assert!(prompt.contains("Risk indicator: High Risk"));
        assert!(prompt.contains("Observations:"));
        assert!(!prompt.contains("Personal profile"));
    }

    #[test]
    fn test_prompt_includes_prediction() {
        let rows = vec![
            record("Male", 40, 31.0, 12, 5.0, 1.0, 3, "Yes"),
            record("Female", 35, 29.0, 11, 5.5, 2.0, 4, "No"),
        ];
        let profile = Profile {
            age: 30.0,
            bmi: 31.0,
            fast_food_meals_per_week: 12.0,
            sleep_hours_per_day: 4.0,
            activity_hours_per_week: 0.5,
            energy_level_score: 2.0,
        };
        let prediction = predict(
            &profile,
            &rows,
            &PredictorSettings::default(),
            &RiskRules::default(),
        )
        .unwrap();
        let prompt = build_prompt(&summary(), Some(&prediction));
        assert!(prompt.contains("Personal profile:"));
        assert!(prompt.contains("Health Risk Score 80/100 (high)"));
        assert!(prompt.contains("50% of them report digestive issues"));
    }

    #[test]
    fn test_profile_prompt_without_cohort() {
        let rows = vec![
            record("Male", 40, 31.0, 12, 5.0, 1.0, 3, "Yes"),
            record("Female", 35, 29.0, 11, 5.5, 2.0, 4, "No"),
        ];
        let profile = Profile {
            age: 30.0,
            bmi: 31.0,
            fast_food_meals_per_week: 12.0,
            sleep_hours_per_day: 4.0,
            activity_hours_per_week: 0.5,
            energy_level_score: 2.0,
        };
        let settings = PredictorSettings::default();
        let prediction = predict(&profile, &rows, &settings, &RiskRules::default()).unwrap();

        let prompt = build_profile_prompt(&prediction);
        assert!(prompt.starts_with("Suggest healthier habits for this personal profile."));
        assert!(prompt.contains("Personal profile:"));
        assert!(prompt.contains("- Age 30, BMI 31.0, 12 fast food meals per week"));
        assert!(!prompt.contains("Average BMI"));
        assert!(!prompt.contains("Risk indicator"));

        let cohort = summary();
        assert_eq!(
            prompt_for(None, Some(&prediction)),
            Some(build_profile_prompt(&prediction))
        );
        assert_eq!(
            prompt_for(Some(&cohort), Some(&prediction)),
            Some(build_prompt(&cohort, Some(&prediction)))
        );
        assert_eq!(
            prompt_for(Some(&cohort), None),
            Some(build_prompt(&cohort, None))
        );
        assert_eq!(prompt_for(None, None), None);
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(
            build_prompt(&summary(), None),
            build_prompt(&summary(), None)
        );
    }

    #[test]
    fn test_recommend_success() {
        let generator = FakeGenerator::new(Ok("- Cook at home more often"));
        let rec = recommend(&generator, "prompt");
        assert_eq!(
            rec,
            Recommendation::Generated {
                text: "- Cook at home more often".to_string()
            }
        );
        assert_eq!(generator.calls.get(), 1);
    }

    #[test]
    fn test_recommend_failure_is_not_retried() {
        let generator = FakeGenerator::new(Err("connection refused"));
        let rec = recommend(&generator, "prompt");
        assert_eq!(
            rec,
            Recommendation::Unavailable {
                reason: "request failed: connection refused".to_string()
            }
        );
        assert_eq!(generator.calls.get(), 1);
    }

    #[test]
    fn test_missing_key_is_unavailable() {
        let generator = HttpTextGenerator::new(LlmSettings::default(), None);
        let rec = recommend(&generator, "prompt");
        match rec {
            Recommendation::Unavailable { reason } => {
                assert!(reason.contains(DEFAULT_LLM_API_KEY_ENV));
            }
            other => panic!("expected unavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "  Drink water.\n"}}
            ]
        }"#;
        assert_eq!(parse_completion(body).unwrap(), "Drink water.");
    }

    #[test]
    fn test_parse_completion_rejects_bad_bodies() {
        for body in [
            "not json",
            r#"{"choices": []}"#,
            r#"{"choices": [{"message": {"content": null}}]}"#,
            r#"{"choices": [{"message": {"content": "   "}}]}"#,
            r#"{"error": {"message": "quota"}}"#,
        ] {
            assert!(
                matches!(parse_completion(body), Err(AdvisorError::Malformed(_))),
                "should reject {}",
                body
            );
        }
    }

    #[test]
    fn test_request_body_shape() {
        let generator = HttpTextGenerator::new(LlmSettings::default(), Some("k".into()));
        let body = generator.request_body("hello");
        assert_eq!(body["model"], DEFAULT_LLM_MODEL);
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["max_tokens"], 400);
    }

    #[test]
    fn test_recommendation_json_tag() {
        let rec = Recommendation::Unavailable {
            reason: "x".to_string(),
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(json, r#"{"status":"unavailable","reason":"x"}"#);
    }
}
