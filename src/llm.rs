//! Text generation backends and the sample-message service built on them.

use std::process::Command;
use std::time::Duration;

use chrono::Local;
use once_cell::sync::Lazy;
use serde_json::json;

use crate::config::{LlmConfig, LlmProvider};
use crate::error::{NaaradError, Result};
use crate::preferences::{AiFollowUpQuestion, Alert};
use crate::prompt::{self, SampleMessage};
use crate::taxonomy::CategoryKey;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Generation can be slow; give it more room than plain page fetches
const LLM_TIMEOUT_SECS: u64 = 60;

static LLM_AGENT: Lazy<ureq::Agent> = Lazy::new(|| {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(LLM_TIMEOUT_SECS)))
        .http_status_as_error(false)
        .build()
        .into()
});

/// Anything that turns a prompt into text
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Google Gemini `generateContent` with JSON output
pub struct GeminiGenerator {
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            GEMINI_BASE_URL,
            urlencoding::encode(&self.model),
            urlencoding::encode(&self.api_key)
        )
    }
}

impl TextGenerator for GeminiGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseMimeType": "application/json" }
        });

        tracing::debug!(model = %self.model, "calling gemini");
        let response = LLM_AGENT.post(&self.endpoint()).send_json(&body)?;
        let status = response.status();
        let text = response.into_body().read_to_string()?;

        if !status.is_success() {
            return Err(NaaradError::LlmError(gemini_error_message(&text, status.as_u16())));
        }

        let value: serde_json::Value = serde_json::from_str(&text)?;
        value["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| NaaradError::LlmError("No text in Gemini response".into()))
    }
}

fn gemini_error_message(body: &str, status: u16) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| format!("Gemini returned HTTP {}", status))
}

/// Local `claude` CLI in print mode
pub struct ClaudeCliGenerator;

impl TextGenerator for ClaudeCliGenerator {
    fn generate(&self, prompt: &str) -> Result<String> {
        let system_prompt = "You write sample WhatsApp updates. Respond only with valid JSON matching the format requested. Do not include any text before or after the JSON.";

        let output = Command::new("claude")
            .args([
                "-p",
                "--output-format", "json",
                "--max-turns", "1",
                "--system-prompt", system_prompt,
                prompt,
            ])
            .output()
            .map_err(|e| NaaradError::LlmError(format!("Could not run claude CLI: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NaaradError::LlmError(stderr.trim().to_string()));
        }

        // Print mode wraps the model answer in {"result": "..."}
        let stdout = String::from_utf8_lossy(&output.stdout);
        let wrapper: serde_json::Value = serde_json::from_str(&stdout)?;
        wrapper["result"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| NaaradError::LlmError("No result in claude response".into()))
    }
}

/// Build the configured generator. `None` means generation is off.
pub fn generator_from_config(config: &LlmConfig) -> Option<Box<dyn TextGenerator>> {
    match config.provider {
        LlmProvider::Gemini => match &config.api_key {
            Some(key) => Some(Box::new(GeminiGenerator::new(key.clone(), config.model.clone()))),
            None => {
                tracing::warn!("GEMINI_API_KEY is not set, sample generation will use fallbacks");
                None
            }
        },
        LlmProvider::ClaudeCli => Some(Box::new(ClaudeCliGenerator)),
        LlmProvider::Disabled => None,
    }
}

/// One preview message for the review step. Never fails.
pub fn generate_sample_message(generator: Option<&dyn TextGenerator>, alert: &Alert) -> SampleMessage {
    let Some(generator) = generator else {
        return prompt::fallback_sample(prompt::DISABLED_TEXT);
    };

    match generator
        .generate(&prompt::sample_prompt(alert))
        .and_then(|text| prompt::parse_sample(&text))
    {
        Ok(sample) => sample,
        Err(e) => {
            tracing::warn!(error = %e, "sample generation failed");
            if e.to_string().contains("API key not valid") {
                prompt::fallback_sample(prompt::INVALID_KEY_TEXT)
            } else {
                prompt::fallback_sample(prompt::GENERIC_FAILURE_TEXT)
            }
        }
    }
}

/// Batch of samples for tuning. Failures become labelled error cards.
pub fn generate_tuning_samples(generator: Option<&dyn TextGenerator>, alert: &Alert) -> Vec<SampleMessage> {
    let Some(generator) = generator else {
        return vec![SampleMessage {
            summary_text: "API key missing. Please configure Gemini API.".into(),
            why_showing: None,
            image_url: Some("⚠️".into()),
            image_suggestion: None,
            action_text: Some("Configure".into()),
        }];
    };

    let today = Local::now().date_naive();
    match generator
        .generate(&prompt::tuning_prompt(alert, today))
        .and_then(|text| prompt::parse_samples(&text))
    {
        Ok(samples) => {
            tracing::debug!(count = samples.len(), "generated tuning samples");
            samples
        }
        Err(e) => {
            tracing::warn!(error = %e, "tuning sample generation failed");
            let reason = match e {
                NaaradError::LlmError(msg) => msg,
                other => other.to_string(),
            };
            prompt::error_samples(&reason)
        }
    }
}

/// Ask the model for clarifying questions about one category
pub fn generate_follow_up_questions(
    generator: &dyn TextGenerator,
    alert: &Alert,
    key: CategoryKey,
) -> Result<Vec<AiFollowUpQuestion>> {
    let text = generator.generate(&prompt::follow_up_prompt(alert, key))?;
    prompt::parse_questions(&text, key)
}
