//! Prompt construction for sample generation, and parsing of model output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{NaaradError, Result};
use crate::preferences::{AiFollowUpQuestion, Alert, UpdateFrequency};
use crate::taxonomy::{taxonomy, CategoryKey};

pub const GENERIC_FAILURE_TEXT: &str = "Sorry, we couldn't generate a sample message at this time.";
pub const DISABLED_TEXT: &str =
    "Sample message generation is disabled or encountered an error. This is a mock update!";
pub const INVALID_KEY_TEXT: &str = "Could not generate sample: API key is not valid.";

/// How many samples the tuning prompt asks for
pub const TUNING_SAMPLE_COUNT: usize = 6;

/// Upper bound on generated follow-up questions per category
pub const MAX_AI_QUESTIONS: usize = 3;

/// One generated WhatsApp-style update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleMessage {
    pub summary_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why_showing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_text: Option<String>,
}

impl SampleMessage {
    fn labelled(summary: impl Into<String>, icon: &str, action: &str) -> Self {
        Self {
            summary_text: summary.into(),
            why_showing: None,
            image_url: Some(icon.to_string()),
            image_suggestion: None,
            action_text: Some(action.to_string()),
        }
    }

    fn with_image_fallback(mut self) -> Self {
        if self.image_url.is_none() {
            self.image_url = self.image_suggestion.clone();
        }
        self
    }
}

/// Natural-language description of an alert for the model
pub fn describe_alert(alert: &Alert) -> String {
    let mut out = String::from("User's Alert Configuration:\n");
    out.push_str(&format!("- Alert Name: {}\n", alert.name));
    out.push_str(&format!("- Frequency: {}", alert.frequency));
    if alert.frequency == UpdateFrequency::Custom {
        if let Some(time) = &alert.custom_frequency_time {
            out.push_str(&format!(" at {}", time));
        }
    }
    out.push('\n');

    for key in CategoryKey::ALL {
        describe_category(&mut out, alert, key);
    }

    if !alert.custom_interest_tags.is_empty() {
        out.push_str(&format!(
            "- Custom Interests: {}\n",
            alert.custom_interest_tags.join(", ")
        ));
    }
    out
}

fn describe_category(out: &mut String, alert: &Alert, key: CategoryKey) {
    let prefs = alert.category(key);
    let other_sport = if key == CategoryKey::Sports {
        prefs.other_sport()
    } else {
        None
    };
    let answered = prefs.follow_up_answers.values().any(|a| a.is_answered());

    if prefs.selected_tags.is_empty()
        && other_sport.is_none()
        && !answered
        && prefs.instruction_tags.is_empty()
    {
        return;
    }

    out.push_str(&format!("- {}:\n", key.label()));
    if !prefs.selected_tags.is_empty() {
        let labels: Vec<String> = prefs
            .selected_tags
            .iter()
            .map(|t| taxonomy().tag_label(t))
            .collect();
        out.push_str(&format!("  - Interests/Topics: {}\n", labels.join(", ")));
    }
    if let Some(name) = other_sport {
        out.push_str(&format!("  - Specified Other Sport: {}\n", name));
    }
    if answered {
        out.push_str("  - Additional Details (Fixed Q&A):\n");
        for (question_id, answer) in &prefs.follow_up_answers {
            let mut parts = answer.selected_predefined_tags.clone();
            if let Some(text) = answer.custom_text() {
                parts.push(format!("Other: {}", text));
            }
            if parts.is_empty() {
                continue;
            }
            out.push_str(&format!(
                "    - Q: {}\n    - A: {}\n",
                taxonomy().question_text(key, question_id),
                parts.join("; ")
            ));
        }
    }
    if !prefs.instruction_tags.is_empty() {
        out.push_str(&format!(
            "  - Specific Instructions (Tags): {}\n",
            prefs.instruction_tags.join(", ")
        ));
    }
}

/// Prompt for a single preview message
pub fn sample_prompt(alert: &Alert) -> String {
    format!(
        r#"Based on the user's alert configuration, generate a single, realistic, and compelling sample WhatsApp update. The response MUST be a valid JSON object.

User Config:
{}

The JSON object must have this structure:
{{
  "summaryText": "string",
  "imageSuggestion": "string (a brief suggestion for a relevant emoji or a short image description)",
  "actionText": "string"
}}

JSON Response:"#,
        describe_alert(alert)
    )
}

/// Prompt for the tuning batch, anchored on `today`
pub fn tuning_prompt(alert: &Alert, today: NaiveDate) -> String {
    format!(
        r#"Generate {count} realistic WhatsApp news updates as JSON array. Make them feel like REAL breaking news from today ({today}).

{config}

Requirements:
- Create realistic news that feels current and authentic
- Include specific details, names, numbers, scores where relevant
- Vary formats: breaking news, match updates, announcements, analysis
- Match user's custom preferences/questions if provided
- Use relevant emojis for imageUrl

JSON format:
[{{
  "summaryText": "realistic news update with specific details (max 150 words)",
  "imageUrl": "relevant emoji",
  "actionText": "action phrase"
}}]

JSON Response:"#,
        count = TUNING_SAMPLE_COUNT,
        today = today.format("%B %-d, %Y"),
        config = describe_alert(alert)
    )
}

/// Prompt asking for short clarifying questions about one category
pub fn follow_up_prompt(alert: &Alert, key: CategoryKey) -> String {
    format!(
        r#"A user is setting up WhatsApp updates about {label}. Ask up to {max} short follow-up questions that would help narrow down what they want. Do not repeat anything they already answered.

{config}

Respond with a JSON array of question strings only, for example:
["Which teams should we prioritise?", "Do you want spoilers?"]

JSON Response:"#,
        label = key.label(),
        max = MAX_AI_QUESTIONS,
        config = describe_alert(alert)
    )
}

/// Strip markdown code fencing from a string (e.g., ```json ... ```)
/// Also handles cases where there's text before the code block
pub fn strip_code_fencing(s: &str) -> String {
    let trimmed = s.trim();

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        return match after.find("```") {
            Some(end) => after[..end].trim().to_string(),
            None => after.trim().to_string(),
        };
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        // Skip an info string like ```javascript
        let after = match after.find('\n') {
            Some(nl) if after[..nl].chars().all(|c| c.is_ascii_alphanumeric()) => &after[nl + 1..],
            _ => after,
        };
        return match after.find("```") {
            Some(end) => after[..end].trim().to_string(),
            None => after.trim().to_string(),
        };
    }

    trimmed.to_string()
}

pub fn parse_sample(text: &str) -> Result<SampleMessage> {
    let json = strip_code_fencing(text);
    let sample: SampleMessage = serde_json::from_str(&json)
        .map_err(|e| NaaradError::LlmError(format!("Failed to parse sample message: {}", e)))?;
    Ok(sample.with_image_fallback())
}

/// Parse a batch of samples. An empty or non-array answer is an error.
pub fn parse_samples(text: &str) -> Result<Vec<SampleMessage>> {
    let json = strip_code_fencing(text);
    let samples: Vec<SampleMessage> = serde_json::from_str(&json)
        .map_err(|_| NaaradError::LlmError("AI response was not a valid array.".into()))?;
    if samples.is_empty() {
        return Err(NaaradError::LlmError("AI response was not a valid array.".into()));
    }
    Ok(samples.into_iter().map(SampleMessage::with_image_fallback).collect())
}

/// Parse generated questions into unanswered follow-ups for `key`
pub fn parse_questions(text: &str, key: CategoryKey) -> Result<Vec<AiFollowUpQuestion>> {
    let json = strip_code_fencing(text);
    let questions: Vec<String> = serde_json::from_str(&json)
        .map_err(|e| NaaradError::LlmError(format!("Failed to parse follow-up questions: {}", e)))?;

    Ok(questions
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .take(MAX_AI_QUESTIONS)
        .enumerate()
        .map(|(i, question)| AiFollowUpQuestion {
            id: format!("{}-ai-{}", key, i + 1),
            question,
            answer: String::new(),
        })
        .collect())
}

/// Stand-in preview when generation fails
pub fn fallback_sample(reason: &str) -> SampleMessage {
    SampleMessage::labelled(reason, "⚙️", "Try Again Later")
}

/// Cards shown in place of a failed tuning batch
pub fn error_samples(reason: &str) -> Vec<SampleMessage> {
    vec![
        SampleMessage::labelled(
            format!("Failed to generate samples. Error: {}", reason),
            "❌",
            "Retry",
        ),
        SampleMessage::labelled(
            "Please check your internet connection and try again.",
            "🔄",
            "Retry",
        ),
        SampleMessage::labelled("If issue persists, contact support.", "💬", "Contact"),
    ]
}

/// Numbered filler cards used to reach the minimum tuning count
pub fn filler_samples(count: usize) -> Vec<SampleMessage> {
    (1..=count)
        .map(|i| {
            SampleMessage::labelled(
                format!(
                    "This is a fallback sample message #{} as we couldn't generate enough variety for your choices.",
                    i
                ),
                "⚙️",
                "Explore More",
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::FollowUpAnswer;

    fn cricket_alert() -> Alert {
        let mut alert = Alert::new("alert-1", "Cricket");
        let sports = alert.category_mut(CategoryKey::Sports);
        sports.selected_tags = vec!["cricket_ipl".into(), "unknown_tag".into()];
        sports.follow_up_answers.insert(
            "favTeam".into(),
            FollowUpAnswer {
                selected_predefined_tags: vec!["Mumbai Indians".into()],
                custom_answer_via_other: Some(" Gujarat ".into()),
            },
        );
        sports.instruction_tags = vec!["Scores only".into()];
        alert.custom_interest_tags = vec!["Chess".into()];
        alert
    }

    #[test]
    fn test_describe_alert() {
        let text = describe_alert(&cricket_alert());
        assert!(text.starts_with("User's Alert Configuration:\n- Alert Name: Cricket\n"));
        assert!(text.contains("- Frequency: Morning Digest\n"));
        assert!(text.contains("- Sports:\n"));
        assert!(text.contains("  - Interests/Topics: cricket_ipl, unknown_tag\n"));
        assert!(text.contains("    - A: Mumbai Indians; Other: Gujarat\n"));
        assert!(text.contains("  - Specific Instructions (Tags): Scores only\n"));
        assert!(text.ends_with("- Custom Interests: Chess\n"));
        assert!(!text.contains("- News:"));
    }

    #[test]
    fn test_describe_other_sport() {
        let mut alert = Alert::new("alert-2", "Curling");
        alert.category_mut(CategoryKey::Sports).other_sport_name = Some(" Curling ".into());
        let text = describe_alert(&alert);
        assert!(text.contains("  - Specified Other Sport: Curling\n"));
    }

    #[test]
    fn test_tuning_prompt_has_date_and_config() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let prompt = tuning_prompt(&cricket_alert(), today);
        assert!(prompt.starts_with("Generate 6 realistic WhatsApp news updates"));
        assert!(prompt.contains("today (March 7, 2025)"));
        assert!(prompt.contains("- Alert Name: Cricket"));
    }

    #[test]
    fn test_strip_code_fencing() {
        assert_eq!(strip_code_fencing("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fencing("Sure:\n```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fencing("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_sample_copies_image_suggestion() {
        let sample = parse_sample(
            r#"```json
{"summaryText":"RCB win","imageSuggestion":"🏏","actionText":"Read more"}
```"#,
        )
        .unwrap();
        assert_eq!(sample.summary_text, "RCB win");
        assert_eq!(sample.image_url.as_deref(), Some("🏏"));
    }

    #[test]
    fn test_parse_samples_rejects_empty_and_objects() {
        assert!(parse_samples("[]").is_err());
        assert!(parse_samples(r#"{"summaryText":"x"}"#).is_err());
        let samples = parse_samples(r#"[{"summaryText":"a"},{"summaryText":"b","imageUrl":"📰"}]"#).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].image_url.as_deref(), Some("📰"));
    }

    #[test]
    fn test_parse_questions_caps_and_ids() {
        let questions = parse_questions(r#"["Which teams?", " ", "Spoilers?", "Format?", "Extra?"]"#, CategoryKey::Sports)
            .unwrap();
        assert_eq!(questions.len(), MAX_AI_QUESTIONS);
        assert_eq!(questions[0].id, "sports-ai-1");
        assert_eq!(questions[1].question, "Spoilers?");
        assert!(questions.iter().all(|q| q.answer.is_empty()));
    }

    #[test]
    fn test_fallback_texts() {
        let errors = error_samples("timeout");
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].summary_text, "Failed to generate samples. Error: timeout");
        let filler = filler_samples(2);
        assert!(filler[1].summary_text.contains("#2"));
        assert_eq!(fallback_sample(GENERIC_FAILURE_TEXT).action_text.as_deref(), Some("Try Again Later"));
    }
}
