//! Preference data model: the user, their alerts, and per-category blocks.
//!
//! Field names on the wire are camelCase so stored state stays readable by
//! anything that understands the web client's local storage shape.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::taxonomy::CategoryKey;

static EMPTY_CATEGORY: Lazy<CategoryPreferences> = Lazy::new(CategoryPreferences::default);

/// Delivery cadence for an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateFrequency {
    #[serde(rename = "Real-time")]
    RealTime,
    #[default]
    #[serde(rename = "Morning Digest")]
    MorningDigest,
    #[serde(rename = "Evening Summary")]
    EveningSummary,
    #[serde(rename = "Custom")]
    Custom,
}

impl UpdateFrequency {
    pub const ALL: [UpdateFrequency; 4] = [
        UpdateFrequency::RealTime,
        UpdateFrequency::MorningDigest,
        UpdateFrequency::EveningSummary,
        UpdateFrequency::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UpdateFrequency::RealTime => "Real-time",
            UpdateFrequency::MorningDigest => "Morning Digest",
            UpdateFrequency::EveningSummary => "Evening Summary",
            UpdateFrequency::Custom => "Custom",
        }
    }

    /// Only real-time delivery can currently be chosen
    pub fn is_selectable(self) -> bool {
        self == UpdateFrequency::RealTime
    }
}

impl std::fmt::Display for UpdateFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Platform {
    #[default]
    WhatsApp,
}

/// Answer to one follow-up question. Selections are stored by label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpAnswer {
    #[serde(default)]
    pub selected_predefined_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_answer_via_other: Option<String>,
}

impl FollowUpAnswer {
    pub fn custom_text(&self) -> Option<&str> {
        self.custom_answer_via_other
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// True when a predefined label is picked or non-blank custom text exists
    pub fn is_answered(&self) -> bool {
        !self.selected_predefined_tags.is_empty() || self.custom_text().is_some()
    }
}

/// Question generated by the LLM for a category, with the user's reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiFollowUpQuestion {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPreferences {
    #[serde(default)]
    pub selected_tags: Vec<String>,
    #[serde(default)]
    pub follow_up_answers: BTreeMap<String, FollowUpAnswer>,
    #[serde(default)]
    pub instruction_tags: Vec<String>,
    #[serde(default)]
    pub ai_follow_up_questions: Vec<AiFollowUpQuestion>,
    #[serde(default)]
    pub ai_questions_attempted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_sport_name: Option<String>,
}

impl CategoryPreferences {
    pub fn other_sport(&self) -> Option<&str> {
        self.other_sport_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuningFeedback {
    #[serde(default)]
    pub liked: Vec<String>,
    #[serde(default)]
    pub disliked: Vec<String>,
}

impl TuningFeedback {
    pub fn count(&self) -> usize {
        self.liked.len() + self.disliked.len()
    }
}

/// One notification subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub name: String,
    /// Stored under `sports`, `moviesTV`, `news` and `youtube`
    #[serde(flatten)]
    pub categories: BTreeMap<CategoryKey, CategoryPreferences>,
    #[serde(default)]
    pub custom_interest_tags: Vec<String>,
    #[serde(default)]
    pub frequency: UpdateFrequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_frequency_time: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub tuning_feedback: TuningFeedback,
    /// Id of the copy last created on the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_alert_id: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Alert {
    /// Empty alert with every category block present
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            categories: CategoryKey::ALL
                .iter()
                .map(|k| (*k, CategoryPreferences::default()))
                .collect(),
            custom_interest_tags: Vec::new(),
            frequency: UpdateFrequency::default(),
            custom_frequency_time: None,
            is_active: true,
            tuning_feedback: TuningFeedback::default(),
            remote_alert_id: None,
        }
    }

    /// Working copy for a brand new alert, numbered after the saved ones
    pub fn new_draft(now: DateTime<Utc>, saved_count: usize) -> Self {
        Self::new(
            format!("new-{}", now.timestamp_millis()),
            format!("New Alert {}", saved_count + 1),
        )
    }

    pub fn permanent_id(now: DateTime<Utc>) -> String {
        format!("alert-{}", now.timestamp_millis())
    }

    /// Not yet saved under a permanent id
    pub fn is_draft(&self) -> bool {
        self.id.starts_with("new-")
    }

    pub fn category(&self, key: CategoryKey) -> &CategoryPreferences {
        self.categories.get(&key).unwrap_or(&*EMPTY_CATEGORY)
    }

    pub fn category_mut(&mut self, key: CategoryKey) -> &mut CategoryPreferences {
        self.categories.entry(key).or_default()
    }

    pub fn sports(&self) -> &CategoryPreferences {
        self.category(CategoryKey::Sports)
    }
}

/// Root of the locally persisted state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub whatsapp_number: String,
    #[serde(default)]
    pub is_whats_app_confirmed: bool,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub platform: Platform,
}

impl UserPreferences {
    pub fn find_alert(&self, id: &str) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == id)
    }
}

/// Append `value` unless already present. Returns whether it was added.
pub(crate) fn insert_unique(set: &mut Vec<String>, value: &str) -> bool {
    if set.iter().any(|v| v == value) {
        return false;
    }
    set.push(value.to_string());
    true
}

/// Add `value` if absent, remove it if present
pub(crate) fn toggle(set: &mut Vec<String>, value: &str) {
    if let Some(pos) = set.iter().position(|v| v == value) {
        set.remove(pos);
    } else {
        set.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_draft_ids_and_names() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let alert = Alert::new_draft(now, 2);
        assert_eq!(alert.id, "new-1700000000123");
        assert_eq!(alert.name, "New Alert 3");
        assert!(alert.is_draft());
        assert_eq!(alert.frequency, UpdateFrequency::MorningDigest);
        assert_eq!(Alert::permanent_id(now), "alert-1700000000123");
        assert_eq!(alert.categories.len(), 4);
    }

    #[test]
    fn test_alert_json_uses_category_field_names() {
        let mut alert = Alert::new("alert-1", "Cricket");
        alert
            .category_mut(CategoryKey::Sports)
            .selected_tags
            .push("cricket_ipl".into());

        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["sports"]["selectedTags"][0], "cricket_ipl");
        assert!(json["moviesTV"]["followUpAnswers"].is_object());
        assert_eq!(json["frequency"], "Morning Digest");
        assert_eq!(json["tuningFeedback"]["liked"].as_array().unwrap().len(), 0);

        let back: Alert = serde_json::from_value(json).unwrap();
        assert_eq!(back, alert);
    }

    #[test]
    fn test_missing_category_block_reads_as_empty() {
        let alert: Alert = serde_json::from_str(
            r#"{"id":"alert-9","name":"Old","sports":{"selectedTags":["x"]}}"#,
        )
        .unwrap();
        assert_eq!(alert.sports().selected_tags, vec!["x"]);
        assert!(alert.category(CategoryKey::News).selected_tags.is_empty());
        assert!(alert.is_active);
    }

    #[test]
    fn test_answer_blank_custom_text_is_not_an_answer() {
        let answer = FollowUpAnswer {
            selected_predefined_tags: vec![],
            custom_answer_via_other: Some("   ".into()),
        };
        assert!(!answer.is_answered());
    }

    #[test]
    fn test_user_preferences_field_names() {
        let json = serde_json::to_value(UserPreferences::default()).unwrap();
        assert_eq!(json["platform"], "WhatsApp");
        assert_eq!(json["isWhatsAppConfirmed"], false);
        assert!(json["whatsappNumber"].is_string());
    }

    #[test]
    fn test_set_helpers() {
        let mut set = vec!["a".to_string()];
        assert!(!insert_unique(&mut set, "a"));
        assert!(insert_unique(&mut set, "b"));
        toggle(&mut set, "a");
        assert_eq!(set, vec!["b"]);
        toggle(&mut set, "a");
        assert_eq!(set, vec!["b", "a"]);
    }
}
