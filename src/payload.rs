//! Flattening of an alert into the backend's alert format.

use serde::{Deserialize, Serialize};

use crate::preferences::{Alert, CategoryPreferences};
use crate::taxonomy::CategoryKey;

/// Separator between `custom_question` parts
pub const CUSTOM_QUESTION_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MainCategoryLabel {
    Sports,
    News,
    Movies,
    YouTube,
    #[serde(rename = "Custom_Input")]
    CustomInput,
}

impl MainCategoryLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            MainCategoryLabel::Sports => "Sports",
            MainCategoryLabel::News => "News",
            MainCategoryLabel::Movies => "Movies",
            MainCategoryLabel::YouTube => "YouTube",
            MainCategoryLabel::CustomInput => "Custom_Input",
        }
    }
}

/// Resolution order when several categories carry content
const PRIORITY: [(CategoryKey, MainCategoryLabel); 4] = [
    (CategoryKey::Sports, MainCategoryLabel::Sports),
    (CategoryKey::News, MainCategoryLabel::News),
    (CategoryKey::MoviesTv, MainCategoryLabel::Movies),
    (CategoryKey::YouTube, MainCategoryLabel::YouTube),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub main_category: MainCategoryLabel,
    pub sub_categories: Vec<String>,
    pub followup_questions: Vec<String>,
    pub custom_question: String,
}

/// Body of `POST /alerts/alerts`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateAlertRequest {
    #[serde(flatten)]
    pub payload: AlertPayload,
    pub user_id: String,
}

impl CreateAlertRequest {
    pub fn new(payload: AlertPayload, user_id: impl Into<String>) -> Self {
        Self {
            payload,
            user_id: user_id.into(),
        }
    }
}

fn has_content(key: CategoryKey, prefs: &CategoryPreferences) -> bool {
    !prefs.selected_tags.is_empty()
        || !prefs.instruction_tags.is_empty()
        || (key == CategoryKey::Sports && prefs.other_sport_name.as_deref().is_some_and(|s| !s.is_empty()))
}

/// The category that wins the payload, if any has content
pub fn winning_category(alert: &Alert) -> Option<(CategoryKey, MainCategoryLabel)> {
    PRIORITY
        .iter()
        .copied()
        .find(|(key, _)| has_content(*key, alert.category(*key)))
}

/// Flatten `alert` into the backend format.
///
/// Only the winning category contributes tags and answers. Custom interest
/// tags never reach `sub_categories`; they are appended to `custom_question`
/// when no preset category has content.
pub fn to_api_payload(alert: &Alert) -> AlertPayload {
    let winner = winning_category(alert);
    let main_category = winner
        .map(|(_, label)| label)
        .unwrap_or(MainCategoryLabel::CustomInput);
    let active = winner.map(|(key, _)| alert.category(key));

    let mut sub_categories = Vec::new();
    let mut followup_questions = Vec::new();
    let mut parts: Vec<String> = Vec::new();

    if let Some(prefs) = active {
        sub_categories.extend(prefs.selected_tags.iter().cloned());
        if main_category == MainCategoryLabel::Sports {
            if let Some(name) = prefs.other_sport_name.as_deref().filter(|s| !s.is_empty()) {
                sub_categories.push(name.to_string());
            }
        }

        for answer in prefs.follow_up_answers.values() {
            followup_questions.extend(answer.selected_predefined_tags.iter().cloned());
            if let Some(text) = answer.custom_text() {
                followup_questions.push(text.to_string());
            }
        }

        parts.extend(prefs.instruction_tags.iter().cloned());
        parts.extend(
            prefs
                .ai_follow_up_questions
                .iter()
                .filter(|q| !q.answer.trim().is_empty())
                .map(|q| format!("{}: {}", q.question, q.answer)),
        );
    }

    if main_category == MainCategoryLabel::CustomInput {
        parts.extend(alert.custom_interest_tags.iter().cloned());
    }

    AlertPayload {
        main_category,
        sub_categories,
        followup_questions,
        custom_question: parts.join(CUSTOM_QUESTION_SEPARATOR),
    }
}
