//! Static interest taxonomy: main categories, sub-categories, tags and
//! follow-up questions.
//!
//! The data ships inside the binary (`assets/taxonomy.json`) and is parsed
//! once on first access. Nothing mutates it at runtime.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{NaaradError, Result};

/// Sentinel answer label offered on every multi-select follow-up question
pub const NO_PREFERENCE: &str = "No Preference";

/// Sub-category whose name the user types in
pub const OTHER_SPORT_ID: &str = "sports_other";

static TAXONOMY: Lazy<Taxonomy> = Lazy::new(|| {
    Taxonomy::from_json(include_str!("../assets/taxonomy.json"))
        .expect("Embedded taxonomy is invalid")
});

/// The process-wide taxonomy
pub fn taxonomy() -> &'static Taxonomy {
    &TAXONOMY
}

/// The four categories whose preferences live in an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CategoryKey {
    #[serde(rename = "sports")]
    Sports,
    #[serde(rename = "moviesTV")]
    MoviesTv,
    #[serde(rename = "news")]
    News,
    #[serde(rename = "youtube")]
    YouTube,
}

impl CategoryKey {
    pub const ALL: [CategoryKey; 4] = [
        CategoryKey::Sports,
        CategoryKey::MoviesTv,
        CategoryKey::News,
        CategoryKey::YouTube,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CategoryKey::Sports => "sports",
            CategoryKey::MoviesTv => "moviesTV",
            CategoryKey::News => "news",
            CategoryKey::YouTube => "youtube",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CategoryKey::Sports => "Sports",
            CategoryKey::MoviesTv => "Movies & TV",
            CategoryKey::News => "News",
            CategoryKey::YouTube => "YouTube",
        }
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any main category, including the free-form `custom` bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryId {
    #[serde(rename = "sports")]
    Sports,
    #[serde(rename = "moviesTV")]
    MoviesTv,
    #[serde(rename = "news")]
    News,
    #[serde(rename = "youtube")]
    YouTube,
    #[serde(rename = "custom")]
    Custom,
}

impl CategoryId {
    /// Preference block backing this category; `None` for custom
    pub fn key(self) -> Option<CategoryKey> {
        match self {
            CategoryId::Sports => Some(CategoryKey::Sports),
            CategoryId::MoviesTv => Some(CategoryKey::MoviesTv),
            CategoryId::News => Some(CategoryKey::News),
            CategoryId::YouTube => Some(CategoryKey::YouTube),
            CategoryId::Custom => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self.key() {
            Some(key) => key.as_str(),
            None => "custom",
        }
    }
}

impl From<CategoryKey> for CategoryId {
    fn from(key: CategoryKey) -> Self {
        match key {
            CategoryKey::Sports => CategoryId::Sports,
            CategoryKey::MoviesTv => CategoryId::MoviesTv,
            CategoryKey::News => CategoryId::News,
            CategoryKey::YouTube => CategoryId::YouTube,
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryId {
    type Err = NaaradError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sports" => Ok(CategoryId::Sports),
            "moviestv" | "movies" | "movies-tv" | "tv" => Ok(CategoryId::MoviesTv),
            "news" => Ok(CategoryId::News),
            "youtube" => Ok(CategoryId::YouTube),
            "custom" => Ok(CategoryId::Custom),
            other => Err(NaaradError::InvalidInput(format!(
                "Unknown category '{}'. Use sports, moviesTV, news, youtube or custom",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpQuestion {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub predefined_answer_tags: Vec<Tag>,
    #[serde(default)]
    pub has_other_option: bool,
    #[serde(default)]
    pub is_single_select: bool,
    #[serde(default)]
    pub helper_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub popular_teams: Vec<Tag>,
    #[serde(default)]
    pub popular_players: Vec<Tag>,
    #[serde(default)]
    pub follow_up_questions: Vec<FollowUpQuestion>,
    #[serde(default)]
    pub popular_instruction_tags: Vec<Tag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainCategory {
    pub id: CategoryId,
    pub label: String,
    #[serde(default)]
    pub sub_categories: Vec<SubCategory>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub follow_up_questions: Vec<FollowUpQuestion>,
    #[serde(default)]
    pub follow_up_helper_text: Option<String>,
    #[serde(default)]
    pub popular_instruction_tags: Vec<Tag>,
}

impl MainCategory {
    pub fn has_sub_categories(&self) -> bool {
        !self.sub_categories.is_empty()
    }

    pub fn sub_category(&self, id: &str) -> Option<&SubCategory> {
        self.sub_categories.iter().find(|s| s.id == id)
    }
}

#[derive(Debug, Clone)]
pub struct Taxonomy {
    categories: Vec<MainCategory>,
}

impl Taxonomy {
    pub fn from_json(json: &str) -> Result<Self> {
        let categories: Vec<MainCategory> = serde_json::from_str(json)?;
        Ok(Self { categories })
    }

    pub fn categories(&self) -> &[MainCategory] {
        &self.categories
    }

    pub fn category(&self, id: CategoryId) -> Option<&MainCategory> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn sub_category(&self, id: CategoryId, sub: &str) -> Option<&SubCategory> {
        self.category(id).and_then(|c| c.sub_category(sub))
    }

    /// Questions that apply to the current selection. Sub-category questions
    /// replace the category's own when the sub-category defines any.
    pub fn questions_for(&self, id: CategoryId, sub: Option<&str>) -> &[FollowUpQuestion] {
        let Some(category) = self.category(id) else {
            return &[];
        };
        if let Some(sub) = sub.and_then(|s| category.sub_category(s)) {
            if !sub.follow_up_questions.is_empty() {
                return &sub.follow_up_questions;
            }
        }
        &category.follow_up_questions
    }

    pub fn find_question(
        &self,
        id: CategoryId,
        sub: Option<&str>,
        question_id: &str,
    ) -> Option<&FollowUpQuestion> {
        self.questions_for(id, sub).iter().find(|q| q.id == question_id)
    }

    /// Answer chips shown for a question. Sports team/player questions take
    /// their options from the sub-category; multi-select questions also get
    /// the "No Preference" sentinel.
    pub fn answer_options(
        &self,
        id: CategoryId,
        sub: Option<&str>,
        question: &FollowUpQuestion,
    ) -> Vec<Tag> {
        let mut options = question.predefined_answer_tags.clone();

        if id == CategoryId::Sports {
            if let Some(sub) = sub.and_then(|s| self.sub_category(id, s)) {
                if question.id == "favTeam" && !sub.popular_teams.is_empty() {
                    options = sub.popular_teams.clone();
                } else if question.id == "favPlayer" && !sub.popular_players.is_empty() {
                    options = sub.popular_players.clone();
                }
            }
        }

        if !question.is_single_select {
            options.push(Tag {
                id: format!("{}_nopref", question.id),
                label: NO_PREFERENCE.to_string(),
            });
        }
        options
    }

    /// Suggested instruction tags: the sub-category's when present, else the category's
    pub fn popular_instructions(&self, id: CategoryId, sub: Option<&str>) -> &[Tag] {
        let Some(category) = self.category(id) else {
            return &[];
        };
        if let Some(sub) = sub.and_then(|s| category.sub_category(s)) {
            if !sub.popular_instruction_tags.is_empty() {
                return &sub.popular_instruction_tags;
            }
        }
        &category.popular_instruction_tags
    }

    /// Human label for a selectable tag id, or the id itself when unknown
    pub fn tag_label(&self, tag_id: &str) -> String {
        for category in &self.categories {
            if let Some(tag) = category.tags.iter().find(|t| t.id == tag_id) {
                return tag.label.clone();
            }
            for sub in &category.sub_categories {
                if let Some(tag) = sub.tags.iter().find(|t| t.id == tag_id) {
                    return tag.label.clone();
                }
            }
        }
        tag_id.to_string()
    }

    /// Question text for an answered question id, or the id itself when unknown
    pub fn question_text(&self, key: CategoryKey, question_id: &str) -> String {
        let Some(category) = self.category(key.into()) else {
            return question_id.to_string();
        };
        category
            .follow_up_questions
            .iter()
            .chain(category.sub_categories.iter().flat_map(|s| s.follow_up_questions.iter()))
            .find(|q| q.id == question_id)
            .map(|q| q.text.clone())
            .unwrap_or_else(|| question_id.to_string())
    }
}
