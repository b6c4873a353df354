//! Completeness checks for the interest-selection step.

use std::fmt;

use crate::aggregator::Navigation;
use crate::preferences::Alert;
use crate::taxonomy::{taxonomy, CategoryId, OTHER_SPORT_ID};

/// Section of the interest step an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionId {
    MainCategory,
    CustomInterest,
    SubCategory(CategoryId),
    OtherSportName,
    FollowUp,
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionId::MainCategory => f.write_str("main-category-section"),
            SectionId::CustomInterest => f.write_str("custom-interest-section"),
            SectionId::SubCategory(id) => write!(f, "sub-category-section-{}", id),
            SectionId::OtherSportName => f.write_str("other-sport-input-section"),
            SectionId::FollowUp => f.write_str("follow-up-section"),
        }
    }
}

/// Errors in the order they were found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<(SectionId, String)>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The error the user should be pointed at
    pub fn first(&self) -> Option<&(SectionId, String)> {
        self.0.first()
    }

    pub fn get(&self, section: SectionId) -> Option<&str> {
        self.0
            .iter()
            .find(|(s, _)| *s == section)
            .map(|(_, m)| m.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(SectionId, String)> {
        self.0.iter()
    }

    fn push(&mut self, section: SectionId, message: impl Into<String>) {
        self.0.push((section, message.into()));
    }
}

/// Decide whether the user may leave the interest step
pub fn validate(alert: &Alert, nav: &Navigation) -> ValidationErrors {
    let mut errors = ValidationErrors::default();

    let Some(category) = nav.main.and_then(|id| taxonomy().category(id)) else {
        errors.push(
            SectionId::MainCategory,
            "Please select at least one broad category to continue.",
        );
        return errors;
    };

    let Some(key) = category.id.key() else {
        if alert.custom_interest_tags.is_empty() {
            errors.push(
                SectionId::CustomInterest,
                "For the 'Custom' category, please add at least one interest tag.",
            );
        }
        return errors;
    };

    let sub = nav.sub.as_deref().and_then(|s| category.sub_category(s));

    if category.has_sub_categories() && sub.is_none() {
        errors.push(
            SectionId::SubCategory(category.id),
            format!("For {}, please select a specific sub-category.", category.label),
        );
    }

    if category.id == CategoryId::Sports
        && sub.map(|s| s.id.as_str()) == Some(OTHER_SPORT_ID)
        && alert.sports().other_sport().is_none()
    {
        errors.push(
            SectionId::OtherSportName,
            "Please specify the name of the 'Other Sport'.",
        );
    }

    let ready = !category.has_sub_categories() || sub.is_some();
    let questions = taxonomy().questions_for(category.id, sub.map(|s| s.id.as_str()));
    if ready && !questions.is_empty() {
        let answers = &alert.category(key).follow_up_answers;
        let answered = questions
            .iter()
            .any(|q| answers.get(&q.id).is_some_and(|a| a.is_answered()));
        if !answered {
            let label = sub.map(|s| s.label.as_str()).unwrap_or(&category.label);
            errors.push(
                SectionId::FollowUp,
                format!(
                    "For {}, please answer at least one follow-up question to continue.",
                    label
                ),
            );
        }
    }

    errors
}
