//! Pure transitions over the alert being edited.
//!
//! Every wizard interaction becomes an [`Action`]. [`reduce`] takes the
//! current alert and navigation state by reference and returns new ones;
//! persistence happens afterwards in the store.

use serde::{Deserialize, Serialize};

use crate::preferences::{self, AiFollowUpQuestion, Alert, FollowUpAnswer, UpdateFrequency};
use crate::taxonomy::{taxonomy, CategoryId, CategoryKey, NO_PREFERENCE, OTHER_SPORT_ID};

/// Wizard navigation. Lives next to the draft, never inside saved alerts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    pub main: Option<CategoryId>,
    pub sub: Option<String>,
    /// Question whose free-text "Other" input is open
    pub open_other: Option<(CategoryKey, String)>,
}

impl Navigation {
    /// Sub-category to use when looking up questions for `key`
    pub fn sub_for(&self, key: CategoryKey) -> Option<&str> {
        if self.main == Some(key.into()) {
            self.sub.as_deref()
        } else {
            None
        }
    }

    pub fn is_other_open(&self, key: CategoryKey, question_id: &str) -> bool {
        matches!(&self.open_other, Some((k, q)) if *k == key && q == question_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feedback {
    Like,
    Dislike,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SelectMainCategory(CategoryId),
    SelectSubCategory(String),
    SetOtherSportName(String),
    ToggleTag {
        category: CategoryKey,
        tag_id: String,
    },
    ToggleFollowUpTag {
        category: CategoryKey,
        question_id: String,
        label: String,
    },
    ToggleFollowUpOther {
        category: CategoryKey,
        question_id: String,
    },
    SetFollowUpOtherText {
        category: CategoryKey,
        question_id: String,
        text: String,
    },
    AddCustomInterestTag(String),
    RemoveCustomInterestTag(String),
    /// Click on a suggested custom interest
    ToggleCustomInterestTag(String),
    AddInstructionTag {
        category: CategoryKey,
        label: String,
    },
    RemoveInstructionTag {
        category: CategoryKey,
        label: String,
    },
    /// Click on a suggested instruction
    ToggleInstructionTag {
        category: CategoryKey,
        label: String,
    },
    SetAiFollowUpQuestions {
        category: CategoryKey,
        questions: Vec<AiFollowUpQuestion>,
    },
    AnswerAiFollowUpQuestion {
        category: CategoryKey,
        id: String,
        answer: String,
    },
    RecordFeedback {
        feedback: Feedback,
        text: String,
    },
    SetFrequency(UpdateFrequency),
    Rename(String),
}

/// Apply one action. Neither input is modified.
pub fn reduce(alert: &Alert, nav: &Navigation, action: Action) -> (Alert, Navigation) {
    let mut alert = alert.clone();
    let mut nav = nav.clone();
    apply(&mut alert, &mut nav, action);
    (alert, nav)
}

fn apply(alert: &mut Alert, nav: &mut Navigation, action: Action) {
    match action {
        Action::SelectMainCategory(id) => select_main_category(alert, nav, id),
        Action::SelectSubCategory(sub) => select_sub_category(alert, nav, &sub),
        Action::SetOtherSportName(name) => {
            if nav.main == Some(CategoryId::Sports) && nav.sub.as_deref() == Some(OTHER_SPORT_ID) {
                alert.category_mut(CategoryKey::Sports).other_sport_name = Some(name);
            }
        }
        Action::ToggleTag { category, tag_id } => {
            preferences::toggle(&mut alert.category_mut(category).selected_tags, &tag_id);
        }
        Action::ToggleFollowUpTag {
            category,
            question_id,
            label,
        } => toggle_follow_up_tag(alert, nav, category, &question_id, &label),
        Action::ToggleFollowUpOther {
            category,
            question_id,
        } => {
            let was_open = nav.is_other_open(category, &question_id);
            let answer = answer_mut(alert, category, &question_id);
            if was_open {
                answer.custom_answer_via_other = None;
                nav.open_other = None;
            } else {
                strip_no_preference(answer);
                nav.open_other = Some((category, question_id));
            }
        }
        Action::SetFollowUpOtherText {
            category,
            question_id,
            text,
        } => {
            let answer = answer_mut(alert, category, &question_id);
            strip_no_preference(answer);
            answer.custom_answer_via_other = if text.is_empty() { None } else { Some(text) };
        }
        Action::AddCustomInterestTag(label) => {
            let label = label.trim();
            if !label.is_empty() {
                preferences::insert_unique(&mut alert.custom_interest_tags, label);
            }
        }
        Action::RemoveCustomInterestTag(label) => {
            alert.custom_interest_tags.retain(|t| *t != label);
        }
        Action::ToggleCustomInterestTag(label) => {
            preferences::toggle(&mut alert.custom_interest_tags, &label);
        }
        Action::AddInstructionTag { category, label } => {
            let label = label.trim();
            if !label.is_empty() {
                preferences::insert_unique(&mut alert.category_mut(category).instruction_tags, label);
            }
        }
        Action::RemoveInstructionTag { category, label } => {
            alert
                .category_mut(category)
                .instruction_tags
                .retain(|t| *t != label);
        }
        Action::ToggleInstructionTag { category, label } => {
            preferences::toggle(&mut alert.category_mut(category).instruction_tags, &label);
        }
        Action::SetAiFollowUpQuestions {
            category,
            questions,
        } => {
            let prefs = alert.category_mut(category);
            prefs.ai_follow_up_questions = questions;
            prefs.ai_questions_attempted = true;
        }
        Action::AnswerAiFollowUpQuestion {
            category,
            id,
            answer,
        } => {
            if let Some(q) = alert
                .category_mut(category)
                .ai_follow_up_questions
                .iter_mut()
                .find(|q| q.id == id)
            {
                q.answer = answer;
            }
        }
        Action::RecordFeedback { feedback, text } => match feedback {
            Feedback::Like => alert.tuning_feedback.liked.push(text),
            Feedback::Dislike => alert.tuning_feedback.disliked.push(text),
        },
        Action::SetFrequency(frequency) => {
            if frequency.is_selectable() {
                alert.frequency = frequency;
                alert.custom_frequency_time = None;
            }
        }
        Action::Rename(name) => {
            let name = name.trim();
            if !name.is_empty() {
                alert.name = name.to_string();
            }
        }
    }
}

fn select_main_category(alert: &mut Alert, nav: &mut Navigation, id: CategoryId) {
    nav.main = if nav.main == Some(id) { None } else { Some(id) };
    nav.sub = None;
    nav.open_other = None;

    if id != CategoryId::Sports {
        alert.category_mut(CategoryKey::Sports).other_sport_name = None;
    }
}

fn select_sub_category(alert: &mut Alert, nav: &mut Navigation, sub: &str) {
    let Some(main) = nav.main else {
        return;
    };
    if taxonomy().sub_category(main, sub).is_none() {
        return;
    }

    if nav.sub.as_deref() == Some(sub) {
        nav.sub = None;
        if sub == OTHER_SPORT_ID {
            alert.category_mut(CategoryKey::Sports).other_sport_name = None;
        }
        return;
    }

    // Answers belong to the sub-category they were given for
    if let Some(key) = main.key() {
        alert.category_mut(key).follow_up_answers.clear();
    }
    nav.sub = Some(sub.to_string());
    if sub != OTHER_SPORT_ID {
        alert.category_mut(CategoryKey::Sports).other_sport_name = None;
    }
}

fn toggle_follow_up_tag(
    alert: &mut Alert,
    nav: &mut Navigation,
    category: CategoryKey,
    question_id: &str,
    label: &str,
) {
    let single_select = taxonomy()
        .find_question(category.into(), nav.sub_for(category), question_id)
        .map(|q| q.is_single_select)
        .unwrap_or(false);

    if (single_select || label == NO_PREFERENCE) && nav.is_other_open(category, question_id) {
        nav.open_other = None;
    }

    let answer = answer_mut(alert, category, question_id);
    let selected = &mut answer.selected_predefined_tags;

    if single_select || label == NO_PREFERENCE {
        let already = selected.iter().any(|t| t == label);
        selected.clear();
        if !already {
            selected.push(label.to_string());
            answer.custom_answer_via_other = None;
        }
    } else {
        selected.retain(|t| t != NO_PREFERENCE);
        preferences::toggle(selected, label);
    }
}

fn answer_mut<'a>(alert: &'a mut Alert, category: CategoryKey, question_id: &str) -> &'a mut FollowUpAnswer {
    alert
        .category_mut(category)
        .follow_up_answers
        .entry(question_id.to_string())
        .or_default()
}

fn strip_no_preference(answer: &mut FollowUpAnswer) {
    answer.selected_predefined_tags.retain(|t| t != NO_PREFERENCE);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> (Alert, Navigation) {
        (Alert::new("new-1", "New Alert 1"), Navigation::default())
    }

    fn run(alert: Alert, nav: Navigation, actions: Vec<Action>) -> (Alert, Navigation) {
        actions
            .into_iter()
            .fold((alert, nav), |(a, n), action| reduce(&a, &n, action))
    }

    fn tag(category: CategoryKey, question_id: &str, label: &str) -> Action {
        Action::ToggleFollowUpTag {
            category,
            question_id: question_id.into(),
            label: label.into(),
        }
    }

    fn youtube() -> (Alert, Navigation) {
        let (alert, nav) = fresh();
        run(alert, nav, vec![Action::SelectMainCategory(CategoryId::YouTube)])
    }

    #[test]
    fn test_reduce_leaves_inputs_untouched() {
        let (alert, nav) = fresh();
        let before = alert.clone();
        let (next, next_nav) = reduce(
            &alert,
            &nav,
            Action::ToggleTag {
                category: CategoryKey::Sports,
                tag_id: "cricket_ipl".into(),
            },
        );
        assert_eq!(alert, before);
        assert_eq!(nav, Navigation::default());
        assert_eq!(next.sports().selected_tags, vec!["cricket_ipl"]);
        assert_eq!(next_nav, nav);
    }

    #[test]
    fn test_single_select_never_holds_more_than_one() {
        let (alert, nav) = youtube();
        let labels = ["< 5 minutes", "5-15 minutes", "5-15 minutes", "15-30 minutes", NO_PREFERENCE];
        let mut state = (alert, nav);
        for label in labels {
            state = reduce(&state.0, &state.1, tag(CategoryKey::YouTube, "yt_duration", label));
            let answer = &state.0.category(CategoryKey::YouTube).follow_up_answers["yt_duration"];
            assert!(answer.selected_predefined_tags.len() <= 1);
        }
    }

    #[test]
    fn test_single_select_reselect_clears() {
        let (alert, nav) = youtube();
        let (alert, _) = run(
            alert,
            nav,
            vec![
                tag(CategoryKey::YouTube, "yt_duration", "< 5 minutes"),
                tag(CategoryKey::YouTube, "yt_duration", "< 5 minutes"),
            ],
        );
        let answer = &alert.category(CategoryKey::YouTube).follow_up_answers["yt_duration"];
        assert!(answer.selected_predefined_tags.is_empty());
    }

    #[test]
    fn test_multi_select_double_toggle_restores() {
        let (alert, nav) = youtube();
        let (alert, nav) = run(
            alert,
            nav,
            vec![tag(CategoryKey::YouTube, "creatorInteraction", "Live Streams")],
        );
        let before = alert.clone();
        let (alert, _) = run(
            alert,
            nav,
            vec![
                tag(CategoryKey::YouTube, "creatorInteraction", "Community Posts"),
                tag(CategoryKey::YouTube, "creatorInteraction", "Community Posts"),
            ],
        );
        assert_eq!(alert, before);
    }

    #[test]
    fn test_real_tag_replaces_no_preference() {
        let (alert, nav) = youtube();
        let (alert, _) = run(
            alert,
            nav,
            vec![
                tag(CategoryKey::YouTube, "creatorInteraction", NO_PREFERENCE),
                tag(CategoryKey::YouTube, "creatorInteraction", "Live Streams"),
            ],
        );
        let answer = &alert.category(CategoryKey::YouTube).follow_up_answers["creatorInteraction"];
        assert_eq!(answer.selected_predefined_tags, vec!["Live Streams"]);
    }

    #[test]
    fn test_no_preference_replaces_real_tags_and_custom_text() {
        let (alert, nav) = youtube();
        let (alert, nav) = run(
            alert,
            nav,
            vec![
                tag(CategoryKey::YouTube, "yt_topics", "Gaming"),
                Action::ToggleFollowUpOther {
                    category: CategoryKey::YouTube,
                    question_id: "yt_topics".into(),
                },
                Action::SetFollowUpOtherText {
                    category: CategoryKey::YouTube,
                    question_id: "yt_topics".into(),
                    text: "Woodworking".into(),
                },
                tag(CategoryKey::YouTube, "yt_topics", NO_PREFERENCE),
            ],
        );
        let answer = &alert.category(CategoryKey::YouTube).follow_up_answers["yt_topics"];
        assert_eq!(answer.selected_predefined_tags, vec![NO_PREFERENCE]);
        assert_eq!(answer.custom_answer_via_other, None);
        assert_eq!(nav.open_other, None);
    }

    #[test]
    fn test_other_input_keeps_real_tags_and_strips_sentinel() {
        let (alert, nav) = youtube();
        let (alert, nav) = run(
            alert,
            nav,
            vec![
                tag(CategoryKey::YouTube, "yt_topics", NO_PREFERENCE),
                Action::ToggleFollowUpOther {
                    category: CategoryKey::YouTube,
                    question_id: "yt_topics".into(),
                },
            ],
        );
        let answer = &alert.category(CategoryKey::YouTube).follow_up_answers["yt_topics"];
        assert!(answer.selected_predefined_tags.is_empty());
        assert!(nav.is_other_open(CategoryKey::YouTube, "yt_topics"));

        let (alert, nav) = run(
            alert,
            nav,
            vec![
                tag(CategoryKey::YouTube, "yt_topics", "Gaming"),
                Action::SetFollowUpOtherText {
                    category: CategoryKey::YouTube,
                    question_id: "yt_topics".into(),
                    text: "Chess streams".into(),
                },
                Action::ToggleFollowUpOther {
                    category: CategoryKey::YouTube,
                    question_id: "yt_topics".into(),
                },
            ],
        );
        let answer = &alert.category(CategoryKey::YouTube).follow_up_answers["yt_topics"];
        assert_eq!(answer.selected_predefined_tags, vec!["Gaming"]);
        assert_eq!(answer.custom_answer_via_other, None);
        assert_eq!(nav.open_other, None);
    }

    #[test]
    fn test_switching_sub_category_clears_answers() {
        let (alert, nav) = fresh();
        let (alert, nav) = run(
            alert,
            nav,
            vec![
                Action::SelectMainCategory(CategoryId::Sports),
                Action::SelectSubCategory("sports_cricket".into()),
                tag(CategoryKey::Sports, "favTeam", "Mumbai Indians"),
                Action::ToggleTag {
                    category: CategoryKey::Sports,
                    tag_id: "cricket_ipl".into(),
                },
            ],
        );
        assert_eq!(alert.sports().follow_up_answers.len(), 1);

        // Deselecting keeps answers
        let (kept, _) = reduce(&alert, &nav, Action::SelectSubCategory("sports_cricket".into()));
        assert_eq!(kept.sports().follow_up_answers.len(), 1);

        let (switched, nav) = reduce(&alert, &nav, Action::SelectSubCategory("sports_football".into()));
        assert!(switched.sports().follow_up_answers.is_empty());
        assert_eq!(switched.sports().selected_tags, vec!["cricket_ipl"]);
        assert_eq!(nav.sub.as_deref(), Some("sports_football"));
    }

    #[test]
    fn test_other_sport_name_lifecycle() {
        let (alert, nav) = fresh();

        // Ignored until the other slot is active
        let (alert, nav) = run(
            alert,
            nav,
            vec![
                Action::SelectMainCategory(CategoryId::Sports),
                Action::SetOtherSportName("Curling".into()),
            ],
        );
        assert_eq!(alert.sports().other_sport_name, None);

        let (alert, nav) = run(
            alert,
            nav,
            vec![
                Action::SelectSubCategory(OTHER_SPORT_ID.into()),
                Action::SetOtherSportName("Curling".into()),
            ],
        );
        assert_eq!(alert.sports().other_sport(), Some("Curling"));

        let (cleared, _) = reduce(&alert, &nav, Action::SelectMainCategory(CategoryId::News));
        assert_eq!(cleared.sports().other_sport_name, None);

        let (cleared, _) = reduce(&alert, &nav, Action::SelectSubCategory(OTHER_SPORT_ID.into()));
        assert_eq!(cleared.sports().other_sport_name, None);

        let (cleared, _) = reduce(&alert, &nav, Action::SelectSubCategory("sports_tennis".into()));
        assert_eq!(cleared.sports().other_sport_name, None);
    }

    #[test]
    fn test_main_category_switch_keeps_other_selections() {
        let (alert, nav) = fresh();
        let (alert, nav) = run(
            alert,
            nav,
            vec![
                Action::SelectMainCategory(CategoryId::News),
                Action::SelectSubCategory("news_tech".into()),
                Action::ToggleTag {
                    category: CategoryKey::News,
                    tag_id: "news_ai".into(),
                },
                Action::SelectMainCategory(CategoryId::MoviesTv),
            ],
        );
        assert_eq!(alert.category(CategoryKey::News).selected_tags, vec!["news_ai"]);
        assert_eq!(nav.main, Some(CategoryId::MoviesTv));
        assert_eq!(nav.sub, None);

        let (_, nav) = reduce(&alert, &nav, Action::SelectMainCategory(CategoryId::MoviesTv));
        assert_eq!(nav.main, None);
    }

    #[test]
    fn test_custom_and_instruction_tags_are_trimmed_sets() {
        let (alert, nav) = fresh();
        let (alert, _) = run(
            alert,
            nav,
            vec![
                Action::AddCustomInterestTag("  Chess ".into()),
                Action::AddCustomInterestTag("Chess".into()),
                Action::AddCustomInterestTag("   ".into()),
                Action::AddInstructionTag {
                    category: CategoryKey::News,
                    label: "No paywalls".into(),
                },
                Action::AddInstructionTag {
                    category: CategoryKey::News,
                    label: " No paywalls".into(),
                },
                Action::ToggleInstructionTag {
                    category: CategoryKey::News,
                    label: "Summaries only".into(),
                },
                Action::RemoveInstructionTag {
                    category: CategoryKey::News,
                    label: "No paywalls".into(),
                },
                Action::ToggleCustomInterestTag("Local Events".into()),
            ],
        );
        assert_eq!(alert.custom_interest_tags, vec!["Chess", "Local Events"]);
        assert_eq!(
            alert.category(CategoryKey::News).instruction_tags,
            vec!["Summaries only"]
        );

        let (alert, _) = reduce(&alert, &Navigation::default(), Action::RemoveCustomInterestTag("Chess".into()));
        assert_eq!(alert.custom_interest_tags, vec!["Local Events"]);
    }

    #[test]
    fn test_only_real_time_can_be_chosen() {
        let (alert, nav) = fresh();
        let (alert, _) = reduce(&alert, &nav, Action::SetFrequency(UpdateFrequency::EveningSummary));
        assert_eq!(alert.frequency, UpdateFrequency::MorningDigest);
        let (alert, _) = reduce(&alert, &nav, Action::SetFrequency(UpdateFrequency::RealTime));
        assert_eq!(alert.frequency, UpdateFrequency::RealTime);
    }

    #[test]
    fn test_ai_questions_and_feedback() {
        let (alert, nav) = fresh();
        let (alert, _) = run(
            alert,
            nav,
            vec![
                Action::SetAiFollowUpQuestions {
                    category: CategoryKey::News,
                    questions: vec![AiFollowUpQuestion {
                        id: "ai-1".into(),
                        question: "Which markets?".into(),
                        answer: String::new(),
                    }],
                },
                Action::AnswerAiFollowUpQuestion {
                    category: CategoryKey::News,
                    id: "ai-1".into(),
                    answer: "India".into(),
                },
                Action::RecordFeedback {
                    feedback: Feedback::Dislike,
                    text: "Too long".into(),
                },
                Action::Rename("  Morning markets ".into()),
            ],
        );
        let news = alert.category(CategoryKey::News);
        assert!(news.ai_questions_attempted);
        assert_eq!(news.ai_follow_up_questions[0].answer, "India");
        assert_eq!(alert.tuning_feedback.disliked, vec!["Too long"]);
        assert_eq!(alert.name, "Morning markets");
    }
}
