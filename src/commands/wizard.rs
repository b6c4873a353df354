//! Interactive alert wizard.
//!
//! Each answer becomes an [`Action`] dispatched into the store, so every step
//! is persisted and `naarad resume` can pick up where the user stopped.

use std::fmt;

use chrono::Utc;
use colored::Colorize;
use inquire::{Confirm, MultiSelect, Select, Text};

use naarad::aggregator::{Action, Feedback, Navigation};
use naarad::api::{BackendClient, Session};
use naarad::config::Config;
use naarad::db::Database;
use naarad::error::{NaaradError, Result};
use naarad::llm::{self, TextGenerator};
use naarad::preferences::{Alert, UpdateFrequency};
use naarad::store::PreferenceStore;
use naarad::taxonomy::{taxonomy, CategoryId, CategoryKey, FollowUpQuestion, Tag, NO_PREFERENCE, OTHER_SPORT_ID};
use naarad::tuning::{TuningSession, MIN_FEEDBACK_COUNT};
use naarad::validation::validate;

use super::alerts::{print_alert_summary, print_sample};
use crate::utils::{open_store, prompt_error, require_terminal};

type Store = PreferenceStore<Database>;

/// Menu entry showing a label but carrying a value
struct Choice<T> {
    label: String,
    value: T,
}

impl<T> Choice<T> {
    fn new(label: impl Into<String>, value: T) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

impl<T> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

pub fn cmd_new(name: Option<String>) -> Result<()> {
    require_terminal()?;
    let mut store = open_store()?;

    if let Some(draft) = store.active_alert() {
        let discard = Confirm::new(&format!(
            "You have an unsaved alert '{}'. Discard it and start over?",
            draft.name
        ))
        .with_default(false)
        .prompt()
        .map_err(prompt_error)?;

        if !discard {
            println!("Keeping it. Run `naarad resume` to continue.");
            return Ok(());
        }
        store.discard_draft()?;
    }

    store.start_new_alert(Utc::now())?;
    if let Some(name) = name {
        store.dispatch(Action::Rename(name))?;
    }
    run_wizard(&mut store)
}

pub fn cmd_resume() -> Result<()> {
    require_terminal()?;
    let mut store = open_store()?;
    let name = store
        .active_alert()
        .map(|a| a.name.clone())
        .ok_or(NaaradError::NoActiveAlert)?;
    println!("Resuming '{}'.", name.bold());
    run_wizard(&mut store)
}

/// Run every step against the draft already in the store
pub fn run_wizard(store: &mut Store) -> Result<()> {
    let config = Config::load()?;
    let generator = llm::generator_from_config(&config.llm);

    if Session::load(store.kv())?.is_none() {
        println!(
            "{} You are not logged in. You can build the alert now, but saving needs `naarad login`.",
            "!".yellow()
        );
    }

    interest_step(store)?;
    ai_follow_up_step(store, generator.as_deref())?;
    tuning_step(store, generator.as_deref())?;
    frequency_step(store)?;
    review_step(store, &config, generator.as_deref())
}

fn draft(store: &Store) -> Result<(Alert, Navigation)> {
    let alert = store.active_alert().cloned().ok_or(NaaradError::NoActiveAlert)?;
    let nav = store.navigation().cloned().unwrap_or_default();
    Ok((alert, nav))
}

fn heading(title: &str) {
    println!("\n{}", title.bold().cyan());
}

/// Repeat the interest questions until the selection validates
fn interest_step(store: &mut Store) -> Result<()> {
    heading("What do you want updates about?");

    loop {
        choose_main_category(store)?;
        let (_, nav) = draft(store)?;

        match nav.main {
            Some(CategoryId::Custom) => custom_interests(store)?,
            Some(id) => {
                if let Some(key) = id.key() {
                    choose_sub_category(store, id)?;
                    choose_tags(store, id, key)?;
                    answer_follow_ups(store, id, key)?;
                    choose_instructions(store, id, key)?;
                }
            }
            None => {}
        }

        let (alert, nav) = draft(store)?;
        let errors = validate(&alert, &nav);
        match errors.first() {
            None => return Ok(()),
            Some((section, message)) => {
                tracing::debug!(%section, "validation failed");
                println!("\n{} {}\n", "✗".red(), message.red());
            }
        }
    }
}

fn choose_main_category(store: &mut Store) -> Result<()> {
    let (_, nav) = draft(store)?;
    let choices: Vec<Choice<CategoryId>> = taxonomy()
        .categories()
        .iter()
        .map(|c| Choice::new(c.label.clone(), c.id))
        .collect();
    let cursor = choices
        .iter()
        .position(|c| Some(c.value) == nav.main)
        .unwrap_or(0);

    let picked = Select::new("Category:", choices)
        .with_starting_cursor(cursor)
        .prompt()
        .map_err(prompt_error)?;

    // Selecting the current category again would deselect it
    if nav.main != Some(picked.value) {
        store.dispatch(Action::SelectMainCategory(picked.value))?;
    }
    Ok(())
}

fn choose_sub_category(store: &mut Store, id: CategoryId) -> Result<()> {
    let Some(category) = taxonomy().category(id) else {
        return Ok(());
    };
    if !category.has_sub_categories() {
        return Ok(());
    }

    let (alert, nav) = draft(store)?;
    let choices: Vec<Choice<String>> = category
        .sub_categories
        .iter()
        .map(|s| Choice::new(s.label.clone(), s.id.clone()))
        .collect();
    let cursor = choices
        .iter()
        .position(|c| Some(c.value.as_str()) == nav.sub.as_deref())
        .unwrap_or(0);

    let picked = Select::new(&format!("Which {}?", category.label), choices)
        .with_starting_cursor(cursor)
        .prompt()
        .map_err(prompt_error)?;

    if nav.sub.as_deref() != Some(picked.value.as_str()) {
        store.dispatch(Action::SelectSubCategory(picked.value.clone()))?;
    }

    if picked.value == OTHER_SPORT_ID {
        let current = alert.sports().other_sport_name.clone().unwrap_or_default();
        let name = Text::new("Which sport?")
            .with_initial_value(&current)
            .prompt()
            .map_err(prompt_error)?;
        store.dispatch(Action::SetOtherSportName(name.trim().to_string()))?;
    }
    Ok(())
}

fn choose_tags(store: &mut Store, id: CategoryId, key: CategoryKey) -> Result<()> {
    let (alert, nav) = draft(store)?;
    let tags: &[Tag] = match nav.sub.as_deref().and_then(|s| taxonomy().sub_category(id, s)) {
        Some(sub) if !sub.tags.is_empty() => &sub.tags,
        _ => taxonomy().category(id).map(|c| c.tags.as_slice()).unwrap_or(&[]),
    };
    if tags.is_empty() {
        return Ok(());
    }

    let selected = &alert.category(key).selected_tags;
    let defaults: Vec<usize> = tags
        .iter()
        .enumerate()
        .filter(|(_, t)| selected.contains(&t.id))
        .map(|(i, _)| i)
        .collect();
    let choices: Vec<Choice<String>> = tags
        .iter()
        .map(|t| Choice::new(t.label.clone(), t.id.clone()))
        .collect();

    let picked = MultiSelect::new("Topics:", choices)
        .with_default(&defaults)
        .prompt()
        .map_err(prompt_error)?;
    let wanted: Vec<&str> = picked.iter().map(|c| c.value.as_str()).collect();

    for tag in tags {
        let is_selected = selected.contains(&tag.id);
        if is_selected != wanted.contains(&tag.id.as_str()) {
            store.dispatch(Action::ToggleTag {
                category: key,
                tag_id: tag.id.clone(),
            })?;
        }
    }
    Ok(())
}

fn answer_follow_ups(store: &mut Store, id: CategoryId, key: CategoryKey) -> Result<()> {
    let (_, nav) = draft(store)?;
    let sub = nav.sub.clone();
    let questions: Vec<FollowUpQuestion> = taxonomy().questions_for(id, sub.as_deref()).to_vec();
    if questions.is_empty() {
        return Ok(());
    }

    if let Some(helper) = taxonomy().category(id).and_then(|c| c.follow_up_helper_text.as_ref()) {
        println!("{}", helper.dimmed());
    }

    for question in &questions {
        let options = taxonomy().answer_options(id, sub.as_deref(), question);
        if question.is_single_select {
            answer_single(store, key, question, &options)?;
        } else {
            answer_multi(store, key, question, &options)?;
        }

        if question.has_other_option {
            answer_other(store, key, question)?;
        }
    }
    Ok(())
}

fn current_answer(store: &Store, key: CategoryKey, question_id: &str) -> Result<(Vec<String>, Option<String>)> {
    let (alert, _) = draft(store)?;
    Ok(alert
        .category(key)
        .follow_up_answers
        .get(question_id)
        .map(|a| (a.selected_predefined_tags.clone(), a.custom_answer_via_other.clone()))
        .unwrap_or_default())
}

fn toggle_answer(store: &mut Store, key: CategoryKey, question_id: &str, label: &str) -> Result<()> {
    store.dispatch(Action::ToggleFollowUpTag {
        category: key,
        question_id: question_id.to_string(),
        label: label.to_string(),
    })?;
    Ok(())
}

fn answer_single(store: &mut Store, key: CategoryKey, question: &FollowUpQuestion, options: &[Tag]) -> Result<()> {
    let (selected, _) = current_answer(store, key, &question.id)?;

    let mut choices: Vec<Choice<Option<String>>> = vec![Choice::new("(skip)", None)];
    choices.extend(options.iter().map(|t| Choice::new(t.label.clone(), Some(t.label.clone()))));
    let cursor = choices
        .iter()
        .position(|c| c.value.as_ref().is_some_and(|l| selected.contains(l)))
        .unwrap_or(0);

    let mut prompt = Select::new(&question.text, choices).with_starting_cursor(cursor);
    if let Some(help) = &question.helper_text {
        prompt = prompt.with_help_message(help);
    }
    let picked = prompt.prompt().map_err(prompt_error)?;

    match picked.value {
        Some(label) if !selected.contains(&label) => toggle_answer(store, key, &question.id, &label),
        Some(_) => Ok(()),
        // Toggling the chosen label again clears it
        None => match selected.first() {
            Some(label) => toggle_answer(store, key, &question.id, label),
            None => Ok(()),
        },
    }
}

fn answer_multi(store: &mut Store, key: CategoryKey, question: &FollowUpQuestion, options: &[Tag]) -> Result<()> {
    let (selected, _) = current_answer(store, key, &question.id)?;

    let defaults: Vec<usize> = options
        .iter()
        .enumerate()
        .filter(|(_, t)| selected.contains(&t.label))
        .map(|(i, _)| i)
        .collect();
    let labels: Vec<String> = options.iter().map(|t| t.label.clone()).collect();

    let mut prompt = MultiSelect::new(&question.text, labels).with_default(&defaults);
    if let Some(help) = &question.helper_text {
        prompt = prompt.with_help_message(help);
    }
    let wanted = prompt.prompt().map_err(prompt_error)?;

    if wanted.iter().any(|l| l == NO_PREFERENCE) {
        if selected != [NO_PREFERENCE] {
            toggle_answer(store, key, &question.id, NO_PREFERENCE)?;
        }
        return Ok(());
    }

    if selected == [NO_PREFERENCE] && wanted.is_empty() {
        return toggle_answer(store, key, &question.id, NO_PREFERENCE);
    }

    for label in selected.iter().filter(|l| *l != NO_PREFERENCE && !wanted.contains(*l)) {
        toggle_answer(store, key, &question.id, label)?;
    }
    for label in wanted.iter().filter(|l| !selected.contains(*l)) {
        toggle_answer(store, key, &question.id, label)?;
    }
    Ok(())
}

fn answer_other(store: &mut Store, key: CategoryKey, question: &FollowUpQuestion) -> Result<()> {
    let (selected, custom) = current_answer(store, key, &question.id)?;
    if selected == [NO_PREFERENCE] {
        return Ok(());
    }

    let current = custom.unwrap_or_default();
    let text = Text::new("Other (leave blank to skip):")
        .with_initial_value(&current)
        .prompt()
        .map_err(prompt_error)?;
    let text = text.trim();

    if text != current.trim() {
        store.dispatch(Action::SetFollowUpOtherText {
            category: key,
            question_id: question.id.clone(),
            text: text.to_string(),
        })?;
    }
    Ok(())
}

fn choose_instructions(store: &mut Store, id: CategoryId, key: CategoryKey) -> Result<()> {
    let (alert, nav) = draft(store)?;
    let suggestions = taxonomy().popular_instructions(id, nav.sub.as_deref());
    let current = alert.category(key).instruction_tags.clone();

    if !suggestions.is_empty() {
        let defaults: Vec<usize> = suggestions
            .iter()
            .enumerate()
            .filter(|(_, t)| current.contains(&t.label))
            .map(|(i, _)| i)
            .collect();
        let labels: Vec<String> = suggestions.iter().map(|t| t.label.clone()).collect();

        let wanted = MultiSelect::new("Special instructions:", labels.clone())
            .with_default(&defaults)
            .with_help_message("How should updates be written for you?")
            .prompt()
            .map_err(prompt_error)?;

        for label in labels {
            if current.contains(&label) != wanted.contains(&label) {
                store.dispatch(Action::ToggleInstructionTag { category: key, label })?;
            }
        }
    }

    loop {
        let extra = Text::new("Add your own instruction (blank to continue):")
            .prompt()
            .map_err(prompt_error)?;
        if extra.trim().is_empty() {
            return Ok(());
        }
        store.dispatch(Action::AddInstructionTag {
            category: key,
            label: extra,
        })?;
    }
}

fn custom_interests(store: &mut Store) -> Result<()> {
    let (alert, _) = draft(store)?;
    let popular: Vec<String> = taxonomy()
        .category(CategoryId::Custom)
        .map(|c| c.tags.iter().map(|t| t.label.clone()).collect())
        .unwrap_or_default();

    if !popular.is_empty() {
        let defaults: Vec<usize> = popular
            .iter()
            .enumerate()
            .filter(|(_, l)| alert.custom_interest_tags.contains(l))
            .map(|(i, _)| i)
            .collect();
        let wanted = MultiSelect::new("Popular interests:", popular.clone())
            .with_default(&defaults)
            .prompt()
            .map_err(prompt_error)?;

        for label in popular {
            if alert.custom_interest_tags.contains(&label) != wanted.contains(&label) {
                store.dispatch(Action::ToggleCustomInterestTag(label))?;
            }
        }
    }

    let (alert, _) = draft(store)?;
    let own: Vec<String> = alert
        .custom_interest_tags
        .iter()
        .filter(|t| !taxonomy_custom_label(t))
        .cloned()
        .collect();
    if !own.is_empty() {
        let all: Vec<usize> = (0..own.len()).collect();
        let keep = MultiSelect::new("Your interests (untick to remove):", own.clone())
            .with_default(&all)
            .prompt()
            .map_err(prompt_error)?;
        for label in own.into_iter().filter(|l| !keep.contains(l)) {
            store.dispatch(Action::RemoveCustomInterestTag(label))?;
        }
    }

    loop {
        let extra = Text::new("Add an interest (blank to continue):")
            .with_help_message("Anything: a company, a hobby, a person, a topic")
            .prompt()
            .map_err(prompt_error)?;
        if extra.trim().is_empty() {
            return Ok(());
        }
        store.dispatch(Action::AddCustomInterestTag(extra))?;
    }
}

fn taxonomy_custom_label(label: &str) -> bool {
    taxonomy()
        .category(CategoryId::Custom)
        .is_some_and(|c| c.tags.iter().any(|t| t.label == label))
}

fn ai_follow_up_step(store: &mut Store, generator: Option<&dyn TextGenerator>) -> Result<()> {
    let Some(generator) = generator else {
        return Ok(());
    };
    let (alert, nav) = draft(store)?;
    let Some(key) = nav.main.and_then(|id| id.key()) else {
        return Ok(());
    };

    if !alert.category(key).ai_questions_attempted {
        let wanted = Confirm::new("Answer a few AI-suggested questions to sharpen this alert?")
            .with_default(false)
            .prompt()
            .map_err(prompt_error)?;
        if !wanted {
            return Ok(());
        }

        let questions = match llm::generate_follow_up_questions(generator, &alert, key) {
            Ok(questions) => questions,
            Err(e) => {
                tracing::warn!(error = %e, "follow-up question generation failed");
                println!("{} Could not get questions: {}", "!".yellow(), e);
                Vec::new()
            }
        };
        store.dispatch(Action::SetAiFollowUpQuestions {
            category: key,
            questions,
        })?;
    }

    let (alert, _) = draft(store)?;
    for question in alert.category(key).ai_follow_up_questions.iter() {
        let answer = Text::new(&question.question)
            .with_initial_value(&question.answer)
            .prompt()
            .map_err(prompt_error)?;
        if answer.trim() != question.answer {
            store.dispatch(Action::AnswerAiFollowUpQuestion {
                category: key,
                id: question.id.clone(),
                answer: answer.trim().to_string(),
            })?;
        }
    }
    Ok(())
}

fn tuning_step(store: &mut Store, generator: Option<&dyn TextGenerator>) -> Result<()> {
    let (alert, _) = draft(store)?;
    if alert.tuning_feedback.count() >= MIN_FEEDBACK_COUNT {
        let again = Confirm::new("Tune this alert again with fresh samples?")
            .with_default(false)
            .prompt()
            .map_err(prompt_error)?;
        if !again {
            return Ok(());
        }
    }

    heading("Let's calibrate: rate a few sample updates");
    println!("{}", "Generating samples...".dimmed());

    let mut session = TuningSession::new();
    session.load(llm::generate_tuning_samples(generator, &alert));
    if session.was_padded() {
        println!("{}", "Fewer samples than expected, some cards are placeholders.".dimmed());
    }

    while let Some(sample) = session.current().cloned() {
        println!();
        print_sample(&sample);

        let choices = vec![
            Choice::new("👍 More like this", Feedback::Like),
            Choice::new("👎 Less like this", Feedback::Dislike),
        ];
        let picked = Select::new(
            &format!("Sample {}/{}", session.feedback_count() + 1, MIN_FEEDBACK_COUNT),
            choices,
        )
        .prompt()
        .map_err(prompt_error)?;

        if let Some(action) = session.record(picked.value) {
            store.dispatch(action)?;
        }
    }

    if session.can_continue() {
        println!("{} Thanks, feedback recorded.", "✓".green());
    }
    Ok(())
}

fn frequency_step(store: &mut Store) -> Result<()> {
    let (alert, _) = draft(store)?;
    heading("How often?");

    let choices: Vec<Choice<UpdateFrequency>> = UpdateFrequency::ALL
        .iter()
        .map(|f| {
            let label = if f.is_selectable() {
                f.as_str().to_string()
            } else {
                format!("{} (coming soon)", f.as_str())
            };
            Choice::new(label, *f)
        })
        .collect();
    let selectable: Vec<usize> = choices
        .iter()
        .enumerate()
        .filter(|(_, c)| c.value.is_selectable())
        .map(|(i, _)| i)
        .collect();
    let cursor = choices
        .iter()
        .position(|c| c.value == alert.frequency && c.value.is_selectable())
        .or_else(|| selectable.first().copied())
        .unwrap_or(0);

    loop {
        let picked = Select::new("Update frequency:", choices.iter().collect())
            .with_starting_cursor(cursor)
            .prompt()
            .map_err(prompt_error)?;

        if picked.value.is_selectable() {
            store.dispatch(Action::SetFrequency(picked.value))?;
            return Ok(());
        }
        println!("{}", "That option is not available yet.".yellow());
    }
}

fn review_step(store: &mut Store, config: &Config, generator: Option<&dyn TextGenerator>) -> Result<()> {
    heading("Review");
    let (alert, _) = draft(store)?;

    let name = Text::new("Alert name:")
        .with_initial_value(&alert.name)
        .prompt()
        .map_err(prompt_error)?;
    if name.trim() != alert.name {
        store.dispatch(Action::Rename(name))?;
    }

    let (alert, _) = draft(store)?;
    println!();
    print_alert_summary(&alert);

    println!("\n{}", "Sample update:".bold());
    print_sample(&llm::generate_sample_message(generator, &alert));

    let save = Confirm::new("Save this alert?")
        .with_default(true)
        .prompt()
        .map_err(prompt_error)?;
    if !save {
        println!("Draft kept. Run `naarad resume` to continue.");
        return Ok(());
    }

    let session = Session::require(store.kv())?;
    let client = BackendClient::new(&config.api_base_url, session.token.clone());
    let submitted = store.submit_active_alert(&client, &session, Utc::now())?;

    let saved = &submitted.alert;
    println!("\n{} Saved '{}' ({})", "✓".green(), saved.name.bold(), saved.id);
    if let Some(remote_id) = &saved.remote_alert_id {
        println!("  Backend alert id: {}", remote_id);
    }
    if let Some(old) = &submitted.replaced_remote_id {
        println!("  Replaced backend alert {}", old);
    }
    if let Some(message) = &submitted.message {
        println!("  {}", message.dimmed());
    }
    Ok(())
}
