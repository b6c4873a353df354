use colored::Colorize;
use inquire::Confirm;

use naarad::api::{BackendClient, Session};
use naarad::config::Config;
use naarad::error::{NaaradError, Result};
use naarad::llm;
use naarad::payload::to_api_payload;
use naarad::preferences::Alert;
use naarad::prompt::SampleMessage;
use naarad::taxonomy::{taxonomy, CategoryKey};

use super::wizard::run_wizard;
use crate::utils::{join_or, open_store, prompt_error, require_terminal, truncate_str, use_color};

pub fn cmd_alerts_list(remote: bool, json: bool) -> Result<()> {
    if remote {
        return list_remote(json);
    }

    let store = open_store()?;
    let alerts = &store.user().alerts;

    if json {
        println!("{}", serde_json::to_string_pretty(alerts)?);
        return Ok(());
    }

    if alerts.is_empty() {
        println!("No alerts saved. Run `naarad new` to create one.");
    } else {
        let use_color = use_color();
        let max_name_len = alerts.iter().map(|a| a.name.chars().count()).max().unwrap_or(20).min(30);

        println!("\nAlerts:\n");
        for alert in alerts {
            let status = if alert.is_active {
                if use_color { "●".green().to_string() } else { "[active]".to_string() }
            } else if use_color {
                "○".yellow().to_string()
            } else {
                "[paused]".to_string()
            };
            let name = truncate_str(&alert.name, max_name_len);
            println!(
                "  {} {:<width$}  {}  {}",
                status,
                name.bold(),
                alert.id.dimmed(),
                alert.frequency,
                width = max_name_len
            );
        }
        println!();
    }

    if let Some(draft) = store.active_alert() {
        println!("Unsaved: '{}'. Run `naarad resume` to continue.", draft.name);
    }
    Ok(())
}

fn list_remote(json: bool) -> Result<()> {
    let store = open_store()?;
    let session = Session::require(store.kv())?;
    let config = Config::load()?;
    let client = BackendClient::new(&config.api_base_url, session.token);
    let alerts = client.list_alerts(&session.user_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&alerts)?);
        return Ok(());
    }

    if alerts.is_empty() {
        println!("No alerts on the backend.");
        return Ok(());
    }

    println!("\nBackend alerts:\n");
    for alert in alerts {
        println!("  {} {}", alert.alert_id.bold(), alert.main_category);
        if !alert.sub_categories.is_empty() {
            println!("    Topics:    {}", alert.sub_categories.join(", "));
        }
        for answer in &alert.followup_questions {
            println!("    Follow-up: {}", truncate_str(answer, 70));
        }
        if !alert.custom_question.is_empty() {
            println!("    Custom:    {}", truncate_str(&alert.custom_question, 70));
        }
        if let Some(frequency) = &alert.frequency {
            println!("    Frequency: {}", frequency);
        }
        println!();
    }
    Ok(())
}

pub fn cmd_alerts_show(id: &str, json: bool) -> Result<()> {
    let store = open_store()?;
    let alert = store
        .user()
        .find_alert(id)
        .ok_or_else(|| NaaradError::AlertNotFound(id.to_string()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(alert)?);
    } else {
        print_alert_summary(alert);
    }
    Ok(())
}

pub fn cmd_alerts_edit(id: &str) -> Result<()> {
    require_terminal()?;
    let mut store = open_store()?;
    store.select_alert_for_editing(id)?;
    run_wizard(&mut store)
}

pub fn cmd_alerts_delete(id: &str, remote: bool, yes: bool) -> Result<()> {
    let mut store = open_store()?;

    let label = if remote {
        format!("backend alert {}", id)
    } else {
        let alert = store
            .user()
            .find_alert(id)
            .ok_or_else(|| NaaradError::AlertNotFound(id.to_string()))?;
        format!("'{}'", alert.name)
    };

    if !yes {
        let confirmed = Confirm::new(&format!("Delete {}?", label))
            .with_default(false)
            .prompt()
            .map_err(prompt_error)?;

        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    if remote {
        let session = Session::require(store.kv())?;
        let config = Config::load()?;
        let client = BackendClient::new(&config.api_base_url, session.token);
        let message = client.delete_alert(&session.user_id, id)?;
        println!("{}", message);
    } else {
        let removed = match Session::load(store.kv())? {
            Some(session) => {
                let config = Config::load()?;
                let client = BackendClient::new(&config.api_base_url, session.token.clone());
                store.delete_alert_with_backend(id, &client, &session)?
            }
            None => store.delete_alert(id)?,
        };
        if removed {
            println!("Deleted {}.", label);
        }
    }
    Ok(())
}

pub fn cmd_alerts_toggle(id: &str) -> Result<()> {
    let mut store = open_store()?;
    store.update_alert(id, |alert| alert.is_active = !alert.is_active)?;

    let active = store.user().find_alert(id).is_some_and(|a| a.is_active);
    println!("{} is now {}.", id, if active { "active" } else { "paused" });
    Ok(())
}

/// Saved alert by id, or the draft in progress
fn alert_or_draft(id: Option<&str>) -> Result<Alert> {
    let store = open_store()?;
    match id {
        Some(id) => store
            .user()
            .find_alert(id)
            .cloned()
            .ok_or_else(|| NaaradError::AlertNotFound(id.to_string())),
        None => store.active_alert().cloned().ok_or(NaaradError::NoActiveAlert),
    }
}

pub fn cmd_alerts_payload(id: Option<&str>) -> Result<()> {
    let alert = alert_or_draft(id)?;
    println!("{}", serde_json::to_string_pretty(&to_api_payload(&alert))?);
    Ok(())
}

pub fn cmd_sample(id: Option<&str>) -> Result<()> {
    let alert = alert_or_draft(id)?;
    let config = Config::load()?;
    let generator = llm::generator_from_config(&config.llm);

    println!("{}", "Generating sample...".dimmed());
    print_sample(&llm::generate_sample_message(generator.as_deref(), &alert));
    Ok(())
}

/// Human summary of an alert's preferences
pub(crate) fn print_alert_summary(alert: &Alert) {
    let status = if alert.is_active { "active".green() } else { "paused".yellow() };
    println!("{} ({})", alert.name.bold(), alert.id.dimmed());
    println!("  Status:    {}", status);
    println!("  Frequency: {}", alert.frequency);

    for key in CategoryKey::ALL {
        let prefs = alert.category(key);
        let answered: Vec<_> = prefs.follow_up_answers.iter().filter(|(_, a)| a.is_answered()).collect();
        if prefs.selected_tags.is_empty() && answered.is_empty() && prefs.instruction_tags.is_empty() {
            continue;
        }

        println!("  {}:", key.label().bold());
        let labels: Vec<String> = prefs.selected_tags.iter().map(|t| taxonomy().tag_label(t)).collect();
        println!("    Topics:       {}", join_or(&labels, "-"));
        if let Some(sport) = prefs.other_sport() {
            println!("    Sport:        {}", sport);
        }
        for (question_id, answer) in answered {
            let mut parts = answer.selected_predefined_tags.clone();
            if let Some(custom) = answer.custom_text() {
                parts.push(custom.to_string());
            }
            println!(
                "    {} {}",
                format!("{}:", taxonomy().question_text(key, question_id)).dimmed(),
                parts.join(", ")
            );
        }
        for question in prefs.ai_follow_up_questions.iter().filter(|q| !q.answer.is_empty()) {
            println!("    {} {}", format!("{}:", question.question).dimmed(), question.answer);
        }
        if !prefs.instruction_tags.is_empty() {
            println!("    Instructions: {}", prefs.instruction_tags.join(", "));
        }
    }

    if !alert.custom_interest_tags.is_empty() {
        println!("  Custom:    {}", alert.custom_interest_tags.join(", "));
    }
    let feedback = &alert.tuning_feedback;
    if feedback.count() > 0 {
        println!("  Tuning:    {} liked, {} disliked", feedback.liked.len(), feedback.disliked.len());
    }
}

/// A sample message as a chat-style card
pub(crate) fn print_sample(sample: &SampleMessage) {
    let icon = sample.image_url.as_deref().unwrap_or("💬");
    println!("  {} {}", icon, sample.summary_text);
    if let Some(why) = &sample.why_showing {
        println!("     {}", why.dimmed().italic());
    }
    if let Some(action) = &sample.action_text {
        println!("     [{}]", action.cyan());
    }
}
