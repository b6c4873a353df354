use std::io;

use chrono::Utc;
use clap::CommandFactory;
use clap_complete::{generate, Shell};
use colored::Colorize;

use naarad::aggregator::Action;
use naarad::capture::capture_url;
use naarad::cli::{Cli, CompletionShell};
use naarad::config::{Config, LlmProvider};
use naarad::error::{NaaradError, Result};
use naarad::rss::{self, RssService};
use naarad::taxonomy::{taxonomy, CategoryId, FollowUpQuestion, MainCategory};

use crate::utils::{open_store, truncate_str};

pub fn cmd_feeds(
    categories: Vec<String>,
    alert: Option<String>,
    limit: usize,
    prompt: bool,
    json: bool,
) -> Result<()> {
    let names: Vec<String> = match alert {
        Some(id) => {
            let store = open_store()?;
            let alert = store
                .user()
                .find_alert(&id)
                .ok_or_else(|| NaaradError::AlertNotFound(id.clone()))?;
            rss::categories_for_alert(alert).into_iter().map(String::from).collect()
        }
        None => categories,
    };

    for name in &names {
        if rss::feeds_for(name).is_empty() {
            eprintln!(
                "{} No feeds for '{}'. Known: {}",
                "!".yellow(),
                name,
                rss::CATEGORY_FEEDS.iter().map(|(c, _)| *c).collect::<Vec<_>>().join(", ")
            );
        }
    }

    let config = Config::load()?;
    let mut service = RssService::from_config(&config);
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let items = rss::recent_items(service.fetch_by_categories(&refs), limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if prompt {
        println!("{}", rss::format_for_prompt(&items));
        return Ok(());
    }

    if items.is_empty() {
        println!("No recent items.");
        return Ok(());
    }

    for item in items {
        let date = item
            .pub_date
            .map(|d| d.format("%b %-d %H:%M").to_string())
            .unwrap_or_default();
        println!("{} {}", date.dimmed(), item.title.bold());
        if !item.description.is_empty() {
            println!("  {}", truncate_str(&item.description, 100));
        }
        println!("  {}", item.link.cyan());
    }
    Ok(())
}

pub fn cmd_capture(url: &str) -> Result<()> {
    let topic = capture_url(url)?;

    let mut store = open_store()?;
    if store.active_alert().is_none() {
        store.start_new_alert(Utc::now())?;
    }

    let already = store
        .active_alert()
        .is_some_and(|a| a.custom_interest_tags.contains(&topic));
    if already {
        println!("'{}' is already added.", topic);
        return Ok(());
    }

    let alert = store.dispatch(Action::AddCustomInterestTag(topic.clone()))?;
    println!(
        "{} Added '{}' to {}. Run `naarad resume` to finish it.",
        "✓".green(),
        topic.bold(),
        alert.name
    );
    Ok(())
}

pub fn cmd_taxonomy(category: Option<&str>, json: bool) -> Result<()> {
    let categories: Vec<&MainCategory> = match category {
        Some(name) => {
            let id: CategoryId = name.parse()?;
            taxonomy().category(id).into_iter().collect()
        }
        None => taxonomy().categories().iter().collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
        return Ok(());
    }

    for category in categories {
        println!("\n{} ({})", category.label.bold(), category.id);
        if !category.tags.is_empty() {
            print_labels("Tags", category.tags.iter().map(|t| t.label.as_str()));
        }
        for sub in &category.sub_categories {
            println!("  {} {}", "▸".cyan(), sub.label);
            if !sub.tags.is_empty() {
                print_labels("  Tags", sub.tags.iter().map(|t| t.label.as_str()));
            }
            print_questions("  ", &sub.follow_up_questions);
        }
        print_questions("", &category.follow_up_questions);
    }
    Ok(())
}

fn print_labels<'a>(title: &str, labels: impl Iterator<Item = &'a str>) {
    println!("    {}: {}", title.dimmed(), labels.collect::<Vec<_>>().join(", "));
}

fn print_questions(indent: &str, questions: &[FollowUpQuestion]) {
    for question in questions {
        let kind = if question.is_single_select { "one" } else { "any" };
        println!("  {}  ? {} {}", indent, question.text, format!("({})", kind).dimmed());
    }
}

pub fn cmd_config_show() -> Result<()> {
    let config = Config::load()?;
    println!("Config file: {}", Config::config_path()?.display());
    println!("Database:    {}", Config::db_path()?.display());
    println!();
    println!("API URL:     {}", config.api_base_url);
    println!("LLM:         {:?} ({})", config.llm.provider, config.llm.model);
    let key = match &config.llm.api_key {
        Some(_) => "set".green(),
        None => "not set".yellow(),
    };
    println!("API key:     {}", key);
    println!("RSS cache:   {}s, {} items per feed", config.rss_cache_ttl_secs, config.rss_items_per_feed);
    Ok(())
}

pub fn cmd_config_set_api_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url)?;
    let mut config = Config::load_file()?;
    config.api_base_url = parsed.as_str().trim_end_matches('/').to_string();
    config.save()?;
    println!("API URL set to {}", config.api_base_url);
    Ok(())
}

pub fn cmd_config_set_llm(provider: LlmProvider, model: Option<String>, api_key: Option<String>) -> Result<()> {
    let mut config = Config::load_file()?;
    config.llm.provider = provider;
    if let Some(model) = model {
        config.llm.model = model;
    }
    if let Some(key) = api_key {
        config.llm.api_key = Some(key);
    }
    config.save()?;

    println!("Sample generation: {:?}", provider);
    if provider == LlmProvider::Gemini && config.llm.api_key.is_none() && std::env::var("GEMINI_API_KEY").is_err() {
        println!("{} No API key yet. Pass --api-key or set GEMINI_API_KEY.", "!".yellow());
    }
    Ok(())
}

/// Generate shell completions
pub fn cmd_completions(shell: CompletionShell) -> Result<()> {
    let mut cmd = Cli::command();
    let shell = match shell {
        CompletionShell::Bash => Shell::Bash,
        CompletionShell::Zsh => Shell::Zsh,
        CompletionShell::Fish => Shell::Fish,
        CompletionShell::Powershell => Shell::PowerShell,
    };
    generate(shell, &mut cmd, "naarad", &mut io::stdout());
    Ok(())
}
