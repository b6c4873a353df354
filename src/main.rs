//! naarad - build personalized WhatsApp update alerts from the terminal

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use naarad::cli::{AlertsCommands, Cli, Commands, ConfigCommands};
use naarad::error::Result;

mod commands;
mod utils;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        if let Some(hint) = e.hint() {
            eprintln!("{}", hint.dimmed());
        }
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr so `--json` output stays clean
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("naarad=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("naarad=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        // Session
        Commands::Login { email, whatsapp } => commands::cmd_login(&email, &whatsapp),
        Commands::Logout { yes } => commands::cmd_logout(yes),

        // Wizard
        Commands::New { name } => commands::cmd_new(name),
        Commands::Resume => commands::cmd_resume(),

        // Saved alerts
        Commands::Alerts(alerts_cmd) => match alerts_cmd {
            AlertsCommands::List { remote, json } => commands::cmd_alerts_list(remote, json),
            AlertsCommands::Show { id, json } => commands::cmd_alerts_show(&id, json),
            AlertsCommands::Edit { id } => commands::cmd_alerts_edit(&id),
            AlertsCommands::Delete { id, remote, yes } => commands::cmd_alerts_delete(&id, remote, yes),
            AlertsCommands::Payload { id } => commands::cmd_alerts_payload(id.as_deref()),
            AlertsCommands::Toggle { id } => commands::cmd_alerts_toggle(&id),
        },

        Commands::Sample { id } => commands::cmd_sample(id.as_deref()),

        // Content helpers
        Commands::Feeds {
            categories,
            alert,
            limit,
            prompt,
            json,
        } => commands::cmd_feeds(categories, alert, limit, prompt, json),
        Commands::Capture { url } => commands::cmd_capture(&url),
        Commands::Taxonomy { category, json } => commands::cmd_taxonomy(category.as_deref(), json),

        // Settings
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Show => commands::cmd_config_show(),
            ConfigCommands::SetApiUrl { url } => commands::cmd_config_set_api_url(&url),
            ConfigCommands::SetLlm {
                provider,
                model,
                api_key,
            } => commands::cmd_config_set_llm(provider.into(), model, api_key),
        },

        Commands::Completions { shell } => commands::cmd_completions(shell),
    }
}
