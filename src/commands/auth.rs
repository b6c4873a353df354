use colored::Colorize;
use inquire::Confirm;

use naarad::api::{self, BackendClient, LoginRequest, Session};
use naarad::config::Config;
use naarad::error::{NaaradError, Result};

use crate::utils::{open_store, prompt_error};

pub fn cmd_login(email: &str, whatsapp: &str) -> Result<()> {
    api::validate_email(email).map_err(|msg| NaaradError::InvalidInput(msg.to_string()))?;
    api::validate_whatsapp_number(whatsapp)
        .map_err(|msg| NaaradError::InvalidInput(msg.to_string()))?;

    let config = Config::load()?;
    let request = LoginRequest::new(email, whatsapp);
    let client = BackendClient::new(&config.api_base_url, None);
    let outcome = client.login(&request)?;

    let mut store = open_store()?;
    Session {
        user_id: outcome.user_id.clone(),
        token: outcome.token,
    }
    .save(store.kv())?;
    store.update_user(|user| {
        user.email = request.email.clone();
        user.whatsapp_number = whatsapp.trim().to_string();
        user.is_whats_app_confirmed = true;
    })?;

    println!(
        "{} Logged in as {} ({} {})",
        "✓".green(),
        request.email.bold(),
        request.country_code,
        request.phone_number
    );
    if let Some(message) = outcome.message {
        println!("  {}", message.dimmed());
    }

    if store.user().alerts.is_empty() {
        println!("\nNo alerts yet. Run `naarad new` to create your first one.");
    }
    Ok(())
}

pub fn cmd_logout(yes: bool) -> Result<()> {
    if !yes {
        let confirmed = Confirm::new("Log out and forget all local alerts?")
            .with_default(false)
            .prompt()
            .map_err(prompt_error)?;

        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let mut store = open_store()?;
    store.logout()?;
    println!("Logged out.");
    Ok(())
}
