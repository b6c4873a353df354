//! Shared helpers for the CLI commands

use std::io::IsTerminal;

use inquire::InquireError;
use naarad::db::Database;
use naarad::error::{NaaradError, Result};
use naarad::store::PreferenceStore;

/// Open the local database and load preferences from it
pub fn open_store() -> Result<PreferenceStore<Database>> {
    PreferenceStore::load(Database::open()?)
}

/// Whether stdout is a terminal that can show colors
pub fn use_color() -> bool {
    std::io::stdout().is_terminal()
}

/// Interactive prompts need a real terminal on both ends
pub fn require_terminal() -> Result<()> {
    if std::io::stdin().is_terminal() && std::io::stdout().is_terminal() {
        Ok(())
    } else {
        Err(NaaradError::InvalidInput(
            "This command is interactive and needs a terminal".into(),
        ))
    }
}

pub fn prompt_error(e: InquireError) -> NaaradError {
    match e {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            NaaradError::PromptError("cancelled by user".into())
        }
        other => NaaradError::PromptError(other.to_string()),
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        chars[..max_len].iter().collect()
    } else {
        format!("{}...", chars[..max_len - 3].iter().collect::<String>())
    }
}

/// Comma-joined list, or a placeholder when empty
pub fn join_or(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join(", ")
    }
}
