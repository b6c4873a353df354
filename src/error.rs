use thiserror::Error;

#[derive(Error, Debug)]
pub enum NaaradError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] ureq::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] refinery::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Backend error: {0}")]
    ApiError(String),

    #[error("LLM request failed: {0}")]
    LlmError(String),

    #[error("Feed parsing error: {0}")]
    FeedParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Alert not found: {0}")]
    AlertNotFound(String),

    #[error("No alert is being edited")]
    NoActiveAlert,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Prompt aborted: {0}")]
    PromptError(String),
}

impl NaaradError {
    /// Get an actionable hint for how to resolve this error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            NaaradError::HttpError(_) => Some(
                "Check your internet connection, or point at another backend:\n  naarad config set-api-url <url>"
            ),
            NaaradError::ApiError(_) => Some(
                "The backend rejected the request. Nothing was retried; run the command again once the issue is fixed"
            ),
            NaaradError::LlmError(_) => Some(
                "Check your LLM settings with `naarad config show`\nOr disable sample generation: naarad config set-llm disabled"
            ),
            NaaradError::AlertNotFound(_) => Some(
                "Run `naarad alerts list` to see saved alerts"
            ),
            NaaradError::NoActiveAlert => Some(
                "Start a new alert with `naarad new`, or edit one with `naarad alerts edit <id>`"
            ),
            NaaradError::NotLoggedIn => Some(
                "Log in first: naarad login --email you@example.com --whatsapp +919876543210"
            ),
            NaaradError::DatabaseError(_) | NaaradError::MigrationError(_) => Some(
                "Local state may be corrupted. Set NAARAD_DB to a fresh path to start over"
            ),
            NaaradError::FeedParseError(_) => Some(
                "Check that the URL points to a valid RSS or Atom feed"
            ),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, NaaradError>;
