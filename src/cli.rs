use clap::{Parser, Subcommand, ValueEnum};

use crate::config::LlmProvider;

/// Shell types for completion generation
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

/// LLM backends selectable from the command line
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LlmProviderArg {
    Gemini,
    Claude,
    Disabled,
}

impl From<LlmProviderArg> for LlmProvider {
    fn from(arg: LlmProviderArg) -> Self {
        match arg {
            LlmProviderArg::Gemini => LlmProvider::Gemini,
            LlmProviderArg::Claude => LlmProvider::ClaudeCli,
            LlmProviderArg::Disabled => LlmProvider::Disabled,
        }
    }
}

#[derive(Parser)]
#[command(name = "naarad")]
#[command(author, version, about = "Personalized WhatsApp update alerts, built from your interests", long_about = None)]
#[command(after_help = r#"Examples:
  naarad login --email you@example.com --whatsapp +919876543210
  naarad new                                   Build an alert step by step
  naarad resume                                Continue an unsaved alert
  naarad alerts list                           List saved alerts
  naarad alerts payload alert-1718000000000    Show what the backend receives
  naarad feeds news --limit 5                  Peek at recent headlines

Quick Start:
  1. naarad login --email you@example.com --whatsapp +919876543210
  2. naarad new
  3. naarad alerts list --remote
"#)]
pub struct Cli {
    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with your email and WhatsApp number
    #[command(after_help = r#"Examples:
  naarad login --email you@example.com --whatsapp +919876543210
  naarad login --email you@example.com --whatsapp 14155550100
"#)]
    Login {
        /// Email address
        #[arg(long)]
        email: String,

        /// WhatsApp number in international format
        #[arg(long)]
        whatsapp: String,
    },

    /// Forget the session and all local preferences
    Logout {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Create a new alert (interactive wizard)
    #[command(after_help = r#"Examples:
  naarad new
  naarad new --name "Cricket scores"
"#)]
    New {
        /// Name for the alert (asked at the end otherwise)
        #[arg(long)]
        name: Option<String>,
    },

    /// Continue the alert you were editing
    Resume,

    /// Manage saved alerts
    #[command(subcommand)]
    Alerts(AlertsCommands),

    /// Generate a sample WhatsApp message for an alert
    #[command(after_help = r#"Examples:
  naarad sample                       Sample for the draft in progress
  naarad sample alert-1718000000000   Sample for a saved alert
"#)]
    Sample {
        /// Saved alert id (defaults to the draft)
        id: Option<String>,
    },

    /// Show recent headlines for interest categories
    #[command(after_help = r#"Examples:
  naarad feeds news technology
  naarad feeds sports --limit 3
  naarad feeds --alert alert-1718000000000
  naarad feeds news --prompt          Print the block fed to the LLM
"#)]
    Feeds {
        /// Categories: sports, news, technology, moviestv
        #[arg(value_name = "CATEGORY", required_unless_present = "alert")]
        categories: Vec<String>,

        /// Use the categories of a saved alert
        #[arg(long, conflicts_with = "categories")]
        alert: Option<String>,

        /// Maximum number of items
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Print the prompt-ready block instead of a list
        #[arg(long)]
        prompt: bool,

        /// Output as JSON
        #[arg(long, conflicts_with = "prompt")]
        json: bool,
    },

    /// Add a web page's topic as a custom interest of the draft
    #[command(after_help = r#"Examples:
  naarad capture https://blog.rust-lang.org/2024/07/25/Rust-1.80.0.html
"#)]
    Capture {
        /// Page URL
        url: String,
    },

    /// Browse the interest taxonomy
    #[command(after_help = r#"Examples:
  naarad taxonomy
  naarad taxonomy --category sports
"#)]
    Taxonomy {
        /// Only this category
        #[arg(long)]
        category: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change settings
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    #[command(after_help = r#"Examples:
  naarad completions bash >> ~/.bashrc           Add bash completions
  naarad completions zsh >> ~/.zshrc             Add zsh completions
  naarad completions fish > ~/.config/fish/completions/naarad.fish
  naarad completions powershell >> $PROFILE      Add PowerShell completions
"#)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand)]
pub enum AlertsCommands {
    /// List alerts
    List {
        /// List alerts stored on the backend instead of locally
        #[arg(long)]
        remote: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one saved alert
    Show {
        /// Alert id
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-open a saved alert in the wizard
    Edit {
        /// Alert id
        id: String,
    },

    /// Delete an alert
    #[command(after_help = r#"Examples:
  naarad alerts delete alert-1718000000000
  naarad alerts delete 42 --remote --yes     Delete on the backend
"#)]
    Delete {
        /// Alert id (the backend id with --remote)
        id: String,

        /// Delete on the backend instead of locally
        #[arg(long)]
        remote: bool,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Print the backend payload for an alert
    Payload {
        /// Saved alert id (defaults to the draft)
        id: Option<String>,
    },

    /// Pause or resume a saved alert
    Toggle {
        /// Alert id
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the current configuration
    Show,

    /// Point at another backend
    SetApiUrl {
        /// Base URL, e.g. https://naaradupdates.info
        url: String,
    },

    /// Choose how sample messages are generated
    #[command(after_help = r#"Examples:
  naarad config set-llm gemini --api-key AIza...
  naarad config set-llm gemini --model gemini-1.5-pro
  naarad config set-llm claude
  naarad config set-llm disabled
"#)]
    SetLlm {
        /// Provider
        #[arg(value_enum)]
        provider: LlmProviderArg,

        /// Model name (Gemini only)
        #[arg(long)]
        model: Option<String>,

        /// API key (Gemini only; GEMINI_API_KEY also works)
        #[arg(long)]
        api_key: Option<String>,
    },
}
