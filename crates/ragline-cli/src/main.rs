//! Ragline CLI
//!
//! Operator tooling for the Ragline control plane: session login, API-key
//! administration and partner-token management.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

#[derive(Parser)]
#[command(name = "ragline")]
#[command(author, version, about = "Ragline - RAG control-plane admin tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to the dashboard
    Login {
        /// Username (prompted when omitted)
        #[arg(short, long)]
        username: Option<String>,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Log out and clear the local session
    Logout,

    /// Show the current session user
    Whoami,

    /// Manage API keys
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Manage partner credentials and tokens
    Partner {
        #[command(subcommand)]
        action: PartnerAction,
    },
}

#[derive(Subcommand)]
enum KeysAction {
    /// List API keys
    List {
        /// Filter by owner
        #[arg(long)]
        owner: Option<String>,

        /// Filter by scope
        #[arg(long)]
        scope: Option<String>,

        /// Only active (or only inactive) keys
        #[arg(long)]
        active: Option<bool>,

        /// Free-text search
        #[arg(long)]
        search: Option<String>,

        /// Page size
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Create a new API key (the secret is shown exactly once)
    Create {
        /// Key owner
        #[arg(long)]
        owner: String,

        /// Scopes granted to the key (repeatable)
        #[arg(long = "scope", required = true)]
        scopes: Vec<String>,

        /// Requests per minute
        #[arg(long)]
        rate_limit: Option<i64>,
    },

    /// Rotate a key's secret
    Rotate {
        /// Key ID
        id: String,
    },

    /// Revoke a key (terminal)
    Revoke {
        /// Key ID
        id: String,

        /// Reason recorded in the audit log
        #[arg(long)]
        reason: Option<String>,
    },

    /// Show the key audit event log
    Events {
        /// Filter by key ID
        #[arg(long)]
        key: Option<String>,

        /// Filter by event type
        #[arg(long)]
        event_type: Option<String>,

        /// Page size
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Subcommand)]
enum PartnerAction {
    /// Store partner credentials
    Configure,

    /// Obtain a partner token (cached when still fresh)
    Token {
        /// Skip the cache and exchange credentials again
        #[arg(long)]
        force: bool,
    },

    /// Show partner credential/token status
    Status,

    /// Forget stored partner credentials and tokens
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let result = match cli.command {
        Commands::Login { username, password } => commands::auth::login(username, password).await,
        Commands::Logout => commands::auth::logout().await,
        Commands::Whoami => commands::auth::whoami().await,
        Commands::Keys { action } => match action {
            KeysAction::List {
                owner,
                scope,
                active,
                search,
                limit,
            } => commands::keys::list(owner, scope, active, search, limit).await,
            KeysAction::Create {
                owner,
                scopes,
                rate_limit,
            } => commands::keys::create(owner, scopes, rate_limit).await,
            KeysAction::Rotate { id } => commands::keys::rotate(&id).await,
            KeysAction::Revoke { id, reason } => commands::keys::revoke(&id, reason).await,
            KeysAction::Events {
                key,
                event_type,
                limit,
            } => commands::keys::events(key, event_type, limit).await,
        },
        Commands::Partner { action } => match action {
            PartnerAction::Configure => commands::partner::configure().await,
            PartnerAction::Token { force } => commands::partner::token(force).await,
            PartnerAction::Status => commands::partner::status().await,
            PartnerAction::Clear => commands::partner::clear().await,
        },
    };

    if let Err(e) = &result {
        eprintln!("{}", format!("❌ {e}").red());
        std::process::exit(1);
    }

    result
}
