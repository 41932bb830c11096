use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "keysmith")]
#[command(version, about = "Keysmith - API key issuance, rotation and revocation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (defaults to ~/.keysmith/keysmith.db)
    #[arg(long, global = true, env = "KEYSMITH_DB_PATH")]
    pub db_path: Option<String>,

    /// Env file read for settings missing from the environment (defaults to ./.env)
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Name recorded as creator/updater
    #[arg(long, global = true, env = "KEYSMITH_ACTOR_NAME")]
    pub actor_name: Option<String>,

    /// Email recorded as creator/updater
    #[arg(long, global = true, env = "KEYSMITH_ACTOR_EMAIL")]
    pub actor_email: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Issue a new API key
    Create(CreateArgs),

    /// Issue an API key on behalf of a plugin
    CreatePlugin(CreatePluginArgs),

    /// Replace the key of an existing record
    Rotate { id: u64 },

    /// Delete an API key
    Delete { id: u64 },

    /// Revoke the first plugin key matching the filters
    RevokePlugin(RevokePluginArgs),

    /// Show a stored API key
    Show { id: u64 },

    /// List stored API keys
    List,

    /// Print the stored digest of a token
    Digest { token: String },
}

#[derive(Args)]
pub struct CreateArgs {
    /// Unique key name
    #[arg(long)]
    pub name: String,

    /// Regular expression of request paths the key may access
    #[arg(long)]
    pub allowed_path: String,

    /// Expiry time (RFC 3339); omit for a non-expiring key
    #[arg(long)]
    pub expires_at: Option<DateTime<Utc>>,

    /// Key type tag
    #[arg(long = "type", default_value = "api")]
    pub key_type: String,

    /// Free-form correlation value
    #[arg(long, default_value = "")]
    pub extra: String,
}

#[derive(Args)]
pub struct CreatePluginArgs {
    #[arg(long)]
    pub name: String,

    /// Plugin issuing the key; stored as type plugin:<name>
    #[arg(long)]
    pub plugin: String,

    #[arg(long)]
    pub allowed_path: String,

    #[arg(long, default_value = "")]
    pub extra: String,
}

#[derive(Args)]
pub struct RevokePluginArgs {
    #[arg(long, default_value = "")]
    pub plugin: String,

    #[arg(long, default_value = "")]
    pub extra: String,
}
