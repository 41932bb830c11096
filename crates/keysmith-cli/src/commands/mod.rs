mod digest;
mod key;

use anyhow::Result;
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::setup::{actor, load_config, prepare_core};

pub fn run(cli: &Cli) -> Result<()> {
    let format = cli.format;
    info!(command = command_name(&cli.command), "Running command");

    // Digest only needs the secret, not the database.
    if let Commands::Digest { token } = &cli.command {
        return digest::run(&load_config(cli)?, token, format);
    }

    let core = prepare_core(cli)?;
    let user = actor(cli);
    let actor = user.as_ref();

    match &cli.command {
        Commands::Create(args) => key::create(&core, actor, args, format),
        Commands::CreatePlugin(args) => key::create_plugin(&core, actor, args, format),
        Commands::Rotate { id } => key::rotate(&core, actor, *id, format),
        Commands::Delete { id } => key::delete(&core, *id, format),
        Commands::RevokePlugin(args) => key::revoke_plugin(&core, args, format),
        Commands::Show { id } => key::show(&core, *id, format),
        Commands::List => key::list(&core, format),
        Commands::Completions { .. } | Commands::Digest { .. } => Ok(()),
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Completions { .. } => "completions",
        Commands::Create(_) => "create",
        Commands::CreatePlugin(_) => "create-plugin",
        Commands::Rotate { .. } => "rotate",
        Commands::Delete { .. } => "delete",
        Commands::RevokePlugin(_) => "revoke-plugin",
        Commands::Show { .. } => "show",
        Commands::List => "list",
        Commands::Digest { .. } => "digest",
    }
}
