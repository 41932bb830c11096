use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let msg = format!("{:#}", err).to_lowercase();

    if msg.contains("encryption_secret") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Set the server secret in the environment or a .env file:");
        eprintln!("  {} export ENCRYPTION_SECRET=<value>", "$".dimmed());
    }

    if msg.contains("already exists") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Pick another name, or list existing keys with:");
        eprintln!("  {} keysmith list", "$".dimmed());
    }

    if msg.contains("could not find api key") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  List existing keys with:");
        eprintln!("  {} keysmith list", "$".dimmed());
    }

    std::process::exit(1);
}
