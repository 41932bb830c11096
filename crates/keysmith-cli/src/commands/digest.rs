use anyhow::Result;
use keysmith_core::{ApiKeyConfig, TokenDigester};

use crate::output::OutputFormat;
use crate::output::json::print_json;

pub fn run(config: &ApiKeyConfig, token: &str, format: OutputFormat) -> Result<()> {
    let digester = TokenDigester::new(config.encryption_secret.clone());
    let digest = digester.digest(token)?;

    if format.is_json() {
        return print_json(&serde_json::json!({ "digest": digest }));
    }

    println!("{digest}");
    Ok(())
}
