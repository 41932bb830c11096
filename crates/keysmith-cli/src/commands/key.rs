use anyhow::Result;
use comfy_table::{Cell, Table};
use keysmith_core::{ApiKey, CreateApiKeyRequest, IssuedApiKey, KeysmithCore, User};

use crate::cli::{CreateArgs, CreatePluginArgs, RevokePluginArgs};
use crate::output::OutputFormat;
use crate::output::json::print_json;

pub fn create(
    core: &KeysmithCore,
    actor: Option<&User>,
    args: &CreateArgs,
    format: OutputFormat,
) -> Result<()> {
    let request = CreateApiKeyRequest {
        name: args.name.clone(),
        expired_at: args.expires_at,
        allowed_path: args.allowed_path.clone(),
        key_type: args.key_type.clone(),
        extra: args.extra.clone(),
    };

    let tx = core.storage.api_keys.begin()?;
    let issued = core.api_keys.create(&tx, actor, request)?;
    tx.commit()?;

    print_issued(&issued, "Created", format)
}

pub fn create_plugin(
    core: &KeysmithCore,
    actor: Option<&User>,
    args: &CreatePluginArgs,
    format: OutputFormat,
) -> Result<()> {
    let tx = core.storage.api_keys.begin()?;
    let issued = core.api_keys.create_for_plugin(
        &tx,
        actor,
        &args.name,
        &args.plugin,
        &args.allowed_path,
        &args.extra,
    )?;
    tx.commit()?;

    print_issued(&issued, "Created", format)
}

pub fn rotate(
    core: &KeysmithCore,
    actor: Option<&User>,
    id: u64,
    format: OutputFormat,
) -> Result<()> {
    let issued = core.api_keys.rotate(actor, id)?;
    print_issued(&issued, "Rotated", format)
}

pub fn delete(core: &KeysmithCore, id: u64, format: OutputFormat) -> Result<()> {
    core.api_keys.delete(id)?;

    if format.is_json() {
        return print_json(&serde_json::json!({ "deleted": id }));
    }

    println!("Deleted api key {id}");
    Ok(())
}

pub fn revoke_plugin(
    core: &KeysmithCore,
    args: &RevokePluginArgs,
    format: OutputFormat,
) -> Result<()> {
    let tx = core.storage.api_keys.begin()?;
    let revoked = core
        .api_keys
        .delete_for_plugin(&tx, &args.plugin, &args.extra)?;
    tx.commit()?;

    if format.is_json() {
        return print_json(&serde_json::json!({
            "revoked": usize::from(revoked.is_some()),
            "id": revoked.as_ref().map(|key| key.id),
        }));
    }

    match revoked {
        Some(key) => println!("Revoked plugin api key {} ({})", key.id, key.name),
        None => println!("No matching plugin api key"),
    }
    Ok(())
}

pub fn show(core: &KeysmithCore, id: u64, format: OutputFormat) -> Result<()> {
    let key = core.api_keys.lookup(None, id, &[])?;

    if format.is_json() {
        return print_json(&record_json(&key));
    }

    println!("ID:           {}", key.id);
    println!("Name:         {}", key.name);
    println!("Type:         {}", key.key_type);
    println!("Allowed path: {}", key.allowed_path);
    println!("Expires:      {}", format_expiry(&key));
    println!("Extra:        {}", key.extra);
    println!("Digest:       {}", key.api_key);
    println!("Creator:      {}", format_identity(&key.creator, &key.creator_email));
    println!("Updater:      {}", format_identity(&key.updater, &key.updater_email));
    println!("Created:      {}", key.created_at);
    println!("Updated:      {}", key.updated_at);
    Ok(())
}

pub fn list(core: &KeysmithCore, format: OutputFormat) -> Result<()> {
    let keys = core.api_keys.list()?;

    if format.is_json() {
        let items: Vec<_> = keys.iter().map(record_json).collect();
        return print_json(&items);
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", "Allowed Path", "Expires", "Extra"]);

    for key in &keys {
        table.add_row(vec![
            Cell::new(key.id),
            Cell::new(&key.name),
            Cell::new(&key.key_type),
            Cell::new(&key.allowed_path),
            Cell::new(format_expiry(key)),
            Cell::new(&key.extra),
        ]);
    }

    crate::output::table::print_table(table)
}

fn print_issued(issued: &IssuedApiKey, verb: &str, format: OutputFormat) -> Result<()> {
    let record = issued.record();

    if format.is_json() {
        return print_json(&serde_json::json!({
            "id": record.id,
            "name": record.name,
            "type": record.key_type,
            "allowed_path": record.allowed_path,
            "expired_at": record.expired_at,
            "extra": record.extra,
            "api_key": issued.plaintext(),
        }));
    }

    println!("{verb} api key {} ({})", record.id, record.name);
    println!("Key: {}", issued.plaintext());
    println!("Store this key now. It cannot be shown again.");
    Ok(())
}

fn record_json(key: &ApiKey) -> serde_json::Value {
    serde_json::json!({
        "id": key.id,
        "name": key.name,
        "type": key.key_type,
        "allowed_path": key.allowed_path,
        "expired_at": key.expired_at,
        "extra": key.extra,
        "digest": key.api_key,
        "creator": key.creator,
        "creator_email": key.creator_email,
        "updater": key.updater,
        "updater_email": key.updater_email,
        "created_at": key.created_at,
        "updated_at": key.updated_at,
    })
}

fn format_expiry(key: &ApiKey) -> String {
    key.expired_at
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "never".to_string())
}

fn format_identity(name: &str, email: &str) -> String {
    match (name.is_empty(), email.is_empty()) {
        (true, true) => "-".to_string(),
        (false, true) => name.to_string(),
        (true, false) => format!("<{email}>"),
        (false, false) => format!("{name} <{email}>"),
    }
}
