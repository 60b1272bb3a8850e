//! Create command - configure and persist a new storage.

use anyhow::{bail, Result};
use clap::Args as ClapArgs;
use serde_json::Value;
use tracing::instrument;

use extmount_core::OptionMap;

use crate::Context;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Mount point for the storage
    pub mount_point: String,

    /// Backend class id (see `extmount backends`)
    #[arg(short, long, value_name = "CLASS")]
    pub backend: String,

    /// Auth mechanism class id (see `extmount auth-mechanisms`)
    #[arg(short = 'a', long = "auth", value_name = "CLASS", default_value = extmount_core::NULL_MECHANISM)]
    pub auth_mechanism: String,

    /// Backend option as KEY=VALUE; repeatable. Values parse as JSON when
    /// possible and fall back to plain strings.
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,

    /// Restrict the mount to this user; repeatable
    #[arg(long = "applicable-user", value_name = "USER")]
    pub applicable_users: Vec<String>,

    /// Restrict the mount to this group; repeatable
    #[arg(long = "applicable-group", value_name = "GROUP")]
    pub applicable_groups: Vec<String>,

    /// Override the backend's mount priority
    #[arg(long)]
    pub priority: Option<i32>,
}

#[instrument(level = "info", name = "cmd::create", skip_all, fields(mount_point = %args.mount_point))]
pub fn execute(ctx: &Context, user: Option<&str>, args: &Args) -> Result<()> {
    let mut backend_options = OptionMap::new();
    for option in &args.options {
        let (key, value) = parse_option(option)?;
        backend_options.insert(key, value);
    }

    let mut service = ctx.service(user)?;
    let storage = service.create_storage_full(
        &args.mount_point,
        &args.backend,
        &args.auth_mechanism,
        backend_options,
        None,
        Some(args.applicable_users.clone()),
        Some(args.applicable_groups.clone()),
        args.priority,
    )?;
    let stored = service.add_storage(storage)?;

    // ids are assigned on persistence
    let id = stored.id().map_or_else(String::new, |id| id.to_string());
    println!("Added storage {} at {}", id, stored.mount_point());
    Ok(())
}

fn parse_option(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("invalid option \"{raw}\", expected KEY=VALUE");
    };
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok((key.to_owned(), value))
}
