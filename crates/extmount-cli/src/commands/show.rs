//! Show command - one storage in detail, including its probed status.

use anyhow::Result;
use clap::Args as ClapArgs;
use serde_json::json;
use tracing::instrument;

use extmount_core::{BackendStatus, IndeterminateProbe};

use crate::output::{create_table, format_applicable};
use crate::Context;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Storage id
    pub id: u64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[instrument(level = "info", name = "cmd::show", skip_all, fields(id = args.id))]
pub fn execute(ctx: &Context, user: Option<&str>, args: &Args) -> Result<()> {
    let service = ctx.service(user)?;
    // the probe runs only here, never during create/update/delete
    let storage = service.get_storage_with_status(args.id, &IndeterminateProbe)?;

    if args.json {
        // status is transient and excluded from the persisted shape
        let mut value = serde_json::to_value(&storage)?;
        if let Some(object) = value.as_object_mut() {
            object.insert("status".to_owned(), json!(storage.status()));
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let mut table = create_table();
    table.add_row(vec!["Mount point", storage.mount_point()]);
    table.add_row(vec!["Backend", storage.backend_class()]);
    table.add_row(vec!["Auth mechanism", storage.auth_mechanism_class()]);
    table.add_row(vec![
        "Applicable".to_owned(),
        format_applicable(storage.applicable_users(), storage.applicable_groups()),
    ]);
    table.add_row(vec![
        "Options".to_owned(),
        serde_json::to_string(storage.backend_options())?,
    ]);
    let status = match storage.status() {
        Some(BackendStatus::Success) => "success",
        Some(BackendStatus::Error) => "error",
        Some(BackendStatus::Indeterminate) => "indeterminate",
        None => "unknown",
    };
    table.add_row(vec!["Status", status]);
    println!("{table}");
    Ok(())
}
