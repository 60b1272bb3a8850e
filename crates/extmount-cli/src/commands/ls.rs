//! Ls command - list the configured storages of a collection.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::output::{create_table, format_applicable};
use crate::Context;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[instrument(level = "info", name = "cmd::ls", skip_all)]
pub fn execute(ctx: &Context, user: Option<&str>, args: &Args) -> Result<()> {
    let service = ctx.service(user)?;
    let storages = service.all_storages();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&storages)?);
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Id", "Mount point", "Backend", "Auth", "Applicable"]);
    for storage in &storages {
        table.add_row(vec![
            storage.id().map_or_else(String::new, |id| id.to_string()),
            storage.mount_point().to_owned(),
            storage.backend_class().to_owned(),
            storage.auth_mechanism_class().to_owned(),
            format_applicable(storage.applicable_users(), storage.applicable_groups()),
        ]);
    }
    println!("{table}");
    Ok(())
}
