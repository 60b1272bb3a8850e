//! Mounts command - resolve every mount a user would see.

use anyhow::Result;
use clap::Args as ClapArgs;
use serde_json::json;
use tracing::instrument;

use extmount_core::MountResolver;

use crate::output::create_table;
use crate::Context;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// User to resolve mounts for
    pub user: String,

    /// Group the user is a member of; repeatable
    #[arg(long = "group", value_name = "GROUP")]
    pub groups: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[instrument(level = "info", name = "cmd::mounts", skip_all, fields(user = %args.user))]
pub fn execute(ctx: &Context, args: &Args) -> Result<()> {
    let global = ctx.service(None)?;
    let personal = ctx.service(Some(&args.user))?;

    let resolver = MountResolver::new(std::sync::Arc::clone(ctx.registry()));
    let mounts = resolver.mounts_for_user(&args.user, &args.groups, &personal, &global)?;

    if args.json {
        let mounts: Vec<_> = mounts
            .iter()
            .map(|mount| {
                json!({
                    "mountPoint": mount.mount_point(),
                    "storageClass": mount.storage_class(),
                    "personal": mount.is_personal(),
                    "backendOptions": mount.backend_options(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&mounts)?);
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Mount point", "Backend", "Source"]);
    for mount in &mounts {
        table.add_row(vec![
            mount.mount_point().to_owned(),
            mount.storage_class().to_owned(),
            if mount.is_personal() {
                "personal".to_owned()
            } else {
                "global".to_owned()
            },
        ]);
    }
    println!("{table}");
    Ok(())
}
