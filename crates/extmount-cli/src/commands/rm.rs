//! Rm command - remove a configured storage.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::Context;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Storage id
    pub id: u64,
}

#[instrument(level = "info", name = "cmd::rm", skip_all, fields(id = args.id))]
pub fn execute(ctx: &Context, user: Option<&str>, args: &Args) -> Result<()> {
    let mut service = ctx.service(user)?;
    service.remove_storage(args.id)?;
    println!("Removed storage {}", args.id);
    Ok(())
}
