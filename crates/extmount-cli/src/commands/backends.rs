//! Backends command - list the registered storage backends.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use crate::output::create_table;
use crate::Context;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Include backends whose dependencies are unsatisfied
    #[arg(short, long)]
    pub all: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[instrument(level = "info", name = "cmd::backends", skip_all)]
pub fn execute(ctx: &Context, args: &Args) -> Result<()> {
    let registry = ctx.registry();
    let backends = if args.all {
        registry.backends()
    } else {
        registry.available_backends()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&backends)?);
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Class", "Name", "Priority", "Auth schemes", "Missing"]);
    for backend in backends {
        let schemes: Vec<String> = backend.auth_schemes().into_iter().collect();
        let missing: Vec<String> = backend
            .check_dependencies()
            .into_iter()
            .map(|dependency| dependency.module().to_owned())
            .collect();
        table.add_row(vec![
            backend.class_id().to_owned(),
            backend.display_name().to_owned(),
            backend.priority().to_string(),
            schemes.join(", "),
            if missing.is_empty() {
                "-".to_owned()
            } else {
                missing.join(", ")
            },
        ]);
    }
    println!("{table}");
    Ok(())
}
