//! Auth-mechanisms command - list the registered authentication mechanisms.

use anyhow::Result;
use clap::Args as ClapArgs;
use tracing::instrument;

use extmount_core::Parameter;

use crate::output::create_table;
use crate::Context;

#[derive(ClapArgs, Clone)]
pub struct Args {
    /// Only mechanisms for this auth scheme
    #[arg(long, value_name = "SCHEME")]
    pub scheme: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[instrument(level = "info", name = "cmd::auth_mechanisms", skip_all)]
pub fn execute(ctx: &Context, args: &Args) -> Result<()> {
    let registry = ctx.registry();
    let mechanisms = match &args.scheme {
        Some(scheme) => registry.auth_mechanisms_by_scheme([scheme.as_str()]),
        None => registry.auth_mechanisms(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&mechanisms)?);
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Class", "Name", "Scheme", "Parameters"]);
    for mechanism in mechanisms {
        let parameters: Vec<&str> = mechanism.parameters().iter().map(Parameter::name).collect();
        table.add_row(vec![
            mechanism.class_id().to_owned(),
            mechanism.display_name().to_owned(),
            mechanism.scheme().to_owned(),
            if parameters.is_empty() {
                "-".to_owned()
            } else {
                parameters.join(", ")
            },
        ]);
    }
    println!("{table}");
    Ok(())
}
