#![deny(unsafe_code)]

mod commands;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use extmount_core::{
    builtin, BackendRegistry, RegistryConfig, ServiceScope, StoragesService,
};

use crate::commands::{backends, create, ls, mechanisms, mounts, rm, show};

/// Command-line interface for external storage mounts
#[derive(Parser)]
#[command(name = "extmount")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # List the backends available for mounting
    extmount backends

    # Configure an SMB share for the staff group
    extmount create documents --backend smb --auth auth::password \\
        -o host=fileserver.local -o share=documents \\
        -o user=svc -o password=secret --applicable-group staff

    # Resolve every mount alice would see
    extmount mounts alice --group staff
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory holding the storages files
    #[arg(long, env = "EXTMOUNT_CONFIG_DIR", default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Operate on this user's personal collection instead of the global one
    #[arg(long, value_name = "USER", global = true)]
    user: Option<String>,

    /// Whether end users may mount storages themselves
    #[arg(long, value_name = "yes|no", default_value = "yes", global = true)]
    allow_user_mounting: String,

    /// Comma-separated backend class ids users may mount
    #[arg(long, value_name = "CLASSES", default_value = "", global = true)]
    user_backends: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List storage backends
    Backends(backends::Args),

    /// List authentication mechanisms
    AuthMechanisms(mechanisms::Args),

    /// Configure a new storage
    Create(create::Args),

    /// List configured storages
    Ls(ls::Args),

    /// Show one storage, including its probed status
    Show(show::Args),

    /// Remove a configured storage
    Rm(rm::Args),

    /// Resolve the mounts a user would see
    Mounts(mounts::Args),
}

/// Shared command context: the populated registry and where the storages
/// files live.
pub struct Context {
    registry: Arc<BackendRegistry>,
    config_dir: PathBuf,
}

impl Context {
    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Open the storages collection: the global one, or `user`'s personal
    /// one. Each collection is backed by its own JSON file under the
    /// config directory.
    pub fn service(&self, user: Option<&str>) -> Result<StoragesService> {
        let scope = match user {
            Some(user) => ServiceScope::Personal(user.to_owned()),
            None => ServiceScope::Global,
        };
        let service = StoragesService::with_storages_file(
            Arc::clone(&self.registry),
            scope,
            self.storages_path(user),
        )?;
        Ok(service)
    }

    fn storages_path(&self, user: Option<&str>) -> PathBuf {
        match user {
            Some(user) => self.config_dir.join(format!("storages-{user}.json")),
            None => self.config_dir.join("storages.json"),
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.verbose);

    let mut registry = BackendRegistry::new(RegistryConfig::from_app_values(
        &cli.allow_user_mounting,
        &cli.user_backends,
    ));
    builtin::register_backends(&mut registry);
    builtin::register_auth_mechanisms(&mut registry);

    let ctx = Context {
        registry: Arc::new(registry),
        config_dir: cli.config_dir.clone(),
    };

    match cli.command {
        Commands::Backends(args) => backends::execute(&ctx, &args),
        Commands::AuthMechanisms(args) => mechanisms::execute(&ctx, &args),
        Commands::Create(args) => create::execute(&ctx, cli.user.as_deref(), &args),
        Commands::Ls(args) => ls::execute(&ctx, cli.user.as_deref(), &args),
        Commands::Show(args) => show::execute(&ctx, cli.user.as_deref(), &args),
        Commands::Rm(args) => rm::execute(&ctx, cli.user.as_deref(), &args),
        Commands::Mounts(args) => mounts::execute(&ctx, &args),
    }
}

/// Set up tracing based on verbosity level
fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
