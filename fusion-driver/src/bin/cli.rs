//! fusion-driver - command-line front end for the Fusion driver.
//!
//! Usage: fusion-driver [--app-path <PATH>] [--config <FILE>] <COMMAND>

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fusion_driver::{DriverOptions, init_logging, new_driver};

#[derive(Parser, Debug)]
#[command(name = "fusion-driver")]
#[command(about = "Drive VMware Fusion through vmrun and vmware-vdiskmanager")]
struct Cli {
    /// Path to the VMware Fusion application bundle
    #[arg(long, global = true)]
    app_path: Option<PathBuf>,

    /// JSON options file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Also write logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the application and its tools are installed
    Verify,
    /// Create a virtual disk
    CreateDisk {
        /// Output disk path
        output: PathBuf,
        /// Size in vendor syntax, e.g. 40000MB
        #[arg(long)]
        size: String,
    },
    /// Print "true" if the VM is running, "false" otherwise
    IsRunning { vmx: PathBuf },
    /// Start a VM with a console window
    Start { vmx: PathBuf },
    /// Power a VM off
    Stop { vmx: PathBuf },
}

/// Options file, then `FUSION_APP_PATH`, then `--app-path`; later wins.
fn resolve_options(cli: &Cli) -> anyhow::Result<DriverOptions> {
    let mut options = match &cli.config {
        Some(path) => DriverOptions::from_file(path)
            .with_context(|| format!("loading options from {}", path.display()))?,
        None => DriverOptions::default(),
    }
    .with_env_overrides();

    if let Some(app_path) = &cli.app_path {
        options.app_path = app_path.clone();
    }

    Ok(options)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging(&cli.log_level, cli.log_dir.as_deref())?;

    let options = resolve_options(&cli)?;
    tracing::debug!(?options, "Resolved driver options");
    let driver = new_driver(&options)?;

    match cli.command {
        Command::Verify => {
            driver.verify()?;
            println!("ok");
        }
        Command::CreateDisk { output, size } => driver.create_disk(&output, &size)?,
        Command::IsRunning { vmx } => println!("{}", driver.is_running(&vmx)?),
        Command::Start { vmx } => driver.start(&vmx)?,
        Command::Stop { vmx } => driver.stop(&vmx)?,
    }

    Ok(())
}
