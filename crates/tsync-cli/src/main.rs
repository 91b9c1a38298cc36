use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "tsync")]
#[command(about = "Reconcile a source inventory into capacity-limited tag lists", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reconciliation pass against the configured source and destination
    Sync {
        /// Layered config paths in merge order (base -> env -> local)
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Render intents instead of sending them (overrides /run/dry_run)
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Root directory for per-run exports (overrides /run/exports_dir)
        #[arg(long)]
        exports_dir: Option<PathBuf>,

        /// Exit non-zero when any write was rejected or failed
        #[arg(long, default_value_t = false)]
        fail_on_errors: bool,
    },

    /// Plan offline from local files and print the intents as JSON. No network.
    Plan {
        /// Column-per-type CSV (header = type, cells = labels)
        #[arg(long)]
        csv: PathBuf,

        /// Destination lists as returned by the read endpoint (JSON array).
        /// Omit to plan against an empty destination.
        #[arg(long)]
        lists: Option<PathBuf>,

        /// Membership rule: prefix | delimited
        #[arg(long, default_value = "prefix")]
        membership: String,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Validate settings and credentials, report unused keys. No network.
    ConfigCheck {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Treat unused config keys as an error
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Sync {
            config_paths,
            dry_run,
            exports_dir,
            fail_on_errors,
        } => {
            commands::sync::run_sync(commands::sync::SyncArgs {
                config_paths: &config_paths,
                dry_run,
                exports_dir,
                fail_on_errors,
            })
            .await?;
        }

        Commands::Plan {
            csv,
            lists,
            membership,
        } => {
            commands::plan::run_plan(&csv, lists.as_deref(), &membership)?;
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = tsync_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::ConfigCheck {
            config_paths,
            strict,
        } => {
            commands::config_check(&config_paths, strict)?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
