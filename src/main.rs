//! File Cache - command-line front end
//!
//! Memoizes the standard output of a command on disk:
//!
//! ```text
//! file_cache run ip -- curl -s https://ipinfo.io/ip
//! file_cache invalidate ip
//! ```

use std::path::PathBuf;
use std::process::Command;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_cache::{Cache, Config};

#[derive(Parser, Debug)]
#[command(name = "file_cache", version, about = "Memoize command output on disk")]
struct Cli {
    /// Storage root (defaults to FILE_CACHE_DIR, then ./cache)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Validity window in seconds (defaults to FILE_CACHE_TTL, then 3600)
    #[arg(long, global = true)]
    ttl: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the cached output for NAME, running the command on a miss
    Run {
        /// Cache key
        name: String,
        /// Program and arguments to run on a miss
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
    /// Remove the cached output for NAME
    Invalidate {
        /// Cache key
        name: String,
    },
}

fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "file_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(dir) = cli.dir {
        config.cache_dir = dir;
    }
    if let Some(ttl) = cli.ttl {
        config.default_ttl = ttl;
    }
    info!(
        "Configuration loaded: cache_dir={}, default_ttl={}s",
        config.cache_dir.display(),
        config.default_ttl
    );

    let cache = Cache::from_config(&config);

    match cli.command {
        Commands::Run { name, command } => {
            let output = cache.get_string(&name, || run_command(&command))?;
            print!("{}", output);
        }
        Commands::Invalidate { name } => {
            cache
                .invalidate(&name)
                .with_context(|| format!("Failed to invalidate '{}'", name))?;
            info!("Invalidated '{}'", name);
        }
    }

    Ok(())
}

/// Runs the program and returns its stdout. A non-zero exit aborts the lookup
/// so nothing is cached.
fn run_command(command: &[String]) -> anyhow::Result<String> {
    let (program, args) = command.split_first().context("No command given")?;

    info!("Cache miss, running {}", program);
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to run '{}'", program))?;

    if !output.status.success() {
        bail!("'{}' exited with {}", program, output.status);
    }

    String::from_utf8(output.stdout)
        .with_context(|| format!("'{}' produced non UTF-8 output", program))
}
