use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sentbank::{BackendKind, BackendOptions, Commands, Container, ContainerConfig, Router};

#[derive(Parser)]
#[command(name = "sentbank")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Storage engine: duckdb, chroma, mongodb or memory
    #[arg(short, long, global = true, default_value = "duckdb")]
    backend: BackendKind,

    /// DuckDB database file (or ":memory:"), Chroma base URL or MongoDB URI
    #[arg(short, long, global = true, default_value = "~/.sentbank/sentbank.duckdb")]
    connection: String,

    #[arg(long, global = true, default_value = "corpus")]
    corpus: String,

    #[arg(long, global = true, default_value = "30")]
    timeout_secs: u64,

    #[arg(long, global = true, default_value = "256")]
    page_size: usize,

    /// Chroma database holding the corpus
    #[arg(long, global = true, default_value = "default_database")]
    database: String,

    /// Open the database without taking the write lock
    #[arg(long, global = true)]
    read_only: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = container_config(&cli)?;
    let container = Container::new(config).await?;

    let output = Router::new(&container).route(cli.command).await;
    container.close().await?;

    let output = output?;
    if !output.is_empty() {
        println!("{}", output);
    }

    Ok(())
}

fn container_config(cli: &Cli) -> Result<ContainerConfig> {
    let connection = match cli.backend {
        BackendKind::DuckDb => {
            let target = expand_tilde(&cli.connection);
            if target != sentbank::connector::api::container::DUCKDB_IN_MEMORY {
                if let Some(parent) = std::path::Path::new(&target).parent() {
                    if !parent.as_os_str().is_empty() && !cli.read_only {
                        std::fs::create_dir_all(parent)?;
                    }
                }
            }
            Some(target)
        }
        BackendKind::Chroma if cli.connection.starts_with("http") => Some(cli.connection.clone()),
        BackendKind::Mongo if cli.connection.starts_with("mongodb") => {
            Some(cli.connection.clone())
        }
        BackendKind::Chroma | BackendKind::Mongo | BackendKind::InMemory => None,
    };

    Ok(ContainerConfig {
        backend: cli.backend,
        connection,
        corpus: cli.corpus.clone(),
        timeout: Duration::from_secs(cli.timeout_secs.max(1)),
        options: BackendOptions {
            page_size: cli.page_size,
            database: cli.database.clone(),
            read_only: cli.read_only,
        },
    })
}

fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            if path == "~" {
                return home.to_string_lossy().to_string();
            }
            return path.replacen("~", &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
