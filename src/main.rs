use clap::{Parser, Subcommand};
use tracing::debug;
use vector_ingest::Result;
use vector_ingest::config::Config;
use vector_ingest::ingest::Ingestor;
use vector_ingest::server::serve;

#[derive(Parser)]
#[command(name = "vector-ingest")]
#[command(about = "Append JSONL embedding records into per-user LanceDB tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service (default)
    Serve {
        /// Port to listen on, overriding PORT
        #[arg(long)]
        port: Option<u16>,
    },
    /// Ingest a single JSONL file and exit
    Ingest {
        /// Identifier of the JSONL file, usually the source URL
        #[arg(long)]
        url: String,
        /// User whose table receives the records
        #[arg(long)]
        user_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = dotenv {
        debug!("No .env file loaded: {}", e);
    }

    let cli = Cli::parse();
    let mut config = Config::load(std::env::current_dir()?)?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.set_port(port)?;
            }
            serve(config).await?;
        }
        Commands::Ingest { url, user_id } => {
            let outcome = Ingestor::new(config)?.ingest_jsonl(&url, &user_id).await?;
            println!(
                "Appended {} records to table '{}' ({})",
                outcome.rows_appended,
                outcome.table.name(),
                if outcome.optimized {
                    "optimized"
                } else {
                    "not optimized"
                }
            );
        }
    }

    Ok(())
}
