use aster_db::install::{InstallOptions, install};
use aster_db::{Aster, Record, Result, Settings};
use clap::{Args, Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Debug, Parser)]
#[command(name = "aster", version, about = "AsterDB client and installer")]
struct Cli {
    /// Settings file, layered under ASTER_* environment variables
    #[arg(long, default_value = "aster")]
    settings: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct Target {
    #[arg(long)]
    database: Option<String>,
    #[arg(long)]
    collection: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a key pair (unless one is given) and write the server config
    Install(InstallArgs),
    #[command(flatten)]
    Client(ClientCommand),
}

#[derive(Debug, Args)]
struct InstallArgs {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 80)]
    port: u16,
    /// Load an existing private key; `<key>.pub` must sit next to it
    #[arg(long)]
    key: Option<PathBuf>,
    /// MongoDB connection string
    #[arg(long)]
    mongo: Option<String>,
    #[arg(long)]
    key_dir: Option<PathBuf>,
    #[arg(long, default_value = "./config.json")]
    config: PathBuf,
}

#[derive(Debug, Subcommand)]
enum ClientCommand {
    Fetch {
        #[command(flatten)]
        target: Target,
        #[arg(long, default_value = "{}")]
        query: String,
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },
    Insert {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        data: String,
    },
    Update {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        query: String,
        #[arg(long)]
        data: String,
    },
    Delete {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        query: String,
    },
    CreateDatabase {
        #[arg(long)]
        database: Option<String>,
    },
    DeleteDatabase {
        #[arg(long)]
        database: Option<String>,
    },
    CreateCollection {
        #[command(flatten)]
        target: Target,
    },
    DeleteCollection {
        #[command(flatten)]
        target: Target,
    },
}

fn record(json: &str) -> Result<Record> {
    Ok(serde_json::from_str(json)?)
}

fn init_tracing(level: &str) {
    let log_filter = env::var("RUST_LOG")
        .unwrap_or_else(|_| format!("aster_db={},aster={},handle_errors={}", level, level, level));
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let command = match cli.command {
        Command::Install(args) => {
            init_tracing("info");
            let options = InstallOptions {
                host: args.host,
                port: args.port,
                key: args.key,
                mongo: args.mongo,
                key_dir: args.key_dir.unwrap_or_else(InstallOptions::default_key_dir),
                config_path: args.config,
            };
            install(&options)?;
            println!("Installed AsterDB config at {}", options.config_path.display());
            return Ok(());
        }
        Command::Client(command) => command,
    };

    let settings = Settings::load(&cli.settings)?;
    init_tracing(&settings.log_level);
    let aster = Aster::from_settings(&settings).await?;

    let result = match command {
        ClientCommand::Fetch { target, query, limit } => {
            aster
                .fetch(
                    target.database.as_deref(),
                    target.collection.as_deref(),
                    &record(&query)?,
                    limit,
                )
                .await?
        }
        ClientCommand::Insert { target, data } => {
            aster
                .insert(
                    target.database.as_deref(),
                    target.collection.as_deref(),
                    &record(&data)?,
                )
                .await?
        }
        ClientCommand::Update { target, query, data } => {
            aster
                .update(
                    target.database.as_deref(),
                    target.collection.as_deref(),
                    &record(&query)?,
                    &record(&data)?,
                )
                .await?
        }
        ClientCommand::Delete { target, query } => {
            aster
                .delete(
                    target.database.as_deref(),
                    target.collection.as_deref(),
                    &record(&query)?,
                )
                .await?
        }
        ClientCommand::CreateDatabase { database } => {
            aster.create_database(database.as_deref()).await?
        }
        ClientCommand::DeleteDatabase { database } => {
            aster.delete_database(database.as_deref()).await?
        }
        ClientCommand::CreateCollection { target } => {
            aster
                .create_collection(target.database.as_deref(), target.collection.as_deref())
                .await?
        }
        ClientCommand::DeleteCollection { target } => {
            aster
                .delete_collection(target.database.as_deref(), target.collection.as_deref())
                .await?
        }
    };
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    // Loading the env values
    dotenv::dotenv().ok();
    if let Err(e) = run(Cli::parse()).await {
        tracing::error!("{}", e);
        eprintln!("aster: {}", e);
        std::process::exit(1);
    }
}
