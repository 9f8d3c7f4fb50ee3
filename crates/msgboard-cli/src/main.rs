mod admin;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use msgboard_config::ConfigLoader;
use tracing_subscriber::EnvFilter;

use msgboard_common::MessageId;

use crate::admin::{DbAction, MessageEdit};

#[derive(Parser)]
#[command(
    name = "msgboard",
    version,
    about = "msgboard - a minimal message board over HTTP"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Directory holding msgboard.yml or msgboard.toml. Relative paths in the
    /// config resolve against it. Defaults to the working directory.
    #[arg(long, env = "MSGBOARD_CONFIG_DIR", global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },

    /// Create the database schema (default), reset it, or seed sample rows
    Db {
        /// Drop and recreate the messages table
        #[arg(long, conflicts_with = "test_data")]
        reset: bool,

        /// Insert the sample conversation
        #[arg(long)]
        test_data: bool,
    },

    /// Print stored messages, newest first
    List {
        /// Include soft-deleted messages
        #[arg(long)]
        all: bool,

        /// Maximum number of messages to print
        #[arg(long, default_value_t = msgboard_db::DEFAULT_LIST_LIMIT)]
        limit: usize,
    },

    /// Show a message with its parent and replies
    Thread { id: MessageId },

    /// Replace the content of a message
    Edit { id: MessageId, content: String },

    /// Soft-delete a message
    Delete { id: MessageId },

    /// Record the git commit a message refers to
    Annotate { id: MessageId, commit_hash: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_loader = match cli.config_dir {
        Some(dir) => ConfigLoader::with_dir(dir),
        None => ConfigLoader::new()?,
    };
    let config = config_loader.load()?;

    let db_path = config.storage.database_path.clone();

    match cli.command {
        Commands::Start { host, port } => {
            let mut config = config;
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }

            let server = msgboard_gateway::GatewayServer::from_config(config).await?;
            server.run().await?;
        }
        Commands::Db { reset, test_data } => {
            let action = if reset {
                DbAction::Reset
            } else if test_data {
                DbAction::SeedSampleData
            } else {
                DbAction::Initialize
            };
            println!("{}", admin::run_db_command(&db_path, action).await?);
        }
        Commands::List { all, limit } => {
            let lines = admin::list_messages(&db_path, all, limit).await?;
            if lines.is_empty() {
                println!("(no messages)");
            }
            for line in lines {
                println!("{line}");
            }
        }
        Commands::Thread { id } => {
            for line in admin::show_thread(&db_path, id).await? {
                println!("{line}");
            }
        }
        Commands::Edit { id, content } => {
            let report = admin::edit_message(&db_path, id, MessageEdit::Content(content)).await?;
            println!("{report}");
        }
        Commands::Delete { id } => {
            println!("{}", admin::edit_message(&db_path, id, MessageEdit::Delete).await?);
        }
        Commands::Annotate { id, commit_hash } => {
            let edit = MessageEdit::CommitHash(commit_hash);
            println!("{}", admin::edit_message(&db_path, id, edit).await?);
        }
    }

    Ok(())
}
