use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use integrity_core::config::Config;
use integrity_core::host::Invocation;
use integrity_core::logging::init_logging_with_config;
use integrity_core::{metrics, Dispatcher, Response, SenderToken, SqliteStateDb};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "integrity")]
#[command(author, version, about = "Anchor and list content hashes", long_about = None)]
struct Args {
    /// Configuration file (TOML); INTEGRITY_* environment variables are used when absent
    #[arg(short, long)]
    config: Option<String>,

    /// State database file, overrides the configured path
    #[arg(long)]
    db: Option<String>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// Caller identity as hex-encoded bytes
    #[arg(short, long)]
    identity: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Anchor a hash at (bucket, index) under the caller's sender token
    Submit {
        bucket: String,
        index: String,
        hash: String,
    },
    /// List every record anchored by a sender
    Query { sender: String },
    /// Print the sender token bound to --identity
    Whoami,
}

impl Command {
    fn invocation(&self) -> Option<Invocation> {
        match self {
            Command::Submit {
                bucket,
                index,
                hash,
            } => Some(Invocation::new("submitHash", [bucket, index, hash])),
            Command::Query { sender } => Some(Invocation::new("queryHash", [sender])),
            Command::Whoami => None,
        }
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let expanded = shellexpand::full(path)
                .with_context(|| format!("Failed to expand config path {}", path))?;
            Config::from_file(&*expanded)?
        }
        None => Config::from_env()?,
    };

    if let Some(db) = &args.db {
        config.store.db_path = PathBuf::from(shellexpand::tilde(db).into_owned());
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }

    config.validate()?;
    Ok(config)
}

fn report(response: Response) -> ExitCode {
    match response {
        Response::Success(payload) => {
            if let Some(payload) = payload {
                println!("{}", String::from_utf8_lossy(&payload));
            }
            ExitCode::SUCCESS
        }
        Response::Error(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging_with_config(config.logging.log_config()?)?;
    metrics::describe();

    let caller = args
        .identity
        .as_deref()
        .map(SenderToken::parse)
        .transpose()
        .context("--identity must be hex-encoded")?;

    let Some(invocation) = args.command.invocation() else {
        let (sender, _) = caller.context("whoami requires --identity")?;
        println!("{}", sender);
        return Ok(ExitCode::SUCCESS);
    };
    let identity = caller.map(|(_, identity)| identity);

    let db_path = &config.store.db_path;
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let db = SqliteStateDb::open(db_path, config.store.pool_size)
        .with_context(|| format!("Failed to open state database {}", db_path.display()))?;
    debug!(path = %db_path.display(), "State database opened");

    info!(operation = %invocation.function, "Invoking");
    let host = db.host(identity, invocation);
    let dispatcher = Dispatcher::new(&config.keyspace);

    Ok(report(dispatcher.invoke(&host)))
}
