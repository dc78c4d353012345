mod cli;
mod client;
mod config;
mod credentials;
mod dashboard;
mod error;
mod measurements;
mod models;
mod router;
mod services;
mod session;
mod transcript;
mod transport;

use anyhow::{Context as _, Result};
use clap::Parser;
use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "orthodash",
    about = "Console for the orthodontic treatment decision service"
)]
pub struct Args {
    #[arg(short = 'c', long, help = "Run one command (e.g. \"/history\") and exit")]
    pub command: Option<String>,

    #[arg(long, env = "ORTHODASH_API_URL", help = "Backend base URL (overrides config)")]
    pub api_url: Option<String>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Keep the login token in memory only")]
    pub ephemeral: bool,

    #[arg(long, help = "Session transcripts directory")]
    pub transcripts_dir: Option<PathBuf>,

    #[arg(long, help = "Debug logging (requests and session transitions)")]
    pub debug: bool,

    #[arg(long, help = "Trace logging")]
    pub trace: bool,
}

fn init_tracing(args: &Args) {
    let filter = if args.trace {
        EnvFilter::new("orthodash=trace")
    } else if args.debug {
        EnvFilter::new("orthodash=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args);

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load()?
    };

    // CLI flags override every config layer
    if let Some(url) = &args.api_url {
        cfg.api.base_url = Some(url.clone());
    }
    if let Some(dir) = &args.transcripts_dir {
        cfg.console.transcripts_dir = Some(dir.clone());
    }

    if let Err(errors) = cfg.validate() {
        for error in &errors {
            eprintln!("Config error {}", error);
        }
        anyhow::bail!("Invalid configuration ({} errors)", errors.len());
    }
    tracing::debug!(base_url = cfg.base_url(), timeout = ?cfg.timeout(), "configuration loaded");

    let store: Arc<dyn CredentialStore> = if args.ephemeral {
        Arc::new(MemoryCredentialStore::new())
    } else {
        let path = cfg.credentials_path().context(
            "Cannot locate a home directory for the token file; set credentials.path or use --ephemeral",
        )?;
        Arc::new(FileCredentialStore::new(&path))
    };

    let transport = Arc::new(transport::UreqTransport::new(cfg.base_url(), cfg.timeout()));
    let api = Arc::new(client::ApiClient::new(transport, store));
    let session = session::SessionManager::new(api);

    let session_id = uuid::Uuid::new_v4().to_string();
    let transcript = cfg.transcripts_dir().and_then(|dir| {
        match transcript::Transcript::in_dir(&dir, &session_id) {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!(error = %e, "activity log disabled");
                None
            }
        }
    });

    let ctx = cli::Context::new(cfg, session, transcript, session_id);
    ctx.start();

    let result = if let Some(command) = &args.command {
        cli::run_once(&ctx, command)
    } else {
        cli::run_repl(&ctx)
    };
    ctx.session.teardown();

    if let Err(e) = &result {
        cli::report(e);
        std::process::exit(1);
    }
    Ok(())
}
