#![deny(unsafe_code)]

use std::sync::Arc;

use actl_council::ProcessLlmCaller;
use actl_daemon::{background, listener, watchdog, CouncilConfig, DaemonState, HubPaths, Intervals};
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "agentctld", version, about = "Local multi-agent coordination daemon")]
struct Args {
    /// Hub directory root; defaults to `$AGENTCTL_DIR` or `$HOME/.agentctl`.
    #[arg(long)]
    dir: Option<std::path::PathBuf>,

    /// Council member accounts, comma-separated.
    #[arg(long, value_delimiter = ',')]
    council_member: Vec<String>,

    /// Council chair account.
    #[arg(long)]
    council_chair: Option<String>,

    /// Command invoked as `<command> <account>` for each council call, with
    /// the system/user prompts piped to its stdin as JSON.
    #[arg(long, default_value = "agentctl-council-caller")]
    council_command: String,

    /// Per-call timeout in seconds for the council command.
    #[arg(long, default_value_t = 30)]
    council_timeout_secs: u64,

    /// Enable debug-level logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("actl=debug")
    } else {
        EnvFilter::new("actl=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let paths = match args.dir {
        Some(dir) => HubPaths::at(dir),
        None => HubPaths::resolve(),
    };

    let council = CouncilConfig {
        members: args.council_member,
        chair: args.council_chair,
    };
    let council_caller = Box::new(ProcessLlmCaller::new(
        args.council_command,
        std::time::Duration::from_secs(args.council_timeout_secs),
    ));

    let state = Arc::new(
        DaemonState::open(paths.clone(), Intervals::default(), council, council_caller)
            .with_context(|| format!("open daemon state under {}", paths.root().display()))?,
    );

    state
        .workspaces
        .lock()
        .recover_stale_workspaces()
        .with_context(|| "recover stale workspaces")?;

    let socket_path = paths.socket();
    let unix_listener =
        listener::bind(&socket_path).with_context(|| format!("bind socket at {}", socket_path.display()))?;
    std::fs::write(paths.pid_file(), std::process::id().to_string()).with_context(|| "write pid file")?;

    tracing::info!(socket = %socket_path.display(), "agentctld listening");

    background::spawn_all(Arc::clone(&state));
    tokio::spawn(watchdog::run(Arc::clone(&state)));

    listener::run(unix_listener, state).await;

    Ok(())
}
