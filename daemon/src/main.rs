//! Agora daemon: entry point for running an election engine.

use agora_engine::{
    init_logging, ElectionFile, Engine, EngineConfig, EngineParts, LogFormat, ShutdownController,
};
use agora_relay::WsRelay;
use agora_rpc::RpcServer;
use agora_types::SystemClock;
use agora_websocket::{FanoutHub, WebSocketServer};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "agora-daemon", about = "Agora election vote engine")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "AGORA_CONFIG")]
    config: Option<PathBuf>,

    /// Relay websocket URL, e.g. "ws://127.0.0.1:7777".
    #[arg(long, env = "AGORA_RELAY_URL")]
    relay_url: Option<String>,

    /// Election definition (ballot, candidate profiles, members).
    #[arg(long, env = "AGORA_ELECTION_FILE")]
    election_file: Option<PathBuf>,

    /// Seconds before a relay request counts as unavailable.
    #[arg(long, env = "AGORA_FETCH_TIMEOUT_SECS")]
    fetch_timeout_secs: Option<u64>,

    /// Seconds between lifecycle re-checks.
    #[arg(long, env = "AGORA_RECHECK_INTERVAL_SECS")]
    recheck_interval_secs: Option<u64>,

    /// Start with voting disabled.
    #[arg(long, env = "AGORA_VOTING_DISABLED")]
    voting_disabled: bool,

    /// Admin pubkeys in hex (comma-separated).
    #[arg(long, env = "AGORA_ADMINS", value_delimiter = ',')]
    admins: Vec<String>,

    /// RPC server port.
    #[arg(long, env = "AGORA_RPC_PORT")]
    rpc_port: Option<u16>,

    /// WebSocket server port.
    #[arg(long, env = "AGORA_WS_PORT")]
    websocket_port: Option<u16>,

    /// Log output: "human" or "json".
    #[arg(long, env = "AGORA_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "AGORA_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Run the engine (the default).
    Run,
    /// Print the effective configuration as TOML and exit.
    PrintConfig,
}

impl Cli {
    /// File settings (or defaults), then flags and env vars on top.
    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let base = match &self.config {
            Some(path) => EngineConfig::from_toml_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        Ok(self.apply(base))
    }

    fn apply(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(url) = &self.relay_url {
            config.relay_url = url.clone();
        }
        if let Some(path) = &self.election_file {
            config.election_file = path.clone();
        }
        if let Some(secs) = self.fetch_timeout_secs {
            config.fetch_timeout_secs = secs;
        }
        if let Some(secs) = self.recheck_interval_secs {
            config.recheck_interval_secs = secs;
        }
        if self.voting_disabled {
            config.voting_enabled = false;
        }
        if !self.admins.is_empty() {
            config.admins = self.admins.clone();
        }
        if let Some(port) = self.rpc_port {
            config.rpc_port = port;
        }
        if let Some(port) = self.websocket_port {
            config.websocket_port = port;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.engine_config()?;

    match cli.command.unwrap_or(Command::Run) {
        Command::PrintConfig => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::Run => run(config).await,
    }
}

async fn run(config: EngineConfig) -> anyhow::Result<()> {
    init_logging(config.log_format, &config.log_level);

    let election_file = ElectionFile::from_toml_file(&config.election_file)
        .with_context(|| format!("loading election file {}", config.election_file.display()))?;
    let hub = Arc::new(FanoutHub::default());
    let engine = Arc::new(Engine::new(
        &config,
        election_file.election(),
        EngineParts {
            relay: Arc::new(WsRelay::new(config.relay_url.clone(), config.fetch_timeout())),
            notifier: hub.clone(),
            clock: Arc::new(SystemClock),
            directory: Arc::new(election_file.directory()),
        },
    )?);

    tracing::info!(
        "Starting Agora engine for {} (relay:{}, RPC:{}, WS:{}, state:{:?})",
        engine.election().year,
        config.relay_url,
        config.rpc_port,
        config.websocket_port,
        engine.state(),
    );

    let shutdown = Arc::new(ShutdownController::new());
    let signals = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { shutdown.wait_for_signal().await })
    };
    let checker = engine.spawn_periodic_check(config.recheck_interval(), shutdown.subscribe());

    let rpc = RpcServer::new(config.rpc_port, engine.clone(), config.max_viewer_sessions);
    let ws = WebSocketServer::new(config.websocket_port, hub);
    let (rpc_stop, ws_stop) = (shutdown.signalled(), shutdown.signalled());

    // A server that fails to start takes the rest down with it.
    let (rpc_result, ws_result) = tokio::join!(
        async {
            let result = rpc.start(rpc_stop).await;
            shutdown.shutdown();
            result
        },
        async {
            let result = ws.start(ws_stop).await;
            shutdown.shutdown();
            result
        },
    );

    signals.abort();
    checker.await.context("periodic check task")?;
    rpc_result.context("RPC server")?;
    ws_result.context("WebSocket server")?;

    tracing::info!("Agora daemon exited cleanly");
    Ok(())
}
