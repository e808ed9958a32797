//! Verse console: headless control client for the Tradeverse backend.
//!
//! Usage:
//!   verse-console [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>     Config file path (default: config/console.toml)
//!   --base-url <URL>        Backend base URL (overrides config and the
//!                           persisted override)
//!   --guest                 Start a guest session (placeholder token)
//!   --token <TOKEN>         Log in with a bearer token
//!   --identity <EMAIL>      Identity for --token (checked against the
//!                           operator allow-list)
//!   --env <ENV>             Request an environment switch: mock or live
//!   --auto                  Request AUTO mode (requires --confirm)
//!   --confirm               Confirm the AUTO request (stands in for the
//!                           dashboard's confirmation modal)
//!   --symbols <SYMBOLS>     Comma-separated symbols to watch
//!   --logout-on-exit        Clear the persisted session on shutdown

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use verse_api::ApiClient;
use verse_common::Environment;

use verse_console::config::ConsoleConfig;
use verse_console::environment::{EnvironmentController, EnvironmentError};
use verse_console::mode::{AutoLoopConfig, ModeController, ModeState};
use verse_console::poller::PollHandle;
use verse_console::session::{SessionDisk, SessionStore};
use verse_console::state::GlobalState;

/// CLI arguments for the console.
#[derive(Parser, Debug)]
#[command(name = "verse-console")]
#[command(about = "Headless control console for the Tradeverse trading backend")]
#[command(version)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config/console.toml")]
    config: PathBuf,

    /// Backend base URL (overrides config file and persisted override)
    #[arg(long)]
    base_url: Option<String>,

    /// Start a guest session
    #[arg(long)]
    guest: bool,

    /// Log in with a bearer token
    #[arg(long)]
    token: Option<String>,

    /// Identity for --token
    #[arg(long)]
    identity: Option<String>,

    /// Request an environment switch: mock or live
    #[arg(long)]
    env: Option<String>,

    /// Request AUTO mode
    #[arg(long)]
    auto: bool,

    /// Confirm the AUTO request
    #[arg(long)]
    confirm: bool,

    /// Comma-separated symbols to watch (e.g. "NSE:BANKNIFTY,NSE:RELIANCE")
    #[arg(long, value_delimiter = ',')]
    symbols: Option<Vec<String>>,

    /// Add an IP to the trusted list (validated locally first)
    #[arg(long)]
    trust_ip: Option<String>,

    /// Clear the persisted session on shutdown
    #[arg(long)]
    logout_on_exit: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    // Load environment variables from .env file (if present)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let args = Args::parse();

    // Load configuration
    let mut config = if args.config.exists() {
        ConsoleConfig::from_file(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?
    } else {
        ConsoleConfig::default()
    };
    config.apply_env_overrides();
    config.apply_cli_overrides(args.base_url.clone(), args.symbols);
    config.validate()?;

    // Initialize logging
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global tracing subscriber")?;

    info!("Starting verse-console");

    // Session store over the persisted session file
    let disk = match &config.state_dir {
        Some(dir) => SessionDisk::at(dir.join("session.json")),
        None => SessionDisk::default_location().context("Failed to resolve session path")?,
    };
    let store = Arc::new(SessionStore::new(disk, config.operators.clone()));

    // Establish a session: explicit login, guest, or optimistic restore.
    if args.guest {
        store.guest_login()?;
    } else if let Some(token) = &args.token {
        let identity = args.identity.clone().unwrap_or_default();
        store.login(token, &identity, None)?;
    } else if store.restore().is_none() {
        info!("No persisted session; continuing as guest");
        store.guest_login()?;
    }

    // Base URL: CLI/env/config, then the persisted override, then default.
    let base_url = config.base_url.clone().or_else(|| store.base_url_override());
    let api = Arc::new(ApiClient::new(base_url, store.shared_token()));
    info!(base_url = %api.base_url(), role = ?store.role(), "Session ready");

    let state = Arc::new(GlobalState::new());

    // Initial settings sync: pick up the backend's environment and mode.
    match api.get_settings().await {
        Ok(settings) => {
            state.control.set_environment(settings.env);
            info!(
                env = %settings.env,
                mode = %settings.mode,
                broker = %settings.active_broker,
                connected = settings.angel_connected,
                "Backend settings loaded"
            );
        }
        Err(e) => warn!(error = %e, "Settings unavailable at startup; assuming MOCK"),
    }

    // Polling subscriptions: one generic poller per view concern.
    let settings_poll = {
        let api = Arc::clone(&api);
        PollHandle::spawn(
            "settings",
            config.polling.settings_interval(),
            Arc::clone(&state),
            move || {
                let api = Arc::clone(&api);
                async move { api.get_settings().await }
            },
        )
    };

    let observatory_poll = {
        let api = Arc::clone(&api);
        PollHandle::spawn(
            "observatory",
            config.polling.observatory_interval(),
            Arc::clone(&state),
            move || {
                let api = Arc::clone(&api);
                async move { api.observatory_status().await }
            },
        )
    };

    let orders_poll = {
        let api = Arc::clone(&api);
        PollHandle::spawn(
            "orders",
            config.polling.orders_interval(),
            Arc::clone(&state),
            move || {
                let api = Arc::clone(&api);
                async move { api.orders().await }
            },
        )
    };

    let ltp_polls: Vec<_> = config
        .symbols
        .iter()
        .map(|symbol| {
            let api = Arc::clone(&api);
            let symbol = symbol.clone();
            let name = format!("ltp:{symbol}");
            PollHandle::spawn(
                name,
                config.polling.ltp_interval(),
                Arc::clone(&state),
                move || {
                    let api = Arc::clone(&api);
                    let symbol = symbol.clone();
                    async move { api.ltp(&symbol).await }
                },
            )
        })
        .collect();

    // Environment controller + LIVE-consistency watch over the settings poll.
    let env_ctl = Arc::new(EnvironmentController::new(
        Arc::clone(&api),
        Arc::clone(&store),
        Arc::clone(&state),
    ));
    let consistency_watch = env_ctl.spawn_consistency_watch(settings_poll.subscribe());

    // Mode controller + order-book refresh on executed trades.
    let mode_ctl = Arc::new(ModeController::new(
        Arc::clone(&api),
        Arc::clone(&store),
        Arc::clone(&state),
        AutoLoopConfig::from(&config.autopilot),
    ));
    let refresh_listener = {
        let api = Arc::clone(&api);
        let notify = mode_ctl.orders_refresh();
        tokio::spawn(async move {
            loop {
                notify.notified().await;
                match api.orders().await {
                    Ok(orders) => info!(count = orders.len(), "Order book refreshed after trade"),
                    Err(e) => warn!(error = %e, "Order refresh failed"),
                }
            }
        })
    };

    // Requested environment switch
    if let Some(env_str) = &args.env {
        match Environment::parse(env_str) {
            Some(Environment::Live) => match env_ctl.switch_to_live().await {
                Ok(()) => {}
                Err(EnvironmentError::BrokerOffline) => {
                    error!("No active broker connection; complete the broker connection flow first");
                }
                Err(e) => error!(error = %e, "LIVE switch failed"),
            },
            Some(Environment::Mock) => env_ctl.switch_to_mock().await,
            None => error!(env = %env_str, "Unknown environment; expected mock or live"),
        }
    }

    // Trusted-IP addition: reject malformed or duplicate input locally,
    // before any write reaches the backend.
    if let Some(candidate) = &args.trust_ip {
        let current = match api.trusted_ips().await {
            Ok(list) => list.trusted_ips,
            Err(e) => {
                warn!(error = %e, "Could not fetch trusted IPs; validating format only");
                Vec::new()
            }
        };
        match verse_api::validate_trusted_ip(&current, candidate) {
            Ok(()) => match api.add_trusted_ip(candidate.trim()).await {
                Ok(ack) if ack.is_success() => info!(ip = %candidate, "Trusted IP added"),
                Ok(ack) => error!(status = %ack.status, "Trusted IP rejected by backend"),
                Err(e) => error!(error = %e, "Trusted IP update failed"),
            },
            Err(e) => error!(error = %e, "Trusted IP rejected"),
        }
    }

    // Requested AUTO engagement
    if args.auto {
        match mode_ctl.request_auto() {
            Ok(_) => {
                if args.confirm {
                    match mode_ctl.confirm_auto().await {
                        Ok(()) => {}
                        Err(e) => error!(error = %e, "AUTO engagement failed"),
                    }
                } else {
                    mode_ctl.cancel_confirmation();
                    warn!("AUTO requested without --confirm; staying in MANUAL");
                }
            }
            Err(e) => error!(error = %e, "AUTO not available"),
        }
    }

    info!("Console running; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down");

    // Leave AUTO before tearing the session down.
    if mode_ctl.state() == ModeState::Auto {
        if let Err(e) = mode_ctl.disengage().await {
            warn!(error = %e, "Could not disengage AUTO on shutdown");
        }
    }

    settings_poll.stop();
    observatory_poll.stop();
    orders_poll.stop();
    for poll in &ltp_polls {
        poll.stop();
    }
    consistency_watch.abort();
    refresh_listener.abort();

    if args.logout_on_exit {
        store.logout(api.as_ref()).await;
    }

    info!(metrics = ?state.metrics.snapshot(), "Final metrics");
    Ok(())
}
