//! WAGERPOOL — pool-based odds and settlement service
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the backend client, market board, wallet, and refresher
//! together, and serves quotes until shutdown.

use anyhow::Result;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use wagerpool::backend::http::HttpBackend;
use wagerpool::backend::WagerBackend;
use wagerpool::board::MarketBoard;
use wagerpool::config::AppConfig;
use wagerpool::dashboard::{self, routes::DashboardState};
use wagerpool::refresh::spawn_refresher;
use wagerpool::wallet::WalletStore;

const BANNER: &str = r#"
 __      ___   ___ ___ ___ ___  ___   ___  _
 \ \    / /_\ / __| __| _ \ _ \/ _ \ / _ \| |
  \ \/\/ / _ \ (_ | _||   /  _/ (_) | (_) | |__
   \_/\_/_/ \_\___|___|_|_\_|  \___/ \___/|____|

   Pool odds & settlement service
   v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        service_name = %cfg.service.name,
        backend = %cfg.backend.base_url,
        refresh_interval_secs = cfg.refresh.interval_secs,
        currency = %cfg.service.currency,
        "WAGERPOOL starting up"
    );

    // -- Initialise components -------------------------------------------

    // Backend client. The API key is optional: reads work without one,
    // stake placement doesn't.
    let api_key: Option<SecretString> = match cfg.backend.api_key_env.as_deref() {
        Some(env_name) => match AppConfig::resolve_env(env_name) {
            Ok(key) => Some(SecretString::new(key)),
            Err(_) => {
                warn!(env = env_name, "Backend API key not set — read-only mode");
                None
            }
        },
        None => None,
    };
    let backend: Arc<dyn WagerBackend> =
        Arc::new(HttpBackend::new(&cfg.backend.base_url, api_key)?);

    // Wallet and market board, passed by Arc — no singletons.
    let wallet = Arc::new(WalletStore::new(cfg.service.opening_balance));
    let board = Arc::new(MarketBoard::new());

    // Scheduled refresh, cancelled on shutdown.
    let refresher = spawn_refresher(
        backend.clone(),
        board.clone(),
        wallet.clone(),
        Duration::from_secs(cfg.refresh.interval_secs),
    );

    // Dashboard
    if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState {
            board: board.clone(),
            backend: backend.clone(),
            wallet: wallet.clone(),
            participant: cfg.service.participant_id,
            currency: cfg.service.currency.clone(),
        });
        dashboard::spawn_dashboard(state, cfg.dashboard.port)?;
    }

    // -- Run until shutdown ----------------------------------------------

    info!("Running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received.");

    // Stop the refresher cleanly so no poll is cut off mid-flight.
    refresher.stop().await;

    info!(
        balance = format!("${:.2}", wallet.balance()),
        markets = board.list().await.len(),
        "WAGERPOOL shut down cleanly."
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wagerpool=info"));

    let json_logging = std::env::var("WAGERPOOL_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
