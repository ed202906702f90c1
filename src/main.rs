//! Bundy kiosk server binary.
//!
//! Start the server with:
//! ```bash
//! cargo run --bin bundy-kiosk -- --config config/kiosk.yaml --employees config/employees.json
//! ```

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use bundy_engine::api::{AppState, create_router};
use bundy_engine::attendance::AutoClockout;
use bundy_engine::clock::{Clock, SystemClock};
use bundy_engine::config::ConfigLoader;
use bundy_engine::models::Employee;
use bundy_engine::store::{FileFlagStore, InMemoryStore};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Bundy kiosk - clock employees in and out, export attendance reports
#[derive(Parser, Debug)]
#[command(name = "bundy-kiosk")]
#[command(about = "Attendance kiosk server with daily auto clock-out")]
struct Args {
    /// Path to the kiosk configuration file
    #[arg(short, long, env = "BUNDY_CONFIG", default_value = "config/kiosk.yaml")]
    config: PathBuf,

    /// Override the configured bind address
    #[arg(short, long)]
    bind: Option<String>,

    /// JSON file with the employee directory to load at startup
    #[arg(short, long, env = "BUNDY_EMPLOYEES")]
    employees: Option<PathBuf>,

    /// Verbose logging (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn load_employees(store: &InMemoryStore, path: &PathBuf) -> Result<usize, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    let employees: Vec<Employee> = serde_json::from_str(&content)?;
    let count = employees.len();
    for employee in employees {
        store.upsert_employee(employee)?;
    }
    Ok(count)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => "bundy_engine=info,bundy_kiosk=info",
        1 => "bundy_engine=debug,bundy_kiosk=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    // Configuration errors are fatal at startup.
    let mut config = match ConfigLoader::load(&args.config) {
        Ok(loader) => loader.into_config(),
        Err(err) => {
            error!(path = %args.config.display(), error = %err, "Failed to load configuration");
            process::exit(1);
        }
    };
    if let Some(bind) = args.bind {
        config = config.with_bind_address(bind);
    }

    let store = Arc::new(InMemoryStore::new(config.org_id()));
    if let Some(path) = &args.employees {
        match load_employees(&store, path) {
            Ok(count) => info!(path = %path.display(), count, "Loaded employee directory"),
            Err(err) => {
                error!(path = %path.display(), error = %err, "Failed to load employee directory");
                process::exit(1);
            }
        }
    } else {
        warn!("No employee directory given; the kiosk will list nobody");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = if config.scheduler_enabled() {
        let flags = Arc::new(FileFlagStore::new(config.flag_path().clone()));
        let auto = AutoClockout::from_config(&config, store.clone(), store.clone(), flags);
        info!(
            fire_time = %config.fire_time(),
            time_zone = %config.time_zone(),
            window = ?config.trigger_window(),
            "Auto clock-out scheduler enabled"
        );
        Some(tokio::spawn(auto.run(
            clock.clone(),
            config.poll_interval(),
            shutdown_rx,
        )))
    } else {
        info!("Auto clock-out scheduler disabled");
        None
    };

    let bind_address = config.bind_address().to_string();
    let state = AppState::new(config, store.clone(), store, clock);
    let router = create_router(state);

    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(bind_address = %bind_address, error = %err, "Failed to bind");
            process::exit(1);
        }
    };
    info!(bind_address = %bind_address, "Kiosk API listening");

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await;
    if let Err(err) = served {
        error!(error = %err, "Server error");
    }

    let _ = shutdown_tx.send(true);
    if let Some(handle) = scheduler {
        if let Err(err) = handle.await {
            warn!(error = %err, "Scheduler task ended abnormally");
        }
    }
    info!("Kiosk stopped");
}
