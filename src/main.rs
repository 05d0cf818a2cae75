use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use metric_poller::app_context::AppContext;
use metric_poller::config::{Config, load_config};
use metric_poller::jobs::{load_initial_definitions, start_background_jobs};
use metric_poller::provider::{HttpTransport, ProviderGateway};
use metric_poller::scheduler::{Scheduler, SchedulerSettings};
use metric_poller::status_store::{MemoryStatusStore, SledStatusStore, StatusStore};

fn init_json_logging() {
    if let Err(error) = tracing_log::LogTracer::init() {
        eprintln!(
            "logging bridge initialization failed (continuing with existing logger): {}",
            error
        );
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .finish();

    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("global logger initialization failed: {}", error);
    }
}

const CONFIG_PATH: &str = "config.toml";
const CONFIG_PATH_ENV: &str = "METRIC_POLLER_CONFIG";

fn open_status_store(config: &Config) -> Result<Arc<dyn StatusStore>, sled::Error> {
    match SledStatusStore::open_from_config(config)? {
        Some(store) => {
            log::info!("status_store_opened kind=sled path={}", config.status_store.path);
            Ok(Arc::new(store))
        }
        None => {
            log::info!("status_store_opened kind=memory");
            Ok(Arc::new(MemoryStatusStore::new()))
        }
    }
}

#[tokio::main]
async fn main() {
    init_json_logging();

    let config_path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| CONFIG_PATH.to_string());
    let config: Config = match load_config(&config_path) {
        Ok(config) => config,
        Err(error) => {
            log::error!("Configuration error: {}", error);
            return;
        }
    };

    log::info!(
        "metric_poller_starting config={} providers={} max_concurrent_evaluations={}",
        config_path,
        config.providers.len(),
        config.engine.max_concurrent_evaluations
    );

    let store = match open_status_store(&config) {
        Ok(store) => store,
        Err(error) => {
            log::error!("Status store error: {}", error);
            return;
        }
    };

    let gateway = ProviderGateway::from_config(
        &config.providers,
        Arc::new(HttpTransport::new()),
        Duration::from_secs(config.engine.provider_timeout_secs),
    );
    log::info!(
        "provider_gateway_ready providers={} timeout_ms={}",
        config.providers.len(),
        gateway.timeout().as_millis()
    );
    let scheduler = Scheduler::new(SchedulerSettings::from_config(&config.engine), gateway, store);
    let app_context = AppContext::new(config, scheduler.clone());

    if let Err(error) = load_initial_definitions(&app_context).await {
        log::warn!("definitions_load_failed error={}", error);
    }

    start_background_jobs(app_context);

    if let Err(error) = tokio::signal::ctrl_c().await {
        log::error!("signal handler failed: {}", error);
    }

    log::info!("metric_poller_stopping");
    scheduler.shutdown().await;
}
