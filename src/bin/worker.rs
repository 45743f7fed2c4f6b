use std::{sync::Arc, time::Duration};

use tokio::signal;
use tracing_subscriber::EnvFilter;

use causas::{
    auth::jwt::JwtService, config::AppConfig, db, default_handlers, mailer::LogMailer,
    state::AppState, summarizer::HttpSummarizer, Worker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "worker",
        database_url = %config.redacted_database_url(),
        pool_size = 1,
        poll_interval_seconds = config.worker_poll_interval_seconds,
        "loaded configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    let jwt = JwtService::from_config(&config)?;
    let summarizer = Arc::new(HttpSummarizer::from_config(&config)?);
    let poll_interval = Duration::from_secs(config.worker_poll_interval_seconds.max(1));

    let state = Arc::new(AppState::new(
        pool,
        config,
        jwt,
        summarizer,
        Arc::new(LogMailer),
    ));
    let worker = Worker::new(state, default_handlers(), poll_interval);

    tokio::select! {
        _ = worker.run() => {}
        _ = signal::ctrl_c() => {
            tracing::info!("worker received shutdown signal");
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
