use anyhow::{Context, Result};
use boxdesk_server::config::{AppConfig, CliConfig};
use boxdesk_server::data_gateway::{SqliteRecordStore, TenantScopedStore};
use boxdesk_server::job_queue::handlers::{EmailVerificationHandler, ForgotPasswordHandler};
use boxdesk_server::job_queue::{JobDispatcher, SqliteJobStore};
use boxdesk_server::mail::LogMailer;
use boxdesk_server::server::{run_server, ServerState};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_LEVEL_ENV_VAR: &str = "LOG_LEVEL";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_LEVEL_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::resolve(CliConfig::parse())?;
    info!("Starting with config {:?}", config);

    let record_store = Arc::new(
        SqliteRecordStore::new(config.directory_db_path())
            .context("Failed to open directory database")?,
    );
    let gateway = Arc::new(TenantScopedStore::new(record_store));
    let job_store = Arc::new(
        SqliteJobStore::new(config.jobs_db_path()).context("Failed to open jobs database")?,
    );

    let mailer = Arc::new(LogMailer);
    let mut dispatcher = JobDispatcher::new(
        job_store.clone(),
        Duration::from_secs(config.poll_interval_secs),
    );
    dispatcher.register_handler(Box::new(EmailVerificationHandler::new(mailer.clone())));
    dispatcher.register_handler(Box::new(ForgotPasswordHandler::new(mailer)));

    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        ctrlc_token.cancel();
    })
    .context("Failed to install signal handler")?;

    let dispatcher_shutdown = shutdown.clone();
    let dispatcher_task =
        tokio::spawn(async move { dispatcher.run(dispatcher_shutdown).await });

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    let state = ServerState::new(gateway, job_store);
    run_server(listener, state, shutdown).await?;

    dispatcher_task.await.context("Dispatcher task panicked")?;
    info!("Shutdown complete");
    Ok(())
}
