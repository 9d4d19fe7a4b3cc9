mod config;
mod db;

use config::WorkerConfig;
use db::{WorkflowLogRepository, WorkflowRepository};
use paperbridge_integration::{Connector, ConnectorProvider, HttpConnectorProvider};
use paperbridge_scheduler::Scheduler;
use paperbridge_workflow::{LogStore, WorkflowExecutor, WorkflowStore};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = WorkerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let connectors = Arc::new(HttpConnectorProvider::new(
        config.paperless,
        config.lexoffice,
        config.http.timeout(),
    ));
    probe_connections(connectors.as_ref()).await;

    let workflows: Arc<dyn WorkflowStore> = Arc::new(WorkflowRepository::new(db_pool.clone()));
    let logs: Arc<dyn LogStore> = Arc::new(WorkflowLogRepository::new(db_pool));
    let executor = WorkflowExecutor::new(Arc::clone(&workflows), logs, connectors);
    let scheduler = Scheduler::new(workflows, executor, config.scheduler.max_concurrency);

    let mut interval =
        tokio::time::interval(Duration::from_secs(config.scheduler.interval_seconds.max(1)));
    tracing::info!(
        interval_seconds = config.scheduler.interval_seconds,
        "Scheduler started"
    );
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = scheduler.run_scheduled_workflows().await {
                    tracing::warn!(error = %e, "Scheduled run failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }
}

/// Logs whether both services answer. Startup continues either way.
async fn probe_connections(connectors: &dyn ConnectorProvider) {
    match connectors.open_documents() {
        Ok(documents) => {
            let status = documents.test_connection().await;
            if status.success {
                tracing::info!(message = %status.message, "Paperless-ngx reachable");
            } else {
                tracing::warn!(message = %status.message, "Paperless-ngx unreachable");
            }
            documents.close().await;
        }
        Err(e) => tracing::warn!(error = %e, "Failed to open Paperless-ngx connector"),
    }

    match connectors.open_accounting() {
        Ok(accounting) => {
            let status = accounting.test_connection().await;
            if status.success {
                tracing::info!(message = %status.message, "Lexoffice reachable");
            } else {
                tracing::warn!(message = %status.message, "Lexoffice unreachable");
            }
            accounting.close().await;
        }
        Err(e) => tracing::warn!(error = %e, "Failed to open Lexoffice connector"),
    }
}
