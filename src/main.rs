#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use fintrack::{
    config::{database, settings},
    core::loan,
    errors::{Error, Result},
    messaging::{Notifier, TracingNotifier},
    remote::{MemoryRemoteStore, RemoteStore},
    repository::Repositories,
    worker::{
        RetryPolicy, Scheduler,
        checks::{CheckContext, check_date, run_checks},
    },
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = settings::load_default_config()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;
    info!(users = app_config.users.len(), "Configuration loaded");

    // 4. Open the local database and make sure every table exists
    let database_url = database::resolve_database_url(app_config.database.url.as_deref());
    database::ensure_parent_dir(&database_url)?;
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    // 5. Seed configured loan schedules
    let seeded = loan::seed_loans(&db, &app_config.loans)
        .await
        .inspect_err(|e| error!("Failed to seed loans: {}", e))?;
    info!(seeded, "Loan seeds applied");

    // 6. Wire the remote store, repositories and notifier
    let remote = Arc::new(MemoryRemoteStore::new());
    let shared_remote: Arc<dyn RemoteStore> = remote.clone();
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let ctx = Arc::new(CheckContext {
        repos: Repositories::new(&db, &shared_remote),
        db,
        notifier,
        alerts: app_config.alerts.clone(),
        sync_retry: RetryPolicy::from(&app_config.worker),
    });
    let users = Arc::new(app_config.users.clone());

    // 7. Run the periodic checks until interrupted
    let mut scheduler = Scheduler::new("financial-checks");
    scheduler.schedule_periodic(
        app_config.worker.check_interval(),
        RetryPolicy::from(&app_config.worker),
        remote,
        move || {
            let ctx = Arc::clone(&ctx);
            let users = Arc::clone(&users);
            async move {
                let today = check_date(chrono::Utc::now());
                run_checks(&ctx, &users, today).await;
                Ok::<_, Error>(())
            }
        },
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    scheduler.cancel();
    Ok(())
}
