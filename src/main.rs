//! Clothing store service entrypoint.

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use clothing_store::config::Config;
use clothing_store::http::{self, AppState};
use clothing_store::notify::{NatsNotifier, Notifier};
use clothing_store::seed;
use clothing_store::store::postgres::PgStore;
use clothing_store::store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(db));

    if std::env::args().nth(1).as_deref() == Some("seed") {
        let count = seed::run(store.as_ref()).await?;
        tracing::info!(count, "catalog seeded");
        return Ok(());
    }

    let notifier: Option<Arc<dyn Notifier>> = match &config.nats_url {
        Some(url) => match async_nats::connect(url).await {
            Ok(client) => Some(Arc::new(NatsNotifier::new(
                client,
                config.notify_subject.clone(),
            ))),
            Err(err) => {
                tracing::warn!(error = %err, "NATS unavailable, order confirmations disabled");
                None
            }
        },
        None => None,
    };

    let app = http::router(AppState { store, notifier });
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("clothing-store listening on 0.0.0.0:{}", config.port);
    axum::serve(listener, app).await?;
    Ok(())
}
