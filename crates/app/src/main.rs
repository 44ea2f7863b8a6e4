use std::sync::Arc;

use migration::{Migrator, MigratorTrait};

use crate::error::Result;

mod error;
mod feed;
mod janitor;
mod settings;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = settings::Settings::new()?;
    let timezone = settings.timezone()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "cambista={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.server.database).await?;
    let engine = engine::Engine::builder()
        .database(db)
        .trash_retention(settings.trash.retention())
        .timezone(timezone)
        .build()
        .await?;
    let engine = Arc::new(engine);

    for account in engine.accounts().await? {
        if let Err(err) = engine.open_account(&account).await {
            tracing::error!("failed to open account {account}: {err}");
        }
    }

    let listener = tokio::net::TcpListener::bind(settings.server.addr()).await?;
    let server_engine = engine.clone();
    tasks.spawn(async move {
        if let Err(err) = server::run_with_listener(server_engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    if settings.rates.enabled {
        let feed = feed::RateFeed::new(&settings.rates.feed_url, &settings.rates.currency)?;
        tracing::info!("polling rate feed {}", settings.rates.feed_url);
        tasks.spawn(feed::poll(
            feed,
            engine.clone(),
            settings.rates.window(),
            timezone,
            settings.rates.poll_interval(),
        ));
    }

    tasks.spawn(janitor::sweep_trash(
        engine.clone(),
        settings.trash.sweep_interval(),
    ));

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(config: &settings::Database) -> Result<sea_orm::DatabaseConnection> {
    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
