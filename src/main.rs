use std::error::Error;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trackai::{build_rocket, AppState, Config, SqliteStore};

#[rocket::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,trackai=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let store = SqliteStore::open(&config.db_path)?;
    info!(
        db_path = %config.db_path,
        provider = %config.ai_provider,
        "Database ready"
    );

    let _rocket = build_rocket(AppState::new(Arc::new(store), config))
        .launch()
        .await?;

    Ok(())
}
