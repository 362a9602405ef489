use std::sync::Arc;

use anyhow::{Context, Result};
use dreamink_auth::Authenticator;
use dreamink_config::AppConfig;
use dreamink_database::initialize_database;
use dreamink_stylize::Stylizer;
use sqlx::SqlitePool;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::TRACE)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub authenticator: Authenticator,
    pub stylizer: Arc<Stylizer>,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let authenticator = Authenticator::new(db_pool.clone(), config.auth.clone());
        let stylizer = Arc::new(
            Stylizer::from_config(&config.stylize).context("failed to build stylizer")?,
        );

        info!(
            styles = ?stylizer.styles(),
            device = %stylizer.device(),
            runtime = %config.stylize.runtime.base_url,
            "stylizer ready"
        );

        Ok(Self {
            db_pool,
            authenticator,
            stylizer,
        })
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
