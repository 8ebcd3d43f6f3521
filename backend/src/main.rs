//! Scrap Link marketplace - Backend Server

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scraplink_backend::{
    config::{Config, GatewayBackend},
    create_app,
    external::{EmailJsClient, PriceOracleClient},
    gateway::{InMemoryGateway, PersistenceGateway, PgGateway},
    services::{NotificationOutbox, NotificationWorker, RetryPolicy},
    AppState,
};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "scraplink_server=debug,scraplink_backend=debug,tower_http=debug,sqlx=warn".into()
    });

    let json = std::env::var("SCRAPLINK_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn connect_gateway(config: &Config) -> anyhow::Result<Arc<dyn PersistenceGateway>> {
    match config.database.backend {
        GatewayBackend::Memory => {
            tracing::warn!("Using the in-memory gateway; data is lost on restart");
            Ok(Arc::new(InMemoryGateway::new()))
        }
        GatewayBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(&config.database.url)
                .await
                .context("database connection failed")?;

            tracing::info!("Database connection established");

            // Run migrations in development
            if config.environment == "development" {
                tracing::info!("Running database migrations...");
                sqlx::migrate!("./migrations").run(&db_pool).await?;
                tracing::info!("Migrations completed");
            }

            Ok(Arc::new(PgGateway::new(db_pool)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    init_tracing();
    let config = Config::load()?;

    tracing::info!("Starting Scrap Link Server");
    tracing::info!("Environment: {}", config.environment);

    let gateway = connect_gateway(&config).await?;

    let email_client = EmailJsClient::new(&config.email)?;
    if !email_client.is_configured() {
        tracing::warn!("EmailJS credentials missing or placeholders; emails will only be logged");
    }
    let price_oracle = PriceOracleClient::new(&config.price_oracle)?;

    // Notification worker consumes the outbox for the lifetime of the server
    let (outbox, receiver) = NotificationOutbox::channel();
    NotificationWorker::new(
        Arc::new(email_client),
        gateway.clone(),
        RetryPolicy::from(&config.notifications),
    )
    .spawn(receiver);

    // Create application state
    let state = AppState {
        gateway,
        config: Arc::new(config.clone()),
        outbox,
        price_oracle: Arc::new(price_oracle),
    };

    // Build application
    let app = create_app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
