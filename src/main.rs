//! Booking coordinator web server

use booking_coordinator::api;
use booking_coordinator::config::AppConfig;
use booking_coordinator::infrastructure::database::DatabaseConnection;
use booking_coordinator::service_collection;

use anyhow::anyhow;
use axum::http::{HeaderValue, Method};
use di_axum::RouterServiceProviderExtensions;
use log::{info, warn};
use tokio::runtime::{Builder, Runtime};
use tower_http::cors::{Any, CorsLayer};

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;

    let web_task_handle = runtime.spawn(web_server_task(AppConfig::from_env()));

    runtime.block_on(web_task_handle)?
}

async fn web_server_task(config: AppConfig) -> anyhow::Result<()> {
    let database_url = config
        .database_url
        .clone()
        .ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;

    let pool = DatabaseConnection::connect(&database_url, 5).await?;
    DatabaseConnection::install(pool);

    let provider = service_collection()
        .build_provider()
        .map_err(|err| anyhow!("invalid service registrations: {err:?}"))?;

    let app = api::router()
        .layer(cors_layer(&config))
        .with_provider(provider);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    info!("Shutting down...");

    Ok(())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!("ignoring invalid CORS origin `{origin}`");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(origins)
}
