use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sanggar::{
    api,
    cache::{IntentCache, MemoryIntentCache, RedisIntentCache},
    config::Settings,
    payments::{IpaymuClient, MidtransClient},
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sanggar=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!(
        "Starting Sanggar server on {}:{}",
        settings.server.host,
        settings.server.port
    );

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    // Intent cache: Redis when configured, in-process otherwise
    let cache: Arc<dyn IntentCache> = match settings.cache.url.as_deref() {
        Some(url) => {
            tracing::info!("Using Redis intent cache");
            Arc::new(RedisIntentCache::new(url).await?)
        }
        None => {
            tracing::warn!("No cache URL configured; pending checkouts will not survive restarts");
            Arc::new(MemoryIntentCache::new())
        }
    };

    // Initialize Midtrans client if configured
    let midtrans_client = if settings.midtrans.enabled {
        if let (Some(server_key), Some(api_url)) = (
            settings.midtrans.server_key.clone(),
            settings.midtrans.api_url.clone(),
        ) {
            tracing::info!("Midtrans payment processing enabled");
            Some(Arc::new(MidtransClient::new(
                server_key,
                api_url,
                format!("{}/payment/success", settings.server.frontend_url),
            )?))
        } else {
            tracing::warn!("Midtrans enabled but missing configuration");
            None
        }
    } else {
        tracing::info!("Midtrans payment processing disabled");
        None
    };

    // Initialize iPaymu client if configured
    let ipaymu_client = if settings.ipaymu.enabled {
        if let (Some(va), Some(api_key), Some(api_url)) = (
            settings.ipaymu.va.clone(),
            settings.ipaymu.api_key.clone(),
            settings.ipaymu.api_url.clone(),
        ) {
            tracing::info!("iPaymu payment processing enabled");
            Some(Arc::new(IpaymuClient::new(
                va,
                api_key,
                api_url,
                format!("{}/payment/success", settings.server.frontend_url),
                format!("{}/api/payments/webhook/ipaymu", settings.server.base_url),
                format!("{}/payment/failed", settings.server.frontend_url),
            )?))
        } else {
            tracing::warn!("iPaymu enabled but missing configuration");
            None
        }
    } else {
        tracing::info!("iPaymu payment processing disabled");
        None
    };

    // Create service context
    let service_context = Arc::new(ServiceContext::new(
        db_pool,
        cache,
        midtrans_client,
        ipaymu_client,
        &settings,
    ));

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        settings.server.host, settings.server.port
    ))
    .await?;

    tracing::info!(
        "Server listening on http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}
