use std::sync::Arc;

use onboarding_tour::config::TourConfig;
use onboarding_tour::error::Result;
use onboarding_tour::i18n::BundleLocalizer;
use onboarding_tour::identity::HealthcheckClient;
use onboarding_tour::images::{HttpImageLoader, ImageCache};
use onboarding_tour::notify::BroadcastNotifier;
use onboarding_tour::store::{KeyValueStore, LibSqlStore, ProgressStore};
use onboarding_tour::tour::{ProductInfo, TourDeps, TourService, tour_routes};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = TourConfig::from_env()?;

    eprintln!("🧭 Onboarding Tour v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Product: {} ({})", config.product, config.callsign);
    eprintln!("   Theme: {}  Language: {}", config.theme, config.language);
    eprintln!("   Tour API: http://0.0.0.0:{}/api/tour", config.port);

    // ── Storage ──────────────────────────────────────────────────────────
    let storage: Arc<dyn KeyValueStore> = if config.db_path == ":memory:" {
        Arc::new(LibSqlStore::new_memory().await?)
    } else {
        let path = std::path::Path::new(&config.db_path);
        Arc::new(LibSqlStore::new_local(path).await.unwrap_or_else(|e| {
            eprintln!("Error: Failed to open database at {}: {}", config.db_path, e);
            std::process::exit(1);
        }))
    };
    eprintln!("   Database: {}", config.db_path);

    // ── Tour services ────────────────────────────────────────────────────
    let notifier = Arc::new(BroadcastNotifier::new());
    let deps = TourDeps {
        progress: Arc::new(ProgressStore::new(storage)),
        images: ImageCache::new(Arc::new(HttpImageLoader::new(
            config.asset_base_url.clone(),
            config.image_timeout,
        ))),
        notifier: notifier.clone(),
        localizer: Arc::new(BundleLocalizer::bundled(&config.language)),
    };
    let identity = Arc::new(HealthcheckClient::new(config.healthcheck_url.clone()));
    eprintln!("   Healthcheck: {}", config.healthcheck_url);
    eprintln!("   Assets: {}", config.asset_base_url);

    let service = TourService::new(ProductInfo::from(&config), identity, deps);

    eprintln!("   Toasts: ws://0.0.0.0:{}/ws/toasts\n", config.port);

    let app = tour_routes(service, notifier);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Tour server started");
    axum::serve(listener, app).await?;

    Ok(())
}
