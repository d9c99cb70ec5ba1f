use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use rakth_match::config::Settings;
use rakth_match::core::{CityDirectory, Matcher, ModelProvider};
use rakth_match::routes::{self, AppState};
use rakth_match::services::{CacheManager, CachedStore, MatchStore, PostgresClient, RankingService};

fn init_tracing(level: &str, format: &str) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn io_error(message: String) -> std::io::Error {
    std::io::Error::other(message)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| io_error(format!("Configuration error: {}", e)))?;

    init_tracing(&settings.logging.level, &settings.logging.format);

    info!("Starting Rakth match service...");

    // City coordinates, optionally extended from a TOML table
    let cities = match &settings.matching.city_table_path {
        Some(path) => CityDirectory::with_overrides(path).unwrap_or_else(|e| {
            warn!("Failed to load city table {}: {}, using built-in cities", path.display(), e);
            CityDirectory::builtin()
        }),
        None => CityDirectory::builtin(),
    };

    info!("City directory ready ({} cities)", cities.len());

    let models = ModelProvider::load(
        settings.models.tree_path.as_deref(),
        settings.models.logistic_path.as_deref(),
    );

    let postgres = PostgresClient::from_settings(
        &settings.database.url,
        settings.database.max_connections,
        settings.database.min_connections,
        settings.database.acquire_timeout_secs,
        settings.database.idle_timeout_secs,
    )
    .await
    .map_err(|e| {
        error!("Failed to connect to PostgreSQL: {}", e);
        io_error(format!("PostgreSQL connection error: {}", e))
    })?;

    info!("PostgreSQL client initialized");

    let mut store: Arc<dyn MatchStore> = Arc::new(postgres);

    if settings.cache.enabled {
        let cache_ttl = settings.cache.ttl_secs.unwrap_or(60);
        let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

        let cache = match CacheManager::new(settings.cache.redis_url.as_deref(), l1_cache_size, cache_ttl).await {
            Ok(c) => c,
            Err(e) => {
                warn!("Failed to connect to Redis ({}), using in-process cache only", e);
                CacheManager::l1_only(l1_cache_size, cache_ttl)
            }
        };

        info!(
            "Cache manager initialized (L1: {} entries, TTL: {}s, redis: {})",
            l1_cache_size,
            cache_ttl,
            cache.has_redis()
        );

        store = Arc::new(CachedStore::new(store, Arc::new(cache)));
    }

    let weights = settings.weights();
    let matcher = Matcher::new(weights, cities, settings.matching.max_results);

    info!("Matcher initialized with weights: {:?}", weights);

    let app_state = AppState {
        store: store.clone(),
        ranking: RankingService::new(store, matcher, settings.matching.default_radius_km),
        models,
    };

    info!("Scoring mode: {:?}", app_state.scoring_mode());

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(routes::json_config())
            .app_data(routes::query_config())
            .app_data(routes::path_config())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
