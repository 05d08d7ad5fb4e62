use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use legaltendr::config::{LogFormat, LoggingSettings, Settings};
use legaltendr::core::Matcher;
use legaltendr::models::ScoringWeights;
use legaltendr::routes::{self, handle_json_payload_error, handle_path_error, handle_query_payload_error, AppState};
use legaltendr::services::{AuthService, CacheManager, PostgresClient, SupabaseClient};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(defaults: &LoggingSettings) {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| defaults.level.clone());
    let log_format = std::env::var("LOG_FORMAT")
        .map(|v| LogFormat::parse(&v))
        .unwrap_or_else(|_| defaults.log_format());

    let filter = EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.pretty().init(),
        LogFormat::Plain => subscriber.init(),
    }
}

fn startup_error(what: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", what, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", what, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();
    let logging = settings
        .as_ref()
        .map(|s| s.logging.clone())
        .unwrap_or_default();
    init_logging(&logging);

    info!("Starting LegalTendr matching service...");

    let settings = settings.map_err(|e| startup_error("Failed to load configuration", e))?;

    info!("Configuration loaded successfully");

    // Cache falls back to the in-process tier when Redis is down
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match CacheManager::new(&settings.cache.redis_url, l1_cache_size, cache_ttl).await {
        Ok(c) => {
            info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
            Arc::new(c)
        }
        Err(e) => {
            warn!("Failed to connect to Redis ({}), running with the in-memory cache only", e);
            Arc::new(CacheManager::in_memory(l1_cache_size, cache_ttl))
        }
    };

    let db_max_conn = settings.database.max_connections.unwrap_or(10);

    let postgres = Arc::new(
        PostgresClient::from_settings(
            &settings.database.url,
            Some(db_max_conn),
            settings.database.min_connections,
            settings.database.acquire_timeout_secs,
            settings.database.idle_timeout_secs,
        )
        .await
        .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?,
    );

    info!("PostgreSQL client initialized (max: {} connections)", db_max_conn);

    let supabase = Arc::new(
        SupabaseClient::new(
            settings.supabase.url.clone(),
            settings.supabase.anon_key.clone(),
            Duration::from_secs(settings.supabase.timeout_secs.unwrap_or(10)),
        )
        .map_err(|e| startup_error("Failed to build Supabase client", e))?,
    );

    let auth = Arc::new(AuthService::new(
        &settings.auth.jwt_secret,
        settings.auth.token_ttl_secs,
        settings.auth.password_pepper.clone(),
        settings.auth.admin_signup_key.clone(),
    ));

    if settings.auth.jwt_secret == "change-me" {
        warn!("JWT secret is the shipped default; set JWT_SECRET before deploying");
    }

    // Initialize matcher with configured weights
    let weights = ScoringWeights {
        specialty: settings.scoring.weights.specialty,
        rating: settings.scoring.weights.rating,
        experience: settings.scoring.weights.experience,
        price: settings.scoring.weights.price,
        popularity: settings.scoring.weights.popularity,
    };

    let matcher = Matcher::new(weights, settings.discover.default_max_rate);

    info!("Matcher initialized with weights: {:?}", weights);

    let app_state = AppState {
        postgres,
        cache,
        supabase,
        auth: auth.clone(),
        matcher,
        discover: settings.discover.clone(),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::Data::from(auth.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
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
