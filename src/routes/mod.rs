// Route exports
pub mod auth;
pub mod cases;
pub mod catalog;
pub mod discover;
pub mod error;
pub mod health;
pub mod identity;
pub mod lawyers;
pub mod messages;

use actix_web::web;
use std::sync::Arc;

use crate::config::DiscoverSettings;
use crate::core::Matcher;
use crate::services::{AuthService, CacheManager, PostgresClient, SupabaseClient};

pub use error::{handle_json_payload_error, handle_path_error, handle_query_payload_error, ApiError};
pub use identity::Identity;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub postgres: Arc<PostgresClient>,
    pub cache: Arc<CacheManager>,
    pub supabase: Arc<SupabaseClient>,
    pub auth: Arc<AuthService>,
    pub matcher: Matcher,
    pub discover: DiscoverSettings,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(health::configure)
            .configure(auth::configure)
            .configure(catalog::configure)
            .configure(lawyers::configure)
            .configure(discover::configure)
            .configure(cases::configure)
            .configure(messages::configure),
    );
}
