use actix_web::{web, HttpResponse, Responder};

use crate::models::{CacheHealth, HealthResponse};
use crate::routes::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = match state.postgres.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!("PostgreSQL health check failed: {}", e);
            false
        }
    };

    let redis_healthy = state.cache.health_check().await;
    let stats = state.cache.stats();

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        database: pg_healthy,
        cache: CacheHealth {
            redis: redis_healthy,
            l1_entries: stats.l1_size,
        },
    })
}

#[cfg(test)]
mod tests {
    use crate::models::HealthResponse;
    use crate::routes::test_support::{state, test_app};
    use actix_web::test as actix_test;

    #[actix_web::test]
    async fn test_health_reports_degraded_without_database() {
        let state = state("http://127.0.0.1:1");
        let app = test_app!(state);

        let req = actix_test::TestRequest::get().uri("/api/v1/health").to_request();
        let response: HealthResponse = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(response.status, "degraded");
        assert!(!response.database);
        assert!(!response.cache.redis);
        assert_eq!(response.version, env!("CARGO_PKG_VERSION"));
    }
}
