use actix_web::{web, HttpResponse};

use crate::models::{GeoCode, Specialty};
use crate::routes::{ApiError, AppState};
use crate::services::CacheKey;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/specialties", web::get().to(list_specialties))
        .route("/geo/provinces", web::get().to(list_provinces))
        .route("/geo/provinces/{province_id}/cities", web::get().to(list_cities));
}

/// GET /api/v1/specialties
async fn list_specialties(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let specialties: Vec<Specialty> = state
        .cache
        .get_or_load(&CacheKey::specialties(), || async {
            state.postgres.list_specialties().await
        })
        .await?;

    Ok(HttpResponse::Ok().json(specialties))
}

/// GET /api/v1/geo/provinces
async fn list_provinces(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let provinces: Vec<GeoCode> = state
        .cache
        .get_or_load(&CacheKey::provinces(), || async { state.supabase.list_provinces().await })
        .await?;

    Ok(HttpResponse::Ok().json(provinces))
}

/// GET /api/v1/geo/provinces/{province_id}/cities
async fn list_cities(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let province_id = path.into_inner();

    let cities: Vec<GeoCode> = state
        .cache
        .get_or_load(&CacheKey::cities(&province_id), || async {
            state.supabase.list_cities(&province_id).await
        })
        .await?;

    tracing::debug!("Returning {} cities for province {}", cities.len(), province_id);

    Ok(HttpResponse::Ok().json(cities))
}
