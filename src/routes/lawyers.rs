use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::models::{LawyerProfile, SetSpecialtiesRequest, UpdateLawyerRequest, UserType};
use crate::routes::{ApiError, AppState, Identity};
use crate::services::CacheKey;

pub fn configure(cfg: &mut web::ServiceConfig) {
    // "/lawyers/me" must be registered before "/lawyers/{lawyer_id}"
    cfg.route("/lawyers/me", web::patch().to(update_profile))
        .route("/lawyers/me/specialties", web::put().to(set_specialties))
        .route("/lawyers/{lawyer_id}", web::get().to(get_lawyer));
}

/// GET /api/v1/lawyers/{lawyer_id}
async fn get_lawyer(
    state: web::Data<AppState>,
    _identity: Identity,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let lawyer_id = path.into_inner();

    let lawyer: LawyerProfile = state
        .cache
        .get_or_load(&CacheKey::lawyer(&lawyer_id), || async {
            state.postgres.get_lawyer(&lawyer_id).await
        })
        .await?;

    Ok(HttpResponse::Ok().json(lawyer))
}

/// PATCH /api/v1/lawyers/me
async fn update_profile(
    state: web::Data<AppState>,
    identity: Identity,
    req: web::Json<UpdateLawyerRequest>,
) -> Result<HttpResponse, ApiError> {
    identity.require(UserType::Lawyer)?;
    req.validate()?;

    let lawyer = state.postgres.update_lawyer(&identity.user_id, &req).await?;
    state.cache.evict(&CacheKey::lawyer(&identity.user_id)).await;

    tracing::info!("Lawyer {} updated practice details", identity.user_id);

    Ok(HttpResponse::Ok().json(lawyer))
}

/// PUT /api/v1/lawyers/me/specialties
async fn set_specialties(
    state: web::Data<AppState>,
    identity: Identity,
    req: web::Json<SetSpecialtiesRequest>,
) -> Result<HttpResponse, ApiError> {
    identity.require(UserType::Lawyer)?;

    let lawyer = state
        .postgres
        .set_lawyer_specialties(&identity.user_id, &req.specialties)
        .await?;
    state.cache.evict(&CacheKey::lawyer(&identity.user_id)).await;

    Ok(HttpResponse::Ok().json(lawyer))
}

#[cfg(test)]
mod tests {
    use crate::models::UserType;
    use crate::routes::test_support::{bearer, state, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;

    #[actix_web::test]
    async fn test_clients_cannot_edit_lawyer_profile() {
        let state = state("http://127.0.0.1:1");
        let app = test_app!(state);

        let req = actix_test::TestRequest::patch()
            .uri("/api/v1/lawyers/me")
            .insert_header(bearer(&state, "client-1", UserType::Client))
            .set_json(serde_json::json!({"hourly_rate": 900}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_negative_rate_rejected() {
        let state = state("http://127.0.0.1:1");
        let app = test_app!(state);

        let req = actix_test::TestRequest::patch()
            .uri("/api/v1/lawyers/me")
            .insert_header(bearer(&state, "lawyer-1", UserType::Lawyer))
            .set_json(serde_json::json!({"hourly_rate": -1}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
