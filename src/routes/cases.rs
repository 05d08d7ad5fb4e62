use actix_web::{web, HttpResponse};
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

use crate::core::RankRequest;
use crate::models::{
    CaseListQuery, CreateCaseRequest, DiscoverFilters, ScoredLawyer, SetSpecialtiesRequest, ShareCaseRequest,
    UpdateCaseRequest, UserType,
};
use crate::routes::error::require_non_blank;
use crate::routes::{ApiError, AppState, Identity};
use crate::services::can_view_case;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/cases", web::post().to(create_case))
        .route("/cases", web::get().to(list_cases))
        .route("/cases/{case_id}", web::get().to(get_case))
        .route("/cases/{case_id}", web::patch().to(update_case))
        .route("/cases/{case_id}/specialties", web::put().to(set_case_specialties))
        .route("/cases/{case_id}/lawyers", web::get().to(case_lawyers))
        .route("/cases/{case_id}/share", web::post().to(share_case));
}

/// POST /api/v1/cases
async fn create_case(
    state: web::Data<AppState>,
    identity: Identity,
    req: web::Json<CreateCaseRequest>,
) -> Result<HttpResponse, ApiError> {
    identity.require(UserType::Client)?;
    req.validate()?;
    require_non_blank("title", &req.title)?;
    require_non_blank("description", &req.description)?;

    let case = state
        .postgres
        .create_case(&identity.user_id, req.title.trim(), req.description.trim(), &req.specialties)
        .await?;

    Ok(HttpResponse::Created().json(case))
}

/// GET /api/v1/cases
async fn list_cases(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<CaseListQuery>,
) -> Result<HttpResponse, ApiError> {
    let cases = state.postgres.list_cases(&identity.user_id, query.status).await?;
    Ok(HttpResponse::Ok().json(cases))
}

/// GET /api/v1/cases/{case_id}
async fn get_case(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let case = state.postgres.get_case(path.into_inner()).await?;

    if !can_view_case(&case, &identity.user_id) {
        return Err(ApiError::forbidden("not allowed to view this case"));
    }

    Ok(HttpResponse::Ok().json(case))
}

/// PATCH /api/v1/cases/{case_id}
async fn update_case(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    req: web::Json<UpdateCaseRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    if let Some(title) = &req.title {
        require_non_blank("title", title)?;
    }
    if let Some(description) = &req.description {
        require_non_blank("description", description)?;
    }

    let case = state
        .postgres
        .update_case(path.into_inner(), &identity.user_id, &req)
        .await?;

    tracing::info!("Case {} updated by {}", case.case_id, identity.user_id);

    Ok(HttpResponse::Ok().json(case))
}

/// PUT /api/v1/cases/{case_id}/specialties
async fn set_case_specialties(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    req: web::Json<SetSpecialtiesRequest>,
) -> Result<HttpResponse, ApiError> {
    let case = state
        .postgres
        .set_case_specialties(path.into_inner(), &identity.user_id, &req.specialties)
        .await?;

    Ok(HttpResponse::Ok().json(case))
}

/// GET /api/v1/cases/{case_id}/lawyers
///
/// Lawyers holding any of the case's specialties, best match first.
async fn case_lawyers(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let case = state.postgres.get_case(path.into_inner()).await?;

    if !can_view_case(&case, &identity.user_id) {
        return Err(ApiError::forbidden("not allowed to view this case"));
    }

    let wanted = case.specialty_ids();
    if wanted.is_empty() {
        return Ok(HttpResponse::Ok().json(Vec::<ScoredLawyer>::new()));
    }

    let filters = DiscoverFilters {
        specialties: wanted.clone(),
        ..Default::default()
    };
    let candidates = state.postgres.list_lawyers(&filters).await?;
    let exclude = HashSet::new();

    let result = state.matcher.rank(
        candidates,
        &RankRequest {
            filters: &filters,
            wanted_specialties: &wanted,
            exclude_ids: &exclude,
            offset: 0,
            limit: state.discover.max_limit.max(1) as usize,
        },
    );

    Ok(HttpResponse::Ok().json(result.lawyers))
}

/// POST /api/v1/cases/{case_id}/share
///
/// Posts the case summary into one of the owner's conversations.
async fn share_case(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    req: web::Json<ShareCaseRequest>,
) -> Result<HttpResponse, ApiError> {
    let case = state.postgres.get_case(path.into_inner()).await?;

    if case.client_id != identity.user_id {
        return Err(ApiError::forbidden("only the case owner can share it"));
    }

    let message = state
        .postgres
        .send_message(req.conversation_id, &identity.user_id, &case.share_text())
        .await?;

    tracing::info!("Case {} shared into conversation {}", case.case_id, req.conversation_id);

    Ok(HttpResponse::Created().json(message))
}
