use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::config::DiscoverSettings;
use crate::core::{decode_cursor, encode_cursor, RankRequest};
use crate::models::{
    Case, CountResponse, DiscoverFilters, DiscoverQuery, DiscoverResponse, SwipeRequest, SwipeResponse,
    UndoSwipeResponse, UserType,
};
use crate::routes::{ApiError, AppState, Identity};
use crate::services::CacheKey;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/discover", web::get().to(discover))
        .route("/swipes", web::post().to(swipe))
        .route("/swipes/undo", web::post().to(undo_swipe))
        .route("/swipes/reset", web::post().to(reset_swipes))
        .route("/swipes/stats", web::get().to(swipe_stats))
        .route("/matches", web::get().to(list_matches));
}

/// Resolved discover parameters
#[derive(Debug, Clone)]
struct DiscoverPlan {
    filters: DiscoverFilters,
    wanted_specialties: Vec<String>,
    offset: usize,
    limit: usize,
}

/// Combine the query string with the optional case
///
/// The case supplies the specialties used for scoring, and also the filter
/// when the query names none.
fn plan_discover(
    query: &DiscoverQuery,
    case: Option<&Case>,
    settings: &DiscoverSettings,
) -> Result<DiscoverPlan, ApiError> {
    if let (Some(min), Some(max)) = (query.min_rate, query.max_rate) {
        if min > max {
            return Err(ApiError::bad_request("min_rate must not exceed max_rate"));
        }
    }

    let offset = match query.cursor.as_deref() {
        Some(cursor) => decode_cursor(cursor).ok_or_else(|| ApiError::bad_request("Invalid cursor"))?,
        None => 0,
    };

    let max_limit = settings.max_limit.max(1);
    let limit = query.limit.unwrap_or(settings.default_limit).clamp(1, max_limit) as usize;

    let explicit = query.specialty_ids();
    let wanted_specialties = match case {
        Some(case) => case.specialty_ids(),
        None => explicit.clone(),
    };

    let filters = DiscoverFilters {
        specialties: if explicit.is_empty() { wanted_specialties.clone() } else { explicit },
        min_rate: query.min_rate,
        max_rate: query.max_rate,
        province_id: query.province_id.clone(),
        city_id: query.city_id.clone(),
    };

    Ok(DiscoverPlan {
        filters,
        wanted_specialties,
        offset,
        limit,
    })
}

/// GET /api/v1/discover
///
/// Ranks every lawyer the client has not swiped on yet.
async fn discover(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<DiscoverQuery>,
) -> Result<HttpResponse, ApiError> {
    identity.require(UserType::Client)?;

    let case = match query.case_id {
        Some(case_id) => {
            let case = state.postgres.get_case(case_id).await?;
            if case.client_id != identity.user_id {
                return Err(ApiError::forbidden("case belongs to another client"));
            }
            Some(case)
        }
        None => None,
    };

    let plan = plan_discover(&query, case.as_ref(), &state.discover)?;

    let candidates = state.postgres.list_lawyers(&plan.filters).await?;
    let swiped = state.postgres.swiped_lawyer_ids(&identity.user_id).await?;

    let result = state.matcher.rank(
        candidates,
        &RankRequest {
            filters: &plan.filters,
            wanted_specialties: &plan.wanted_specialties,
            exclude_ids: &swiped,
            offset: plan.offset,
            limit: plan.limit,
        },
    );

    tracing::info!(
        "Returning {} lawyers for client {} ({} eligible of {} candidates)",
        result.lawyers.len(),
        identity.user_id,
        result.total_eligible,
        result.total_candidates
    );

    Ok(HttpResponse::Ok().json(DiscoverResponse {
        lawyers: result.lawyers,
        next_cursor: result.next_offset.map(encode_cursor),
        total_results: result.total_eligible,
    }))
}

/// POST /api/v1/swipes
async fn swipe(
    state: web::Data<AppState>,
    identity: Identity,
    req: web::Json<SwipeRequest>,
) -> Result<HttpResponse, ApiError> {
    identity.require(UserType::Client)?;
    req.validate()?;

    let recorded = state
        .postgres
        .record_swipe(&identity.user_id, &req.lawyer_id, req.direction)
        .await?;

    if recorded.swipe.matched {
        state.cache.evict(&CacheKey::lawyer(&req.lawyer_id)).await;
    }

    Ok(HttpResponse::Created().json(SwipeResponse {
        swipe: recorded.swipe,
        conversation_id: recorded.conversation_id,
    }))
}

/// POST /api/v1/swipes/undo
async fn undo_swipe(state: web::Data<AppState>, identity: Identity) -> Result<HttpResponse, ApiError> {
    identity.require(UserType::Client)?;

    let undone = state.postgres.undo_last_swipe(&identity.user_id).await?;

    if undone.swipe.matched {
        state.cache.evict(&CacheKey::lawyer(&undone.swipe.lawyer_id)).await;
    }

    Ok(HttpResponse::Ok().json(UndoSwipeResponse {
        swipe: undone.swipe,
        conversation_removed: undone.conversation_removed,
    }))
}

/// POST /api/v1/swipes/reset
async fn reset_swipes(state: web::Data<AppState>, identity: Identity) -> Result<HttpResponse, ApiError> {
    identity.require(UserType::Client)?;

    let count = state.postgres.reset_passed_swipes(&identity.user_id).await?;

    Ok(HttpResponse::Ok().json(CountResponse { count }))
}

/// GET /api/v1/swipes/stats
async fn swipe_stats(state: web::Data<AppState>, identity: Identity) -> Result<HttpResponse, ApiError> {
    identity.require(UserType::Client)?;

    let stats = state.postgres.swipe_stats(&identity.user_id).await?;

    Ok(HttpResponse::Ok().json(stats))
}

/// GET /api/v1/matches
async fn list_matches(state: web::Data<AppState>, identity: Identity) -> Result<HttpResponse, ApiError> {
    let matches = match identity.user_type {
        UserType::Client => state.postgres.list_matches_for_client(&identity.user_id).await?,
        UserType::Lawyer => state.postgres.list_matches_for_lawyer(&identity.user_id).await?,
        UserType::Admin => return Err(ApiError::forbidden("admins have no matches")),
    };

    Ok(HttpResponse::Ok().json(matches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CaseStatus, Specialty};
    use crate::routes::test_support::{bearer, state, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use chrono::Utc;
    use uuid::Uuid;

    fn case_with(specialties: &[&str]) -> Case {
        let now = Utc::now();
        Case {
            case_id: Uuid::new_v4(),
            client_id: "client-1".to_string(),
            title: "Visa renewal".to_string(),
            description: "Work visa expiring".to_string(),
            hired_lawyer_id: None,
            status: CaseStatus::Open,
            created_at: now,
            updated_at: now,
            specialties: specialties
                .iter()
                .map(|s| Specialty {
                    specialty_id: s.to_string(),
                    name: s.to_string(),
                    description: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_plan_defaults() {
        let plan = plan_discover(&DiscoverQuery::default(), None, &DiscoverSettings::default()).unwrap();
        assert_eq!(plan.offset, 0);
        assert_eq!(plan.limit, 20);
        assert!(plan.filters.specialties.is_empty());
    }

    #[test]
    fn test_plan_clamps_limit_and_reads_cursor() {
        let query = DiscoverQuery {
            limit: Some(500),
            cursor: Some("40".to_string()),
            ..Default::default()
        };
        let plan = plan_discover(&query, None, &DiscoverSettings::default()).unwrap();
        assert_eq!(plan.limit, 100);
        assert_eq!(plan.offset, 40);

        let zero = DiscoverQuery {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(plan_discover(&zero, None, &DiscoverSettings::default()).unwrap().limit, 1);
    }

    #[test]
    fn test_plan_rejects_bad_input() {
        let cursor = DiscoverQuery {
            cursor: Some("abc".to_string()),
            ..Default::default()
        };
        assert!(plan_discover(&cursor, None, &DiscoverSettings::default()).is_err());

        let rates = DiscoverQuery {
            min_rate: Some(2000),
            max_rate: Some(1000),
            ..Default::default()
        };
        assert!(plan_discover(&rates, None, &DiscoverSettings::default()).is_err());
    }

    #[test]
    fn test_case_supplies_specialties() {
        let case = case_with(&["immigration-law"]);

        let plan = plan_discover(&DiscoverQuery::default(), Some(&case), &DiscoverSettings::default()).unwrap();
        assert_eq!(plan.filters.specialties, vec!["immigration-law"]);
        assert_eq!(plan.wanted_specialties, vec!["immigration-law"]);

        // An explicit filter wins for filtering but the case still drives scoring
        let query = DiscoverQuery {
            specialties: Some("family-law".to_string()),
            ..Default::default()
        };
        let plan = plan_discover(&query, Some(&case), &DiscoverSettings::default()).unwrap();
        assert_eq!(plan.filters.specialties, vec!["family-law"]);
        assert_eq!(plan.wanted_specialties, vec!["immigration-law"]);
    }

    #[actix_web::test]
    async fn test_lawyers_cannot_swipe() {
        let state = state("http://127.0.0.1:1");
        let app = test_app!(state);

        let req = actix_test::TestRequest::post()
            .uri("/api/v1/swipes")
            .insert_header(bearer(&state, "lawyer-1", UserType::Lawyer))
            .set_json(serde_json::json!({"lawyer_id": "lawyer-2", "direction": "right"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_unknown_direction_is_invalid_json() {
        let state = state("http://127.0.0.1:1");
        let app = test_app!(state);

        let req = actix_test::TestRequest::post()
            .uri("/api/v1/swipes")
            .insert_header(bearer(&state, "client-1", UserType::Client))
            .set_json(serde_json::json!({"lawyer_id": "lawyer-2", "direction": "up"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_bad_discover_query() {
        let state = state("http://127.0.0.1:1");
        let app = test_app!(state);

        let req = actix_test::TestRequest::get()
            .uri("/api/v1/discover?min_rate=lots")
            .insert_header(bearer(&state, "client-1", UserType::Client))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
