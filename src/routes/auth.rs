use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::core::{capitalize_words, generate_user_id};
use crate::models::{AccountResponse, AuthResponse, SignInRequest, SignUpRequest, UpdateAccountRequest, User, UserType};
use crate::routes::error::require_non_blank;
use crate::routes::{ApiError, AppState, Identity};
use crate::services::{AuthError, CacheKey, NewAccount};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/auth/signup", web::post().to(sign_up))
        .route("/auth/signin", web::post().to(sign_in))
        .route("/auth/me", web::get().to(get_me))
        .route("/auth/me", web::patch().to(update_me));
}

fn capitalize_opt(value: &Option<String>) -> Option<String> {
    value.as_deref().map(|v| capitalize_words(v.trim()))
}

/// Turn a validated signup payload into the row set to insert
fn new_account(req: &SignUpRequest, password_hash: String) -> NewAccount {
    let is_lawyer = req.user_type == UserType::Lawyer;

    NewAccount {
        user_id: generate_user_id(req.phone_number.as_deref().unwrap_or_default()),
        email: req.email.trim().to_lowercase(),
        password_hash,
        user_type: req.user_type,
        first_name: capitalize_words(req.first_name.trim()),
        last_name: capitalize_words(req.last_name.trim()),
        phone_number: req.phone_number.clone(),
        profile_picture_url: req.profile_picture_url.clone(),
        province_id: req.province_id.clone(),
        province_name: capitalize_opt(&req.province_name),
        city_id: req.city_id.clone(),
        city_name: capitalize_opt(&req.city_name),
        bio: req.bio.clone(),
        hourly_rate: if is_lawyer { req.hourly_rate.unwrap_or(0) } else { 0 },
        years_of_experience: if is_lawyer { req.years_of_experience.unwrap_or(0) } else { 0 },
        specialties: if is_lawyer { req.specialties.clone() } else { Vec::new() },
    }
}

fn auth_response(state: &AppState, user: User) -> Result<AuthResponse, ApiError> {
    let token = state.auth.issue_token(&user.user_id, user.user_type)?;

    Ok(AuthResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.auth.token_ttl_secs(),
        user,
    })
}

/// POST /api/v1/auth/signup
async fn sign_up(state: web::Data<AppState>, req: web::Json<SignUpRequest>) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    require_non_blank("first_name", &req.first_name)?;
    require_non_blank("last_name", &req.last_name)?;

    if req.user_type == UserType::Admin {
        state.auth.check_admin_key(req.admin_key.as_deref())?;
    }

    let password_hash = state.auth.hash_password(&req.password)?;
    let account = new_account(&req, password_hash);

    let user = state.postgres.create_account(account).await?;

    tracing::info!("New {} signed up: {}", user.user_type, user.user_id);

    Ok(HttpResponse::Created().json(auth_response(&state, user)?))
}

/// POST /api/v1/auth/signin
async fn sign_in(state: web::Data<AppState>, req: web::Json<SignInRequest>) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let email = req.email.trim().to_lowercase();

    let credentials = state
        .postgres
        .get_credentials_by_email(&email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !state.auth.verify_password(&req.password, &credentials.password_hash) {
        tracing::info!("Failed sign-in for {}", credentials.user.user_id);
        return Err(AuthError::InvalidCredentials.into());
    }

    Ok(HttpResponse::Ok().json(auth_response(&state, credentials.user)?))
}

async fn account_response(state: &AppState, user: User) -> Result<AccountResponse, ApiError> {
    let (client, lawyer) = match user.user_type {
        UserType::Client => (state.postgres.get_client_profile(&user.user_id).await?, None),
        UserType::Lawyer => (None, Some(state.postgres.get_lawyer(&user.user_id).await?)),
        UserType::Admin => (None, None),
    };

    Ok(AccountResponse { user, client, lawyer })
}

/// GET /api/v1/auth/me
async fn get_me(state: web::Data<AppState>, identity: Identity) -> Result<HttpResponse, ApiError> {
    let user = state.postgres.get_user(&identity.user_id).await?;
    Ok(HttpResponse::Ok().json(account_response(&state, user).await?))
}

/// PATCH /api/v1/auth/me
async fn update_me(
    state: web::Data<AppState>,
    identity: Identity,
    req: web::Json<UpdateAccountRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    if let Some(first_name) = &req.first_name {
        require_non_blank("first_name", first_name)?;
    }
    if let Some(last_name) = &req.last_name {
        require_non_blank("last_name", last_name)?;
    }

    let mut changes = req.into_inner();
    changes.first_name = capitalize_opt(&changes.first_name);
    changes.last_name = capitalize_opt(&changes.last_name);
    changes.province_name = capitalize_opt(&changes.province_name);
    changes.city_name = capitalize_opt(&changes.city_name);

    let user = state.postgres.update_account(&identity.user_id, &changes).await?;

    if user.user_type == UserType::Lawyer {
        state.cache.evict(&CacheKey::lawyer(&user.user_id)).await;
    }

    Ok(HttpResponse::Ok().json(account_response(&state, user).await?))
}
