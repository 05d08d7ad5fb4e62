use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::models::UserType;
use crate::routes::error::ApiError;
use crate::services::{AuthError, AuthService};

/// Authenticated caller, taken from the `Authorization: Bearer` header
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub user_type: UserType,
}

impl Identity {
    pub fn require(&self, role: UserType) -> Result<(), ApiError> {
        if self.user_type == role {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!("only {} accounts can do this", role)))
        }
    }
}

impl FromRequest for Identity {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<Identity, ApiError> {
    let auth = req
        .app_data::<web::Data<AuthService>>()
        .ok_or_else(|| ApiError::internal("authentication is not configured"))?;

    let token = bearer_token(req).ok_or(AuthError::MissingToken)?;
    let claims = auth.verify_token(token)?;

    Ok(Identity {
        user_id: claims.sub,
        user_type: claims.user_type,
    })
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}
