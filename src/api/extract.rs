use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::api::error::ApiError;
use crate::api::types::AppState;
use crate::auth::{Claims, Role, TokenError};

/// Any signed-in caller.
pub struct AuthUser(pub Claims);

/// Caller holding a student token.
pub struct StudentUser(pub Claims);

/// Caller holding an admin token.
pub struct AdminUser(pub Claims);

fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return Some(token.trim().to_string());
        }
    }
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| pair.trim().strip_prefix("token=").map(str::to_string))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;
        let claims = state.tokens.verify(&token).map_err(|e| match e {
            TokenError::Expired => ApiError::Unauthorized("Session expired, please log in again".into()),
            TokenError::Malformed | TokenError::BadSignature => {
                ApiError::Unauthorized("Invalid token".into())
            }
        })?;
        Ok(AuthUser(claims))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for StudentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if claims.role != Role::Student {
            return Err(ApiError::Forbidden("Student access required".into()));
        }
        Ok(StudentUser(claims))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if claims.role != Role::Admin {
            return Err(ApiError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(claims))
    }
}
