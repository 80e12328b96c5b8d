//! JWT authentication extractor for Axum handlers.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::UserRole;
use crate::services::auth as auth_service;
use crate::AppState;

/// Authenticated learner extracted from a JWT Bearer token.
///
/// Every learner-facing handler receives the acting user's id through this
/// extractor and passes it explicitly to the services:
/// ```ignore
/// async fn handler(current_user: CurrentUser) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized)?;

        let claims = auth_service::validate_token(token, &state.config.jwt_secret)?;

        if claims.token_type != auth_service::ACCESS_TOKEN_TYPE {
            return Err(AppError::Unauthorized);
        }

        let id: Uuid = claims
            .user_id
            .parse()
            .map_err(|_| AppError::Unauthorized)?;

        let role: UserRole = serde_json::from_str(&format!("\"{}\"", claims.role))
            .map_err(|_| AppError::Internal(format!("Invalid role in token: {}", claims.role)))?;

        Ok(CurrentUser {
            id,
            email: claims.sub,
            role,
        })
    }
}
