//! Bearer token issuing and validation.
//!
//! Credentials are managed outside this service; tokens carry the learner's
//! id and role, and handlers always act on that explicit id.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::{User, UserRole};

pub const ACCESS_TOKEN_TYPE: &str = "access";

/// JWT claims embedded in access tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub user_id: String,
    pub role: String,
    pub token_type: String,
    pub exp: i64,
    pub iat: i64,
}

/// Access token handed to a client.
#[derive(Debug, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

fn role_name(role: &UserRole) -> &'static str {
    match role {
        UserRole::Member => "Member",
        UserRole::Admin => "Admin",
    }
}

/// Sign an access token for a user.
pub fn issue_access_token(
    user: &User,
    jwt_secret: &str,
    expiry_secs: i64,
) -> Result<AccessToken, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id.to_string(),
        role: role_name(&user.role).to_string(),
        token_type: ACCESS_TOKEN_TYPE.to_string(),
        exp: (now + Duration::seconds(expiry_secs)).timestamp(),
        iat: now.timestamp(),
    };

    let access_token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {e}")))?;

    Ok(AccessToken {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: expiry_secs,
    })
}

/// Validate a JWT and return the claims.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<Claims, AppError> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());

    jsonwebtoken::decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthorized)
}

/// Find a user by ID.
pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Find a user by email, used by tooling that mints development tokens.
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{email}' not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: "learner@example.com".to_string(),
            display_name: "Learner".to_string(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_issue_and_validation() {
        let user = user(UserRole::Admin);
        let secret = "test-secret-key-for-jwt";
        let token = issue_access_token(&user, secret, 900).unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 900);

        let claims = validate_token(&token.access_token, secret).unwrap();
        assert_eq!(claims.sub, "learner@example.com");
        assert_eq!(claims.user_id, user.id.to_string());
        assert_eq!(claims.token_type, ACCESS_TOKEN_TYPE);
        assert_eq!(claims.role, "Admin");
    }

    #[test]
    fn role_claim_parses_back_into_role() {
        let token = issue_access_token(&user(UserRole::Member), "s", 60).unwrap();
        let claims = validate_token(&token.access_token, "s").unwrap();
        let role: UserRole = serde_json::from_str(&format!("\"{}\"", claims.role)).unwrap();
        assert_eq!(role, UserRole::Member);
    }

    #[test]
    fn invalid_token_rejected() {
        assert!(validate_token("garbage.token.here", "secret").is_err());
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = issue_access_token(&user(UserRole::Member), "one", 60).unwrap();
        assert!(validate_token(&token.access_token, "two").is_err());
    }

    #[test]
    fn expired_token_rejected() {
        // Expired well beyond the 60s leeway window
        let token = issue_access_token(&user(UserRole::Member), "secret", -3600).unwrap();
        assert!(validate_token(&token.access_token, "secret").is_err());
    }
}
