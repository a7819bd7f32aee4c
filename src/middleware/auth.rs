use axum::{
    extract::{FromRef, FromRequestParts},
    http::header,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError, models::Role, state::AppState};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn ensure_role(user: &AuthUser, role: Role) -> Result<(), AppError> {
    ensure_any_role(user, &[role])
}

pub fn ensure_any_role(user: &AuthUser, roles: &[Role]) -> Result<(), AppError> {
    if !roles.contains(&user.role) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, Role::Admin)
}

pub fn issue_token(
    user_id: Uuid,
    role: Role,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, AppError> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn decode_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let user_id = Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Unauthorized)?;
    let role = decoded
        .claims
        .role
        .parse::<Role>()
        .map_err(|_| AppError::Unauthorized)?;

    Ok(AuthUser { user_id, role })
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AppError::Unauthorized)?;

        let auth_str = auth_header.to_str().map_err(|_| AppError::Unauthorized)?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let state = AppState::from_ref(state);
        decode_token(token, &state.config.jwt_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn role_guards() {
        assert!(ensure_admin(&user(Role::Admin)).is_ok());
        assert!(matches!(
            ensure_admin(&user(Role::Customer)),
            Err(AppError::Forbidden)
        ));
        assert!(ensure_any_role(&user(Role::Restaurant), &[Role::Admin, Role::Restaurant]).is_ok());
        assert!(ensure_any_role(&user(Role::Customer), &[Role::Admin, Role::Restaurant]).is_err());
    }

    #[test]
    fn token_round_trip() {
        let id = Uuid::new_v4();
        let token = issue_token(id, Role::Restaurant, "s3cret", 1).unwrap();
        let decoded = decode_token(&token, "s3cret").unwrap();
        assert_eq!(decoded.user_id, id);
        assert_eq!(decoded.role, Role::Restaurant);
    }

    #[test]
    fn token_with_wrong_secret_is_unauthorized() {
        let token = issue_token(Uuid::new_v4(), Role::Customer, "one", 1).unwrap();
        assert!(matches!(
            decode_token(&token, "two"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let token = issue_token(Uuid::new_v4(), Role::Customer, "s3cret", -2).unwrap();
        assert!(matches!(
            decode_token(&token, "s3cret"),
            Err(AppError::Unauthorized)
        ));
    }
}
