use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::auth::{AuthPayload, CurrentUser, LoginRequest, RegisterRequest},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    error::{AppError, AppResult, ValidationErrors},
    middleware::auth::{AuthUser, issue_token},
    models::{Role, User},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn validate_registration(payload: &RegisterRequest) -> Result<Role, AppError> {
    let mut errors = ValidationErrors::new();
    errors.require_non_blank("name", &payload.name);
    if !looks_like_email(&payload.email) {
        errors.add("email", "The email must be a valid email address.");
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("The password must be at least {MIN_PASSWORD_LEN} characters."),
        );
    }
    let role = payload.role.unwrap_or(Role::Customer);
    if role == Role::Admin {
        errors.add("role", "The selected role is invalid.");
    }
    errors.into_result()?;
    Ok(role)
}

fn looks_like_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<AuthPayload>> {
    let role = validate_registration(&payload)?;
    let email = payload.email.trim().to_lowercase();

    let exist = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::Validation(ValidationErrors::single(
            "email",
            "The email has already been taken.",
        )));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        email: Set(email),
        password_hash: Set(password_hash),
        role: Set(role.as_str().to_string()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let token = issue_token(
        user.id,
        role,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id, "role": role }),
    )
    .await;

    Ok(ApiResponse::success(
        "User registered successfully",
        AuthPayload {
            token,
            token_type: "Bearer".into(),
            user: user.into(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<AuthPayload>> {
    let LoginRequest { email, password } = payload;
    let user = Users::find()
        .filter(UserCol::Email.eq(email.trim().to_lowercase()))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::Unauthorized),
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Unauthorized);
    }

    let role = user
        .role
        .parse::<Role>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
    let token = issue_token(
        user.id,
        role,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
    )?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        AuthPayload {
            token,
            token_type: "Bearer".into(),
            user: user.into(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn logout_user(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_logout",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged out successfully",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn current_user(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CurrentUser>> {
    let model = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let data = CurrentUser {
        user: User::from(model),
        role: user.role,
        permissions: user
            .role
            .permissions()
            .iter()
            .map(|p| p.to_string())
            .collect(),
    };
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(role: Option<Role>) -> RegisterRequest {
        RegisterRequest {
            name: "Amina".into(),
            email: "amina@example.com".into(),
            password: "correct horse".into(),
            role,
        }
    }

    #[test]
    fn registration_defaults_to_customer() {
        assert_eq!(validate_registration(&request(None)).unwrap(), Role::Customer);
        assert_eq!(
            validate_registration(&request(Some(Role::Restaurant))).unwrap(),
            Role::Restaurant
        );
    }

    #[test]
    fn admin_cannot_be_self_assigned() {
        match validate_registration(&request(Some(Role::Admin))) {
            Err(AppError::Validation(errors)) => assert!(errors.contains("role")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_email_and_short_password() {
        let payload = RegisterRequest {
            name: " ".into(),
            email: "not-an-email".into(),
            password: "short".into(),
            role: None,
        };
        match validate_registration(&payload) {
            Err(AppError::Validation(errors)) => {
                assert!(errors.contains("name"));
                assert!(errors.contains("email"));
                assert!(errors.contains("password"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter22").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(
            Argon2::default()
                .verify_password(b"hunter22", &parsed)
                .is_ok()
        );
    }
}
