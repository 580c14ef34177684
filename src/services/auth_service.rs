use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use secrecy::ExposeSecret;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    audit::log_audit_best_effort,
    dto::auth::{Claims, LoginRequest, LoginResponse, MeResponse, RegisterRequest},
    entity::{
        UserProfiles, Users,
        user_profiles::{Column as ProfileCol, Model as ProfileModel},
        users::{ActiveModel as UserActive, Column as UserCol, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, set_current_user},
    models::{User, UserProfile},
    response::{ApiResponse, Meta},
    services::{
        competition_service::{create_profile, ensure_profile, process_successful_referral},
        payment_service::is_unique_violation,
    },
    session::CurrentUser,
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;
const TOKEN_TTL_HOURS: i64 = 24;

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    Ok(argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string())
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(AppError::BadRequest("Enter a valid email address.".into()));
    }
    Ok(email)
}

pub async fn register_user(
    state: &AppState,
    session: &Session,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<MeResponse>> {
    let RegisterRequest {
        email,
        password,
        first_name,
        last_name,
        referral_code,
    } = payload;
    let email = normalize_email(&email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        )));
    }

    let exist = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::BadRequest("Email is already taken".to_string()));
    }

    let mut notices = Vec::new();
    let referrer = match referral_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => {
            let referrer = find_referrer(state, code).await?;
            if referrer.is_none() {
                notices.push("Invalid referral code, but account created.".to_string());
            }
            referrer
        }
        None => None,
    };

    let password_hash = hash_password(&password)?;
    let txn = state.orm.begin().await?;
    let inserted = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.clone()),
        password_hash: Set(password_hash),
        first_name: Set(first_name.trim().to_string()),
        last_name: Set(last_name.trim().to_string()),
        role: Set("user".into()),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await;
    let user = match inserted {
        Ok(user) => user,
        Err(err) if is_unique_violation(&err) => {
            return Err(AppError::BadRequest("Email is already taken".to_string()));
        }
        Err(err) => return Err(err.into()),
    };
    let profile = create_profile(&txn, user.id, referrer.as_ref().map(|r| r.user_id)).await?;
    txn.commit().await?;

    if let Some(referrer) = &referrer {
        match process_successful_referral(state, referrer.user_id).await {
            Ok(_) => {
                let by = Users::find_by_id(referrer.user_id)
                    .one(&state.orm)
                    .await?
                    .map(|u| u.email)
                    .unwrap_or_else(|| "a friend".to_string());
                notices.push(format!("Account created! You were referred by {by}."));
            }
            Err(err) => {
                tracing::warn!(error = %err, referrer = %referrer.user_id, "referral processing failed");
                notices.push("Account created, but the referral could not be processed.".to_string());
            }
        }
    }

    sign_in(session, &user).await?;
    log_audit_best_effort(
        &state.pool,
        Some(user.id),
        "user_register",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id, "referred": referrer.is_some() })),
    )
    .await;

    if notices.is_empty() {
        notices.push("Registration successful!".to_string());
    }
    Ok(ApiResponse::success(
        "User created",
        MeResponse {
            user: User::from(user),
            profile: Some(UserProfile::from(profile)),
        },
        Some(Meta::empty()),
    )
    .with_notices(notices))
}

async fn find_referrer(state: &AppState, code: &str) -> AppResult<Option<ProfileModel>> {
    Ok(UserProfiles::find()
        .filter(ProfileCol::ReferralCode.eq(code.to_uppercase()))
        .one(&state.orm)
        .await?)
}

async fn sign_in(session: &Session, user: &UserModel) -> AppResult<()> {
    set_current_user(
        session,
        &CurrentUser {
            id: user.id,
            email: user.email.clone(),
            role: user.role.clone(),
        },
    )
    .await?;
    Ok(())
}

pub fn issue_token(user: &UserModel, secret: &str) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(TOKEN_TTL_HOURS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub async fn login_user(
    state: &AppState,
    session: &Session,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    let user = Users::find()
        .filter(UserCol::Email.eq(email.trim().to_lowercase()))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) if u.is_active => u,
        _ => return Err(AppError::BadRequest("Invalid email or password.".into())),
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    let argon2 = Argon2::default();
    if argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid email or password.".into()));
    }

    let token = issue_token(&user, state.config.jwt_secret.expose_secret())?;
    sign_in(session, &user).await?;

    log_audit_best_effort(
        &state.pool,
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await;

    let greeting = if user.first_name.is_empty() {
        user.email.clone()
    } else {
        user.first_name.clone()
    };
    Ok(ApiResponse::success(
        format!("Welcome back, {greeting}!"),
        LoginResponse {
            token: format!("Bearer {}", token),
            user: User::from(user),
        },
        Some(Meta::empty()),
    ))
}

pub async fn logout_user(session: &Session) -> AppResult<ApiResponse<serde_json::Value>> {
    session.flush().await?;
    Ok(ApiResponse::success(
        "You have successfully logged out.",
        serde_json::json!({ "logged_out": true }),
        Some(Meta::empty()),
    ))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<MeResponse>> {
    let account = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::Unauthorized)?;
    let profile = ensure_profile(state, account.id).await?;
    Ok(ApiResponse::success(
        "Me",
        MeResponse {
            user: User::from(account),
            profile: Some(UserProfile::from(profile)),
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized_and_checked() {
        assert_eq!(normalize_email("  Ada@Example.COM ").unwrap(), "ada@example.com");
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("@example.com").is_err());
    }

    #[test]
    fn hashed_passwords_verify() {
        let hash = hash_password("correct horse").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"correct horse", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
    }
}
