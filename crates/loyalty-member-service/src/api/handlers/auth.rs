//! 注册/登录相关的 HTTP 处理器

use axum::{Json, extract::State};
use axum::{Extension, http::StatusCode};
use tracing::info;
use validator::Validate;

use crate::api::dto::{ApiResponse, AuthResponse, LoginRequest, RegisterRequest};
use crate::api::error::Result;
use crate::api::state::AppState;
use crate::auth::{Claims, hash_password, verify_password};
use crate::error::LoyaltyError;
use crate::models::{User, generate_referral_code};
use crate::repository::{NewUser, UserRepositoryTrait};
use crate::service::dto::ProfileView;

/// 注册新会员
///
/// POST /api/v1/auth/register
///
/// 携带邀请码时先校验邀请码有效性，注册成功后登记邀请关系；
/// 邀请奖励在新会员首次获得积分时发放。
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    req.validate()?;

    // 邀请码先行校验，避免建完用户才发现邀请码无效
    let referrer_id = match req.referral_code.as_deref() {
        Some(code) => {
            let referrer = state
                .user_repo()
                .get_by_referral_code(code)
                .await?
                .ok_or_else(|| LoyaltyError::ReferralCodeInvalid(code.to_string()))?;
            Some(referrer.id)
        }
        None => None,
    };

    if state.user_repo().get_by_email(&req.email).await?.is_some() {
        return Err(LoyaltyError::EmailTaken(req.email).into());
    }

    let password_hash = hash_password(&req.password)?;
    let referral_code = unique_referral_code(&state).await?;

    let user = state
        .user_repo()
        .create_user(&NewUser {
            email: req.email,
            name: req.name,
            password_hash,
            referral_code,
            referred_by: referrer_id,
        })
        .await?;

    if let Some(code) = req.referral_code.as_deref() {
        state.referral.register_referral(code, user.id).await?;
    }

    info!(user_id = user.id, email = %user.email, "新会员注册成功");

    let (token, expires_at) = state.jwt_manager.generate_token(user.id, &user.email)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(
            AuthResponse {
                token,
                expires_at,
                user,
            },
            "注册成功",
        )),
    ))
}

/// 会员登录
///
/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthResponse>>> {
    req.validate()?;

    let user: User = state
        .user_repo()
        .get_by_email(&req.email)
        .await?
        .ok_or(LoyaltyError::InvalidCredentials)?;

    if !verify_password(&req.password, &user.password_hash)? {
        return Err(LoyaltyError::InvalidCredentials.into());
    }

    let (token, expires_at) = state.jwt_manager.generate_token(user.id, &user.email)?;

    info!(user_id = user.id, "会员登录成功");

    Ok(Json(ApiResponse::success(AuthResponse {
        token,
        expires_at,
        user,
    })))
}

/// 获取当前登录会员的档案
///
/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<ProfileView>>> {
    let profile = state.query.profile(claims.user_id()?).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// 生成未被占用的邀请码
///
/// 8 位随机码空间足够大，碰撞时重试几次即可
async fn unique_referral_code(state: &AppState) -> Result<String> {
    for _ in 0..5 {
        let candidate = generate_referral_code();
        if state
            .user_repo()
            .get_by_referral_code(&candidate)
            .await?
            .is_none()
        {
            return Ok(candidate);
        }
    }

    Err(LoyaltyError::Internal("邀请码生成冲突次数过多".to_string()).into())
}
