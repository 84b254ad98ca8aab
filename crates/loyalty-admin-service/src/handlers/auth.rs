//! 认证相关的 HTTP 处理器
//!
//! 提供登录、登出、获取当前用户和刷新 Token 的 API

use axum::{Extension, Json, extract::State};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{Claims, verify_password};
use crate::dto::{AdminLoginRequest, AdminLoginResponse, AdminUserDto, ApiResponse, RefreshResponse};
use crate::error::{AdminError, Result};
use crate::state::AppState;

/// 连续失败多少次后锁定账号
const MAX_FAILED_ATTEMPTS: i32 = 5;
/// 锁定时长（分钟）
const LOCK_MINUTES: i64 = 30;

/// 数据库管理员记录
#[derive(Debug, FromRow)]
struct AdminUserRow {
    id: i64,
    username: String,
    password_hash: String,
    display_name: Option<String>,
    role: String,
    status: String,
    failed_login_attempts: i32,
    locked_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl AdminUserRow {
    fn into_dto(self) -> AdminUserDto {
        AdminUserDto {
            id: self.id,
            username: self.username,
            display_name: self.display_name,
            role: self.role,
            status: self.status,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
        }
    }
}

const ADMIN_COLUMNS: &str = "id, username, password_hash, display_name, role, status, \
     failed_login_attempts, locked_until, last_login_at, created_at";

/// 管理员登录
///
/// POST /api/admin/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<Json<ApiResponse<AdminLoginResponse>>> {
    req.validate()?;

    let user: AdminUserRow = sqlx::query_as(&format!(
        "SELECT {ADMIN_COLUMNS} FROM admin_users WHERE username = $1"
    ))
    .bind(&req.username)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AdminError::InvalidCredentials)?;

    if user.status == "disabled" {
        return Err(AdminError::AccountDisabled);
    }

    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            return Err(AdminError::AccountLocked);
        }
    }

    let password_valid = verify_password(&req.password, &user.password_hash)?;
    if !password_valid {
        let new_attempts = user.failed_login_attempts + 1;
        let locked_until = if new_attempts >= MAX_FAILED_ATTEMPTS {
            Some(Utc::now() + chrono::Duration::minutes(LOCK_MINUTES))
        } else {
            None
        };

        sqlx::query(
            r#"
            UPDATE admin_users
            SET failed_login_attempts = $1, locked_until = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(new_attempts)
        .bind(locked_until)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

        if locked_until.is_some() {
            warn!(username = %req.username, "管理员账号连续登录失败，已锁定");
        }

        return Err(AdminError::InvalidCredentials);
    }

    // 登录成功，重置失败计数
    sqlx::query(
        r#"
        UPDATE admin_users
        SET failed_login_attempts = 0, locked_until = NULL, last_login_at = NOW(), updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user.id)
    .execute(&state.pool)
    .await?;

    let (token, expires_at) = state
        .jwt_manager
        .generate_token(user.id, &user.username, &user.role)?;

    info!(admin_id = user.id, username = %user.username, "管理员登录成功");

    let mut dto = user.into_dto();
    dto.last_login_at = Some(Utc::now());

    Ok(Json(ApiResponse::success(AdminLoginResponse {
        token,
        expires_at,
        user: dto,
    })))
}

/// 管理员登出
///
/// POST /api/admin/auth/logout
///
/// JWT 无状态，登出只需前端清除 Token
pub async fn logout() -> Result<Json<ApiResponse<()>>> {
    Ok(Json(ApiResponse::success_empty()))
}

/// 获取当前管理员信息
///
/// GET /api/admin/auth/me
pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<AdminUserDto>>> {
    let admin_id = claims.admin_id()?;

    let user: AdminUserRow = sqlx::query_as(&format!(
        "SELECT {ADMIN_COLUMNS} FROM admin_users WHERE id = $1"
    ))
    .bind(admin_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AdminError::AdminNotFound(admin_id.to_string()))?;

    Ok(Json(ApiResponse::success(user.into_dto())))
}

/// 刷新 Token
///
/// POST /api/admin/auth/refresh
pub async fn refresh_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<RefreshResponse>>> {
    let (token, expires_at) = state.jwt_manager.refresh_token(&claims)?;

    Ok(Json(ApiResponse::success(RefreshResponse {
        token,
        expires_at,
    })))
}
