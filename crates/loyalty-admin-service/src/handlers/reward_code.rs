//! 兑换码管理 API 处理器
//!
//! 实现兑换码的创建、查询、更新与停用。
//! 兑换码只停用不删除，已领取记录需要保留追溯。

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::info;
use validator::Validate;

use loyalty_member::RewardCode;

use crate::dto::{
    ApiResponse, CreateRewardCodeRequest, PageResponse, PaginationParams, UpdateRewardCodeRequest,
};
use crate::error::{AdminError, Result};
use crate::state::AppState;

const CODE_COLUMNS: &str = "id, code, points_value, max_claims, claim_count, per_user_limit, \
     starts_at, expires_at, status, created_at, updated_at";

/// 创建兑换码
///
/// POST /api/admin/reward-codes
pub async fn create_reward_code(
    State(state): State<AppState>,
    Json(req): Json<CreateRewardCodeRequest>,
) -> Result<Json<ApiResponse<RewardCode>>> {
    req.validate()?;

    if let (Some(starts_at), Some(expires_at)) = (req.starts_at, req.expires_at) {
        if expires_at <= starts_at {
            return Err(AdminError::Validation(
                "失效时间必须晚于生效时间".to_string(),
            ));
        }
    }

    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM reward_codes WHERE code = $1)")
            .bind(&req.code)
            .fetch_one(&state.pool)
            .await?;

    if exists.0 {
        return Err(AdminError::DuplicateCode(req.code));
    }

    let code = sqlx::query_as::<_, RewardCode>(&format!(
        r#"
        INSERT INTO reward_codes (code, points_value, max_claims, per_user_limit, starts_at, expires_at, status)
        VALUES ($1, $2, $3, $4, $5, $6, 'active')
        RETURNING {CODE_COLUMNS}
        "#
    ))
    .bind(&req.code)
    .bind(req.points_value)
    .bind(req.max_claims)
    .bind(req.per_user_limit)
    .bind(req.starts_at)
    .bind(req.expires_at)
    .fetch_one(&state.pool)
    .await?;

    info!(code_id = code.id, code = %code.code, "兑换码已创建");

    Ok(Json(ApiResponse::success(code)))
}

/// 获取兑换码列表
///
/// GET /api/admin/reward-codes
pub async fn list_reward_codes(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<RewardCode>>>> {
    let page = params.page.max(1);
    let page_size = params.page_size.clamp(1, 100);
    let offset = (page - 1) * page_size;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reward_codes")
        .fetch_one(&state.pool)
        .await?;

    let codes = sqlx::query_as::<_, RewardCode>(&format!(
        "SELECT {CODE_COLUMNS} FROM reward_codes ORDER BY id DESC LIMIT $1 OFFSET $2"
    ))
    .bind(page_size)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        codes, total.0, page, page_size,
    ))))
}

/// 获取兑换码详情
///
/// GET /api/admin/reward-codes/{id}
pub async fn get_reward_code(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<RewardCode>>> {
    let code = sqlx::query_as::<_, RewardCode>(&format!(
        "SELECT {CODE_COLUMNS} FROM reward_codes WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AdminError::CodeNotFound(id))?;

    Ok(Json(ApiResponse::success(code)))
}

/// 更新兑换码
///
/// PUT /api/admin/reward-codes/{id}
///
/// 码值创建后不可修改，只能调整面额、限量与窗口期
pub async fn update_reward_code(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRewardCodeRequest>,
) -> Result<Json<ApiResponse<RewardCode>>> {
    req.validate()?;

    let code = sqlx::query_as::<_, RewardCode>(&format!(
        r#"
        UPDATE reward_codes
        SET
            points_value = COALESCE($2, points_value),
            max_claims = COALESCE($3, max_claims),
            per_user_limit = COALESCE($4, per_user_limit),
            starts_at = COALESCE($5, starts_at),
            expires_at = COALESCE($6, expires_at),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {CODE_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(req.points_value)
    .bind(req.max_claims)
    .bind(req.per_user_limit)
    .bind(req.starts_at)
    .bind(req.expires_at)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AdminError::CodeNotFound(id))?;

    info!(code_id = id, "兑换码已更新");

    Ok(Json(ApiResponse::success(code)))
}

/// 停用兑换码
///
/// POST /api/admin/reward-codes/{id}/disable
///
/// 停用立即生效，已领取的积分不受影响
pub async fn disable_reward_code(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<RewardCode>>> {
    let code = sqlx::query_as::<_, RewardCode>(&format!(
        r#"
        UPDATE reward_codes
        SET status = 'disabled', updated_at = NOW()
        WHERE id = $1
        RETURNING {CODE_COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AdminError::CodeNotFound(id))?;

    info!(code_id = id, code = %code.code, "兑换码已停用");

    Ok(Json(ApiResponse::success(code)))
}
