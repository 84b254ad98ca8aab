//! 会员管理 API 处理器
//!
//! 会员检索、详情、账本与订单查询，以及人工积分调整和状态变更。
//! 积分调整复用会员侧积分服务，保证账本、等级、成就联动一致。

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use tracing::info;
use validator::Validate;

use loyalty_member::{Order, PointsLedger, User, UserStatus, dto};

use crate::auth::Claims;
use crate::dto::{
    AdjustPointsBody, ApiResponse, MemberDetailDto, MemberSearchParams, PageResponse,
    PaginationParams, UpdateMemberStatusBody,
};
use crate::error::{AdminError, Result};
use crate::state::AppState;

const USER_COLUMNS: &str = "id, email, name, password_hash, points_balance, lifetime_points, \
     rank_id, referral_code, referred_by, status, created_at, updated_at";

const LEDGER_COLUMNS: &str =
    "id, user_id, change_type, amount, balance_after, source_type, ref_id, remark, created_at";

const ORDER_COLUMNS: &str = "id, order_no, user_id, product_id, points_spent, status, \
     idempotency_key, cancel_reason, created_at, updated_at";

async fn load_member(state: &AppState, id: i64) -> Result<User> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AdminError::MemberNotFound(id))
}

/// 会员检索
///
/// GET /api/admin/members
///
/// 支持按邮箱/昵称关键词和状态过滤
pub async fn search_members(
    State(state): State<AppState>,
    Query(params): Query<MemberSearchParams>,
) -> Result<Json<ApiResponse<PageResponse<User>>>> {
    let page = params.page.max(1);
    let page_size = params.page_size.clamp(1, 100);
    let offset = (page - 1) * page_size;

    let keyword = params
        .keyword
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .map(|k| format!("%{}%", k.trim()));

    let status = match params.status.as_deref() {
        Some("active") => Some(UserStatus::Active),
        Some("suspended") => Some(UserStatus::Suspended),
        Some(other) => {
            return Err(AdminError::Validation(format!("未知的会员状态: {}", other)));
        }
        None => None,
    };

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM users
        WHERE ($1::text IS NULL OR email ILIKE $1 OR name ILIKE $1)
          AND ($2::varchar IS NULL OR status = $2)
        "#,
    )
    .bind(&keyword)
    .bind(status)
    .fetch_one(&state.pool)
    .await?;

    let members = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS} FROM users
        WHERE ($1::text IS NULL OR email ILIKE $1 OR name ILIKE $1)
          AND ($2::varchar IS NULL OR status = $2)
        ORDER BY id DESC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(&keyword)
    .bind(status)
    .bind(page_size)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        members, total.0, page, page_size,
    ))))
}

/// 会员详情
///
/// GET /api/admin/members/{id}
pub async fn get_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<MemberDetailDto>>> {
    let user = load_member(&state, id).await?;

    let rank_name: Option<(String,)> = match user.rank_id {
        Some(rank_id) => {
            sqlx::query_as("SELECT name FROM ranks WHERE id = $1")
                .bind(rank_id)
                .fetch_optional(&state.pool)
                .await?
        }
        None => None,
    };

    let counts: (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM orders WHERE user_id = $1),
            (SELECT COUNT(*) FROM referrals WHERE referrer_id = $1),
            (SELECT COUNT(*) FROM user_achievements WHERE user_id = $1)
        "#,
    )
    .bind(id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(MemberDetailDto {
        user,
        rank_name: rank_name.map(|r| r.0),
        order_count: counts.0,
        referral_count: counts.1,
        achievement_count: counts.2,
    })))
}

/// 会员积分账本
///
/// GET /api/admin/members/{id}/ledger
pub async fn get_member_ledger(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<PointsLedger>>>> {
    load_member(&state, id).await?;

    let page = params.page.max(1);
    let page_size = params.page_size.clamp(1, 100);
    let offset = (page - 1) * page_size;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM points_ledger WHERE user_id = $1")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    let entries = sqlx::query_as::<_, PointsLedger>(&format!(
        "SELECT {LEDGER_COLUMNS} FROM points_ledger WHERE user_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(id)
    .bind(page_size)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        entries, total.0, page, page_size,
    ))))
}

/// 会员订单
///
/// GET /api/admin/members/{id}/orders
pub async fn get_member_orders(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<Order>>>> {
    load_member(&state, id).await?;

    let page = params.page.max(1);
    let page_size = params.page_size.clamp(1, 100);
    let offset = (page - 1) * page_size;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    let orders = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(id)
    .bind(page_size)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        orders, total.0, page, page_size,
    ))))
}

/// 人工调整会员积分
///
/// POST /api/admin/members/{id}/points
///
/// 正数加分、负数减分；减分余额不足时拒绝
pub async fn adjust_member_points(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(body): Json<AdjustPointsBody>,
) -> Result<Json<ApiResponse<dto::GrantPointsResponse>>> {
    body.validate()?;

    let response = state
        .points
        .adjust_points(dto::AdjustPointsRequest {
            user_id: id,
            delta: body.delta,
            operator: claims.username.clone(),
            reason: body.reason,
        })
        .await?;

    info!(
        member_id = id,
        delta = body.delta,
        operator = %claims.username,
        "会员积分已人工调整"
    );

    Ok(Json(ApiResponse::success(response)))
}

/// 变更会员状态
///
/// PUT /api/admin/members/{id}/status
///
/// 冻结后禁止积分变动和兑换，历史数据保留
pub async fn update_member_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateMemberStatusBody>,
) -> Result<Json<ApiResponse<User>>> {
    body.validate()?;

    let status = match body.status.as_str() {
        "ACTIVE" => UserStatus::Active,
        "SUSPENDED" => UserStatus::Suspended,
        other => {
            return Err(AdminError::Validation(format!("未知的会员状态: {}", other)));
        }
    };

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET status = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AdminError::MemberNotFound(id))?;

    info!(
        member_id = id,
        status = ?status,
        operator = %claims.username,
        "会员状态已变更"
    );

    Ok(Json(ApiResponse::success(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjust_points_body_validation() {
        let valid = AdjustPointsBody {
            delta: -50,
            reason: "活动补偿错发回收".to_string(),
        };
        assert!(valid.validate().is_ok());

        let empty_reason = AdjustPointsBody {
            delta: 100,
            reason: "".to_string(),
        };
        assert!(empty_reason.validate().is_err());
    }

    #[test]
    fn test_status_body_known_values() {
        for status in ["ACTIVE", "SUSPENDED"] {
            let body = UpdateMemberStatusBody {
                status: status.to_string(),
            };
            assert!(body.validate().is_ok());
        }
    }
}
