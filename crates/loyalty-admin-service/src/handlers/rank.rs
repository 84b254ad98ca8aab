//! 等级管理 API 处理器
//!
//! 实现会员等级的 CRUD 操作。等级门槛全局唯一，
//! 删除前检查是否仍有会员处于该等级。

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;
use validator::Validate;

use loyalty_member::Rank;

use crate::dto::{ApiResponse, CreateRankRequest, UpdateRankRequest};
use crate::error::{AdminError, Result};
use crate::state::AppState;

const RANK_COLUMNS: &str =
    "id, name, points_required, sort_order, icon_url, perks, created_at, updated_at";

/// 创建等级
///
/// POST /api/admin/ranks
pub async fn create_rank(
    State(state): State<AppState>,
    Json(req): Json<CreateRankRequest>,
) -> Result<Json<ApiResponse<Rank>>> {
    req.validate()?;

    // 门槛全局唯一，重复直接拒绝
    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM ranks WHERE points_required = $1)")
            .bind(req.points_required)
            .fetch_one(&state.pool)
            .await?;

    if exists.0 {
        return Err(AdminError::DuplicateRankThreshold(req.points_required));
    }

    let rank = sqlx::query_as::<_, Rank>(&format!(
        r#"
        INSERT INTO ranks (name, points_required, sort_order, icon_url, perks)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {RANK_COLUMNS}
        "#
    ))
    .bind(&req.name)
    .bind(req.points_required)
    .bind(req.sort_order)
    .bind(&req.icon_url)
    .bind(req.perks.unwrap_or_else(|| serde_json::json!([])))
    .fetch_one(&state.pool)
    .await?;

    info!(rank_id = rank.id, name = %rank.name, "等级已创建");

    Ok(Json(ApiResponse::success(rank)))
}

/// 获取等级列表
///
/// GET /api/admin/ranks
pub async fn list_ranks(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Rank>>>> {
    let ranks = sqlx::query_as::<_, Rank>(&format!(
        "SELECT {RANK_COLUMNS} FROM ranks ORDER BY points_required ASC"
    ))
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(ranks)))
}

/// 获取等级详情
///
/// GET /api/admin/ranks/{id}
pub async fn get_rank(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Rank>>> {
    let rank = sqlx::query_as::<_, Rank>(&format!("SELECT {RANK_COLUMNS} FROM ranks WHERE id = $1"))
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AdminError::RankNotFound(id))?;

    Ok(Json(ApiResponse::success(rank)))
}

/// 更新等级
///
/// PUT /api/admin/ranks/{id}
pub async fn update_rank(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRankRequest>,
) -> Result<Json<ApiResponse<Rank>>> {
    req.validate()?;

    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM ranks WHERE id = $1)")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    if !exists.0 {
        return Err(AdminError::RankNotFound(id));
    }

    if let Some(points_required) = req.points_required {
        let taken: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM ranks WHERE points_required = $1 AND id != $2)",
        )
        .bind(points_required)
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

        if taken.0 {
            return Err(AdminError::DuplicateRankThreshold(points_required));
        }
    }

    let rank = sqlx::query_as::<_, Rank>(&format!(
        r#"
        UPDATE ranks
        SET
            name = COALESCE($2, name),
            points_required = COALESCE($3, points_required),
            sort_order = COALESCE($4, sort_order),
            icon_url = COALESCE($5, icon_url),
            perks = COALESCE($6, perks),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {RANK_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&req.name)
    .bind(req.points_required)
    .bind(req.sort_order)
    .bind(&req.icon_url)
    .bind(req.perks)
    .fetch_one(&state.pool)
    .await?;

    info!(rank_id = id, "等级已更新");

    Ok(Json(ApiResponse::success(rank)))
}

/// 删除等级
///
/// DELETE /api/admin/ranks/{id}
///
/// 仍有会员处于该等级时拒绝删除
pub async fn delete_rank(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    let member_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE rank_id = $1")
        .bind(id)
        .fetch_one(&state.pool)
        .await?;

    if member_count.0 > 0 {
        return Err(AdminError::RankInUse(id));
    }

    let result = sqlx::query("DELETE FROM ranks WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AdminError::RankNotFound(id));
    }

    info!(rank_id = id, "等级已删除");

    Ok(Json(ApiResponse::success_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rank_request_validation() {
        let valid = CreateRankRequest {
            name: "白银".to_string(),
            points_required: 1000,
            sort_order: 2,
            icon_url: None,
            perks: None,
        };
        assert!(valid.validate().is_ok());

        let negative_threshold = CreateRankRequest {
            points_required: -1,
            ..valid
        };
        assert!(negative_threshold.validate().is_err());
    }
}
