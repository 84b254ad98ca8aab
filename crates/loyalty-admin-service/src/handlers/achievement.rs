//! 成就管理 API 处理器
//!
//! 实现成就定义的 CRUD 与上下线操作。
//! 创建和更新时校验 criteria JSON 可被解析，避免线上评估失败。

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;
use validator::Validate;

use loyalty_member::{Achievement, AchievementCriteria, AchievementStatus};

use crate::dto::{ApiResponse, CreateAchievementRequest, UpdateAchievementRequest};
use crate::error::{AdminError, Result};
use crate::state::AppState;

const ACHIEVEMENT_COLUMNS: &str =
    "id, code, name, description, icon_url, points_reward, criteria, status, created_at, updated_at";

/// 校验解锁条件 JSON 结构
fn validate_criteria(criteria: &serde_json::Value) -> Result<()> {
    serde_json::from_value::<AchievementCriteria>(criteria.clone())
        .map_err(|e| AdminError::Validation(format!("解锁条件格式错误: {}", e)))?;
    Ok(())
}

/// 创建成就
///
/// POST /api/admin/achievements
///
/// 新成就初始为草稿状态，上线后才参与评估
pub async fn create_achievement(
    State(state): State<AppState>,
    Json(req): Json<CreateAchievementRequest>,
) -> Result<Json<ApiResponse<Achievement>>> {
    req.validate()?;
    validate_criteria(&req.criteria)?;

    let exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM achievements WHERE code = $1)")
            .bind(&req.code)
            .fetch_one(&state.pool)
            .await?;

    if exists.0 {
        return Err(AdminError::DuplicateAchievementCode(req.code));
    }

    let achievement = sqlx::query_as::<_, Achievement>(&format!(
        r#"
        INSERT INTO achievements (code, name, description, icon_url, points_reward, criteria, status)
        VALUES ($1, $2, $3, $4, $5, $6, 'draft')
        RETURNING {ACHIEVEMENT_COLUMNS}
        "#
    ))
    .bind(&req.code)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.icon_url)
    .bind(req.points_reward)
    .bind(&req.criteria)
    .fetch_one(&state.pool)
    .await?;

    info!(achievement_id = achievement.id, code = %achievement.code, "成就已创建");

    Ok(Json(ApiResponse::success(achievement)))
}

/// 获取成就列表（含草稿与已下线）
///
/// GET /api/admin/achievements
pub async fn list_achievements(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Achievement>>>> {
    let achievements = sqlx::query_as::<_, Achievement>(&format!(
        "SELECT {ACHIEVEMENT_COLUMNS} FROM achievements ORDER BY id ASC"
    ))
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(achievements)))
}

/// 获取成就详情
///
/// GET /api/admin/achievements/{id}
pub async fn get_achievement(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Achievement>>> {
    let achievement = sqlx::query_as::<_, Achievement>(&format!(
        "SELECT {ACHIEVEMENT_COLUMNS} FROM achievements WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AdminError::AchievementNotFound(id))?;

    Ok(Json(ApiResponse::success(achievement)))
}

/// 更新成就
///
/// PUT /api/admin/achievements/{id}
///
/// 成就编码创建后不可修改（已解锁记录按编码追溯）
pub async fn update_achievement(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateAchievementRequest>,
) -> Result<Json<ApiResponse<Achievement>>> {
    req.validate()?;

    if let Some(criteria) = &req.criteria {
        validate_criteria(criteria)?;
    }

    let achievement = sqlx::query_as::<_, Achievement>(&format!(
        r#"
        UPDATE achievements
        SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            icon_url = COALESCE($4, icon_url),
            points_reward = COALESCE($5, points_reward),
            criteria = COALESCE($6, criteria),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {ACHIEVEMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.icon_url)
    .bind(req.points_reward)
    .bind(&req.criteria)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AdminError::AchievementNotFound(id))?;

    info!(achievement_id = id, "成就已更新");

    Ok(Json(ApiResponse::success(achievement)))
}

/// 上线成就
///
/// POST /api/admin/achievements/{id}/publish
pub async fn publish_achievement(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Achievement>>> {
    set_achievement_status(&state, id, AchievementStatus::Active, "成就已上线").await
}

/// 下线成就
///
/// POST /api/admin/achievements/{id}/offline
///
/// 下线后停止评估，已解锁记录保留
pub async fn offline_achievement(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Achievement>>> {
    set_achievement_status(&state, id, AchievementStatus::Inactive, "成就已下线").await
}

async fn set_achievement_status(
    state: &AppState,
    id: i64,
    status: AchievementStatus,
    log_message: &str,
) -> Result<Json<ApiResponse<Achievement>>> {
    let achievement = sqlx::query_as::<_, Achievement>(&format!(
        r#"
        UPDATE achievements
        SET status = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {ACHIEVEMENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AdminError::AchievementNotFound(id))?;

    info!(achievement_id = id, "{}", log_message);

    Ok(Json(ApiResponse::success(achievement)))
}
