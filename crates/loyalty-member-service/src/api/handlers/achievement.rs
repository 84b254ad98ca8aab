//! 成就查询处理器

use axum::{Extension, Json, extract::State};

use crate::api::dto::ApiResponse;
use crate::api::error::Result;
use crate::api::state::AppState;
use crate::auth::Claims;
use crate::service::dto::AchievementView;

/// 成就列表（定义 + 当前会员解锁状态）
///
/// GET /api/v1/achievements
pub async fn list_achievements(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<Vec<AchievementView>>>> {
    let views = state.query.achievements(claims.user_id()?).await?;
    Ok(Json(ApiResponse::success(views)))
}
