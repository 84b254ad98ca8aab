//! 邀请进展查询处理器

use axum::{Extension, Json, extract::State};

use crate::api::dto::ApiResponse;
use crate::api::error::Result;
use crate::api::state::AppState;
use crate::auth::Claims;
use crate::service::dto::ReferralSummary;

/// 邀请进展摘要（本人邀请码、邀请人数与累计奖励）
///
/// GET /api/v1/referrals
pub async fn referral_summary(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<ReferralSummary>>> {
    let user = state.load_user(claims.user_id()?).await?;
    let summary = state.referral.summary(&user).await?;

    Ok(Json(ApiResponse::success(summary)))
}
