//! 兑换码领取处理器

use axum::{Extension, Json, extract::State};
use validator::Validate;

use crate::api::dto::{ApiResponse, ClaimRequest};
use crate::api::error::Result;
use crate::api::state::AppState;
use crate::auth::Claims;
use crate::service::dto::ClaimResponse;

/// 领取兑换码积分
///
/// POST /api/v1/claim
pub async fn claim_code(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<ApiResponse<ClaimResponse>>> {
    req.validate()?;

    let response = state.claim.claim(claims.user_id()?, &req.code).await?;

    Ok(Json(ApiResponse::success_with_message(
        response,
        "领取成功",
    )))
}
