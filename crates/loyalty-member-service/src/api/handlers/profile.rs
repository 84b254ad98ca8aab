//! 档案、账本与等级查询处理器

use axum::{
    Extension, Json,
    extract::{Query, State},
};

use crate::api::dto::{ApiResponse, PageResponse, PaginationParams};
use crate::api::error::Result;
use crate::api::state::AppState;
use crate::auth::Claims;
use crate::models::{PointsLedger, Rank};
use crate::service::dto::ProfileView;

/// 当前会员档案（含等级与晋级进度）
///
/// GET /api/v1/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<ProfileView>>> {
    let profile = state.query.profile(claims.user_id()?).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// 积分账本分页
///
/// GET /api/v1/profile/ledger
pub async fn get_ledger(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<PointsLedger>>>> {
    let page = state
        .query
        .ledger_page(claims.user_id()?, params.page, params.page_size)
        .await?;

    Ok(Json(ApiResponse::success(page.into())))
}

/// 等级列表（按门槛升序）
///
/// GET /api/v1/ranks
pub async fn list_ranks(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Rank>>>> {
    let ranks = state.query.ranks().await?;
    Ok(Json(ApiResponse::success(ranks)))
}
