//! 兑换目录查询处理器
//!
//! 目录对未登录用户开放；登录用户额外标注等级锁定状态

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};

use crate::api::dto::{ApiResponse, PageResponse, PaginationParams};
use crate::api::error::Result;
use crate::api::state::AppState;
use crate::auth::Claims;
use crate::models::User;
use crate::service::dto::ProductView;

/// 兑换目录分页
///
/// GET /api/v1/catalog
pub async fn list_catalog(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<ProductView>>>> {
    let viewer = resolve_viewer(&state, claims).await?;
    let page = state
        .query
        .catalog(viewer.as_ref(), params.page, params.page_size)
        .await?;

    Ok(Json(ApiResponse::success(page.into())))
}

/// 商品详情
///
/// GET /api/v1/catalog/{id}
pub async fn get_product(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Path(product_id): Path<i64>,
) -> Result<Json<ApiResponse<ProductView>>> {
    let viewer = resolve_viewer(&state, claims).await?;
    let view = state
        .query
        .product_detail(product_id, viewer.as_ref())
        .await?;

    Ok(Json(ApiResponse::success(view)))
}

/// 解析可选的登录用户
async fn resolve_viewer(
    state: &AppState,
    claims: Option<Extension<Claims>>,
) -> Result<Option<User>> {
    match claims {
        Some(Extension(claims)) => Ok(Some(state.load_user(claims.user_id()?).await?)),
        None => Ok(None),
    }
}
