//! 商品兑换与订单查询处理器

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use validator::Validate;

use crate::api::dto::{ApiResponse, PageResponse, PaginationParams, RedeemBody};
use crate::api::error::Result;
use crate::api::state::AppState;
use crate::auth::Claims;
use crate::models::Order;
use crate::service::dto::{RedeemRequest, RedeemResponse};

/// 积分兑换商品
///
/// POST /api/v1/redeem
///
/// 余额不足返回 402，库存不足/重复提交由幂等键兜底
pub async fn redeem(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<RedeemBody>,
) -> Result<Json<ApiResponse<RedeemResponse>>> {
    body.validate()?;

    let response = state
        .redemption
        .redeem(RedeemRequest {
            user_id: claims.user_id()?,
            product_id: body.product_id,
            idempotency_key: body.idempotency_key,
        })
        .await?;

    Ok(Json(ApiResponse::success(response)))
}

/// 兑换订单分页
///
/// GET /api/v1/orders
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<Order>>>> {
    let page = state
        .query
        .orders_page(claims.user_id()?, params.page, params.page_size)
        .await?;

    Ok(Json(ApiResponse::success(page.into())))
}

/// 订单详情（仅本人可见）
///
/// GET /api/v1/orders/{order_no}
pub async fn get_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(order_no): Path<String>,
) -> Result<Json<ApiResponse<Order>>> {
    let order = state
        .query
        .order_detail(claims.user_id()?, &order_no)
        .await?;

    Ok(Json(ApiResponse::success(order)))
}
