//! 订单管理 API 处理器
//!
//! 订单检索与取消。取消走会员侧兑换服务，
//! 积分退回、库存回补与账本写入在同一事务内完成。

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use tracing::info;
use validator::Validate;

use loyalty_member::{Order, OrderStatus};

use crate::auth::Claims;
use crate::dto::{ApiResponse, CancelOrderBody, OrderListParams, PageResponse};
use crate::error::{AdminError, Result};
use crate::state::AppState;

const ORDER_COLUMNS: &str = "id, order_no, user_id, product_id, points_spent, status, \
     idempotency_key, cancel_reason, created_at, updated_at";

/// 订单检索
///
/// GET /api/admin/orders
///
/// 支持按会员和状态过滤
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<OrderListParams>,
) -> Result<Json<ApiResponse<PageResponse<Order>>>> {
    let page = params.page.max(1);
    let page_size = params.page_size.clamp(1, 100);
    let offset = (page - 1) * page_size;

    let status = match params.status.as_deref() {
        Some("pending") => Some(OrderStatus::Pending),
        Some("completed") => Some(OrderStatus::Completed),
        Some("cancelled") => Some(OrderStatus::Cancelled),
        Some(other) => {
            return Err(AdminError::Validation(format!("未知的订单状态: {}", other)));
        }
        None => None,
    };

    let total: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM orders
        WHERE ($1::bigint IS NULL OR user_id = $1)
          AND ($2::varchar IS NULL OR status = $2)
        "#,
    )
    .bind(params.user_id)
    .bind(status)
    .fetch_one(&state.pool)
    .await?;

    let orders = sqlx::query_as::<_, Order>(&format!(
        r#"
        SELECT {ORDER_COLUMNS} FROM orders
        WHERE ($1::bigint IS NULL OR user_id = $1)
          AND ($2::varchar IS NULL OR status = $2)
        ORDER BY id DESC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(params.user_id)
    .bind(status)
    .bind(page_size)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        orders, total.0, page, page_size,
    ))))
}

/// 订单详情
///
/// GET /api/admin/orders/{order_no}
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_no): Path<String>,
) -> Result<Json<ApiResponse<Order>>> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE order_no = $1"
    ))
    .bind(&order_no)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AdminError::OrderNotFound(order_no.clone()))?;

    Ok(Json(ApiResponse::success(order)))
}

/// 取消订单
///
/// POST /api/admin/orders/{order_no}/cancel
///
/// 仅已完成订单可取消，积分原数退回
pub async fn cancel_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(order_no): Path<String>,
    Json(body): Json<CancelOrderBody>,
) -> Result<Json<ApiResponse<Order>>> {
    body.validate()?;

    let order = state
        .redemption
        .cancel_order(&order_no, &body.reason, &claims.username)
        .await?;

    info!(
        order_no = %order_no,
        operator = %claims.username,
        "订单已取消，积分已退回"
    );

    Ok(Json(ApiResponse::success_with_message(order, "订单已取消")))
}
