//! 商品管理 API 处理器
//!
//! 实现兑换商品的 CRUD 与上下架操作

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::info;
use validator::Validate;

use loyalty_member::{Product, ProductStatus};

use crate::dto::{
    ApiResponse, CreateProductRequest, PageResponse, PaginationParams, UpdateProductRequest,
};
use crate::error::{AdminError, Result};
use crate::state::AppState;

const PRODUCT_COLUMNS: &str = "id, name, description, image_url, cost_points, required_rank_id, \
     stock, redeemed_count, status, metadata, created_at, updated_at";

/// 校验兑换门槛等级存在
async fn ensure_rank_exists(state: &AppState, rank_id: i64) -> Result<()> {
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM ranks WHERE id = $1)")
        .bind(rank_id)
        .fetch_one(&state.pool)
        .await?;

    if !exists.0 {
        return Err(AdminError::RankNotFound(rank_id));
    }
    Ok(())
}

/// 创建商品
///
/// POST /api/admin/products
///
/// 新商品初始为草稿状态，发布后才对会员可见
pub async fn create_product(
    State(state): State<AppState>,
    Json(req): Json<CreateProductRequest>,
) -> Result<Json<ApiResponse<Product>>> {
    req.validate()?;

    if let Some(rank_id) = req.required_rank_id {
        ensure_rank_exists(&state, rank_id).await?;
    }

    let product = sqlx::query_as::<_, Product>(&format!(
        r#"
        INSERT INTO products (name, description, image_url, cost_points, required_rank_id, stock, status, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, 'draft', $7)
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.image_url)
    .bind(req.cost_points)
    .bind(req.required_rank_id)
    .bind(req.stock)
    .bind(req.metadata.unwrap_or_else(|| serde_json::json!({})))
    .fetch_one(&state.pool)
    .await?;

    info!(product_id = product.id, name = %product.name, "商品已创建");

    Ok(Json(ApiResponse::success(product)))
}

/// 获取商品列表（含草稿与已下架）
///
/// GET /api/admin/products
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<Product>>>> {
    let page = params.page.max(1);
    let page_size = params.page_size.clamp(1, 100);
    let offset = (page - 1) * page_size;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
        .fetch_one(&state.pool)
        .await?;

    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id DESC LIMIT $1 OFFSET $2"
    ))
    .bind(page_size)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(ApiResponse::success(PageResponse::new(
        products, total.0, page, page_size,
    ))))
}

/// 获取商品详情
///
/// GET /api/admin/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Product>>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AdminError::ProductNotFound(id))?;

    Ok(Json(ApiResponse::success(product)))
}

/// 更新商品
///
/// PUT /api/admin/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<Product>>> {
    req.validate()?;

    if let Some(rank_id) = req.required_rank_id {
        ensure_rank_exists(&state, rank_id).await?;
    }

    let product = sqlx::query_as::<_, Product>(&format!(
        r#"
        UPDATE products
        SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            image_url = COALESCE($4, image_url),
            cost_points = COALESCE($5, cost_points),
            required_rank_id = COALESCE($6, required_rank_id),
            stock = COALESCE($7, stock),
            metadata = COALESCE($8, metadata),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.image_url)
    .bind(req.cost_points)
    .bind(req.required_rank_id)
    .bind(req.stock)
    .bind(req.metadata)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AdminError::ProductNotFound(id))?;

    info!(product_id = id, "商品已更新");

    Ok(Json(ApiResponse::success(product)))
}

/// 发布商品
///
/// POST /api/admin/products/{id}/publish
pub async fn publish_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Product>>> {
    set_product_status(&state, id, ProductStatus::Active, "商品已上架").await
}

/// 下架商品
///
/// POST /api/admin/products/{id}/offline
///
/// 下架后停止兑换，历史订单不受影响
pub async fn offline_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Product>>> {
    set_product_status(&state, id, ProductStatus::Inactive, "商品已下架").await
}

async fn set_product_status(
    state: &AppState,
    id: i64,
    status: ProductStatus,
    log_message: &str,
) -> Result<Json<ApiResponse<Product>>> {
    let product = sqlx::query_as::<_, Product>(&format!(
        r#"
        UPDATE products
        SET status = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {PRODUCT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(status)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AdminError::ProductNotFound(id))?;

    info!(product_id = id, "{}", log_message);

    Ok(Json(ApiResponse::success(product)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_product_request_partial() {
        let json = r#"{"costPoints": 800}"#;
        let req: UpdateProductRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.cost_points, Some(800));
        assert!(req.name.is_none());
        assert!(req.validate().is_ok());
    }
}
