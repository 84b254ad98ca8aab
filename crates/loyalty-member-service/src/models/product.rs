//! 兑换商品实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::ProductStatus;

/// 兑换商品
///
/// `stock` 为空表示不限量；`required_rank_id` 为空表示所有等级可兑
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    /// 商品名称
    pub name: String,
    /// 商品描述
    #[sqlx(default)]
    pub description: Option<String>,
    /// 商品主图 URL
    #[sqlx(default)]
    pub image_url: Option<String>,
    /// 兑换所需积分，恒 > 0
    pub cost_points: i64,
    /// 兑换门槛等级 ID（按该等级的积分门槛比较，而非 ID 比较）
    #[sqlx(default)]
    pub required_rank_id: Option<i64>,
    /// 库存上限（null 表示不限量）
    #[sqlx(default)]
    pub stock: Option<i32>,
    /// 已兑换数量
    #[serde(default)]
    pub redeemed_count: i64,
    /// 商品状态
    pub status: ProductStatus,
    /// 扩展信息（JSON），如配送说明、核销方式
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// 检查是否还有库存
    pub fn has_stock(&self) -> bool {
        match self.stock {
            Some(max) => self.redeemed_count < max as i64,
            None => true,
        }
    }

    /// 检查商品是否可兑换（已上架且有库存）
    pub fn is_redeemable(&self) -> bool {
        self.status == ProductStatus::Active && self.has_stock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_product() -> Product {
        Product {
            id: 1,
            name: "Coffee Voucher".to_string(),
            description: None,
            image_url: None,
            cost_points: 500,
            required_rank_id: None,
            stock: None,
            redeemed_count: 0,
            status: ProductStatus::Active,
            metadata: json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_product_has_stock() {
        let mut product = create_test_product();

        // 不限量
        product.stock = None;
        assert!(product.has_stock());

        // 有库存
        product.stock = Some(100);
        product.redeemed_count = 50;
        assert!(product.has_stock());

        // 售罄
        product.redeemed_count = 100;
        assert!(!product.has_stock());
    }

    #[test]
    fn test_product_is_redeemable() {
        let mut product = create_test_product();
        assert!(product.is_redeemable());

        product.status = ProductStatus::Inactive;
        assert!(!product.is_redeemable());

        product.status = ProductStatus::Active;
        product.stock = Some(1);
        product.redeemed_count = 1;
        assert!(!product.is_redeemable());
    }
}
