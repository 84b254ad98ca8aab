//! 兑换订单与积分账本实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ChangeType, OrderStatus, SourceType};

/// 兑换订单
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    /// 订单号，全局唯一，对外展示用
    pub order_no: String,
    pub user_id: i64,
    pub product_id: i64,
    /// 下单时扣除的积分，取消时按此数退回
    pub points_spent: i64,
    pub status: OrderStatus,
    /// 幂等键，客户端生成，重复提交返回原订单
    #[sqlx(default)]
    pub idempotency_key: Option<String>,
    /// 取消原因（仅已取消订单有值）
    #[sqlx(default)]
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_cancellable(&self) -> bool {
        self.status == OrderStatus::Completed
    }
}

/// 生成订单号
pub fn generate_order_no() -> String {
    format!("LO{}", Uuid::new_v4().simple())
}

/// 积分账本行
///
/// 每次余额变动在同一事务内写入一行；`amount` 恒为正数，
/// 实际增减方向由 `change_type.sign()` 决定
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PointsLedger {
    pub id: i64,
    pub user_id: i64,
    pub change_type: ChangeType,
    /// 变动积分数，恒为正数
    pub amount: i64,
    /// 变动后的余额快照
    pub balance_after: i64,
    /// 触发来源
    pub source_type: SourceType,
    /// 来源关联标识（兑换码领取键、订单号、成就键等），唯一，用于幂等
    #[sqlx(default)]
    pub ref_id: Option<String>,
    /// 备注（运营调整原因等）
    #[sqlx(default)]
    pub remark: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PointsLedger {
    /// 该行对余额的有符号变动量
    pub fn signed_amount(&self) -> i64 {
        self.amount * self.change_type.sign()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_no_shape() {
        let no = generate_order_no();
        assert!(no.starts_with("LO"));
        assert_eq!(no.len(), 2 + 32);

        let another = generate_order_no();
        assert_ne!(no, another);
    }

    #[test]
    fn test_order_is_cancellable() {
        let mut order = Order {
            id: 1,
            order_no: generate_order_no(),
            user_id: 1,
            product_id: 1,
            points_spent: 500,
            status: OrderStatus::Completed,
            idempotency_key: None,
            cancel_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(order.is_cancellable());

        order.status = OrderStatus::Cancelled;
        assert!(!order.is_cancellable());
    }

    #[test]
    fn test_ledger_signed_amount() {
        let mut row = PointsLedger {
            id: 1,
            user_id: 1,
            change_type: ChangeType::Earn,
            amount: 100,
            balance_after: 100,
            source_type: SourceType::CodeClaim,
            ref_id: None,
            remark: None,
            created_at: Utc::now(),
        };
        assert_eq!(row.signed_amount(), 100);

        row.change_type = ChangeType::RedeemOut;
        assert_eq!(row.signed_amount(), -100);
    }
}
