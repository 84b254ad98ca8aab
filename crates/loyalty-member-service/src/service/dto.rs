//! 服务层数据传输对象
//!
//! 服务层的入参与出参定义，HTTP 层在此之上再包一层 API 信封

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Achievement, Order, Product, Rank, SourceType, User};

/// 积分发放请求
#[derive(Debug, Clone)]
pub struct GrantPointsRequest {
    pub user_id: i64,
    /// 发放积分数，必须 > 0
    pub amount: i64,
    /// 触发来源，决定账本变动类型和后置钩子
    pub source_type: SourceType,
    /// 幂等键，落账本 ref_id；重复请求返回原结果
    pub ref_id: Option<String>,
    pub remark: Option<String>,
}

/// 等级变化
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RankChange {
    pub from_rank_id: Option<i64>,
    pub to_rank_id: Option<i64>,
    pub to_rank_name: Option<String>,
}

/// 积分发放结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantPointsResponse {
    pub ledger_id: i64,
    pub points_balance: i64,
    pub lifetime_points: i64,
    /// 本次发放引起的等级变化
    pub rank_change: Option<RankChange>,
    /// 是否为幂等命中（返回的是此前的结果）
    pub duplicate: bool,
}

impl GrantPointsResponse {
    pub fn success(
        ledger_id: i64,
        points_balance: i64,
        lifetime_points: i64,
        rank_change: Option<RankChange>,
    ) -> Self {
        Self {
            ledger_id,
            points_balance,
            lifetime_points,
            rank_change,
            duplicate: false,
        }
    }

    pub fn from_existing(ledger_id: i64, points_balance: i64, lifetime_points: i64) -> Self {
        Self {
            ledger_id,
            points_balance,
            lifetime_points,
            rank_change: None,
            duplicate: true,
        }
    }
}

/// 运营积分调整请求
#[derive(Debug, Clone)]
pub struct AdjustPointsRequest {
    pub user_id: i64,
    /// 有符号调整量，正数加分、负数减分，不允许为 0
    pub delta: i64,
    /// 操作人（管理员用户名）
    pub operator: String,
    /// 调整原因，落账本备注
    pub reason: String,
}

/// 兑换请求
#[derive(Debug, Clone)]
pub struct RedeemRequest {
    pub user_id: i64,
    pub product_id: i64,
    pub idempotency_key: Option<String>,
}

/// 兑换结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemResponse {
    pub order: Order,
    pub points_balance: i64,
    /// 是否为幂等命中（返回的是原订单）
    pub duplicate: bool,
}

/// 兑换码领取结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    pub points_granted: i64,
    pub points_balance: i64,
    pub lifetime_points: i64,
    /// 本用户对该码的第几次领取
    pub claim_seq: i32,
}

/// 用户档案视图（含等级与晋级进度）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub user: User,
    pub rank: Option<Rank>,
    pub next_rank: Option<Rank>,
    /// 距下一等级还差的累计积分（已是最高等级时为空）
    pub points_to_next_rank: Option<i64>,
}

/// 商品目录视图
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    /// 上架且有库存
    pub available: bool,
    /// 当前用户因等级不足被锁定（未登录时为 false）
    pub rank_locked: bool,
}

/// 成就视图（定义 + 当前用户解锁状态）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementView {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// 邀请进展摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralSummary {
    /// 本人的邀请码
    pub referral_code: String,
    pub total_invited: i64,
    pub completed: i64,
    pub pending: i64,
    /// 通过邀请累计获得的积分
    pub points_earned: i64,
}

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        Self {
            items,
            total,
            page,
            page_size,
        }
    }
}
