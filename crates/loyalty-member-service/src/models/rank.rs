//! 等级实体定义
//!
//! 等级按累计积分门槛划分，评定规则：取 `points_required <= lifetime_points`
//! 中门槛最高的一档

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 会员等级
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Rank {
    pub id: i64,
    /// 等级名称，如"青铜"、"白银"
    pub name: String,
    /// 晋级所需累计积分门槛，全局唯一
    pub points_required: i64,
    /// 排序权重，数值越小越靠前
    pub sort_order: i32,
    /// 等级图标 URL
    #[sqlx(default)]
    pub icon_url: Option<String>,
    /// 等级权益描述（JSON 数组，仅展示用）
    pub perks: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rank {
    /// 判断指定累计积分是否达到本等级门槛
    pub fn qualifies(&self, lifetime_points: i64) -> bool {
        lifetime_points >= self.points_required
    }
}

/// 从等级列表中挑选累计积分对应的等级
///
/// 线性扫描取门槛最高的达标等级；低于所有门槛时返回 None。
/// 列表无需预排序
pub fn pick_rank(ranks: &[Rank], lifetime_points: i64) -> Option<&Rank> {
    ranks
        .iter()
        .filter(|r| r.qualifies(lifetime_points))
        .max_by_key(|r| r.points_required)
}

/// 找出下一个待晋级的等级（门槛大于当前累计积分中最低的一档）
pub fn next_rank(ranks: &[Rank], lifetime_points: i64) -> Option<&Rank> {
    ranks
        .iter()
        .filter(|r| r.points_required > lifetime_points)
        .min_by_key(|r| r.points_required)
}
