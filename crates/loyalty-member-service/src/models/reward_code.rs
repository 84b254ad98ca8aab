//! 兑换码实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::RewardCodeStatus;

/// 积分兑换码
///
/// 用户扫码/输码领取固定积分；`max_claims` 为空表示总量不限
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RewardCode {
    pub id: i64,
    /// 码值，全局唯一
    pub code: String,
    /// 每次领取获得的积分，恒 > 0
    pub points_value: i64,
    /// 全局可领取总次数（null 表示不限量）
    #[sqlx(default)]
    pub max_claims: Option<i32>,
    /// 已领取次数
    #[serde(default)]
    pub claim_count: i32,
    /// 单用户可领取次数上限
    pub per_user_limit: i32,
    /// 生效时间（null 表示立即生效）
    #[sqlx(default)]
    pub starts_at: Option<DateTime<Utc>>,
    /// 失效时间（null 表示长期有效）
    #[sqlx(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub status: RewardCodeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RewardCode {
    /// 检查是否在有效窗口内
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        let started = self.starts_at.is_none_or(|t| now >= t);
        let not_expired = self.expires_at.is_none_or(|t| now < t);
        started && not_expired
    }

    /// 检查全局余量
    pub fn has_supply(&self) -> bool {
        match self.max_claims {
            Some(max) => self.claim_count < max,
            None => true,
        }
    }
}

/// 兑换码领取记录
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RewardCodeClaim {
    pub id: i64,
    pub code_id: i64,
    pub user_id: i64,
    /// 该用户对此码的第几次领取，从 1 开始
    pub claim_seq: i32,
    pub claimed_at: DateTime<Utc>,
}
