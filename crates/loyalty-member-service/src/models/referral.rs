//! 邀请关系实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::ReferralStatus;

/// 邀请关系
///
/// 注册时创建为 Pending，被邀请人首次获得积分后完成并发放双方奖励；
/// referred_id 唯一，一个用户只能被邀请一次
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: i64,
    /// 邀请人
    pub referrer_id: i64,
    /// 被邀请人
    pub referred_id: i64,
    pub status: ReferralStatus,
    /// 完成时发给邀请人的积分（完成前为 0）
    pub referrer_points: i64,
    /// 完成时发给被邀请人的积分（完成前为 0）
    pub referred_points: i64,
    #[sqlx(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Referral {
    pub fn is_pending(&self) -> bool {
        self.status == ReferralStatus::Pending
    }
}
