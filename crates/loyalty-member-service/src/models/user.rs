//! 用户实体定义

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::enums::UserStatus;

/// 邀请码字符集，去掉易混淆的 0/O/1/I
const REFERRAL_CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const REFERRAL_CODE_LEN: usize = 8;

/// 会员用户
///
/// `points_balance` 为当前可用余额，`lifetime_points` 为累计获得积分，
/// 只增不减，等级评定以累计积分为准
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    /// 登录邮箱，全局唯一
    pub email: String,
    /// 昵称
    pub name: String,
    /// bcrypt 密码哈希，永不出现在 API 响应中
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// 当前可用积分余额，恒 >= 0
    pub points_balance: i64,
    /// 累计获得积分，只增不减
    pub lifetime_points: i64,
    /// 当前等级 ID，未达到任何等级门槛时为空
    #[sqlx(default)]
    pub rank_id: Option<i64>,
    /// 本人的邀请码，注册时生成，全局唯一
    pub referral_code: String,
    /// 邀请人用户 ID
    #[sqlx(default)]
    pub referred_by: Option<i64>,
    /// 账号状态
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// 检查余额是否足够支付指定积分
    pub fn can_afford(&self, cost: i64) -> bool {
        self.points_balance >= cost
    }
}

/// 生成一个随机邀请码
///
/// 唯一性由数据库唯一约束兜底，冲突时调用方重新生成
pub fn generate_referral_code() -> String {
    let mut rng = rand::rng();
    (0..REFERRAL_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..REFERRAL_CODE_CHARSET.len());
            REFERRAL_CODE_CHARSET[idx] as char
        })
        .collect()
}
