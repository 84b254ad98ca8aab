//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    Achievement, AchievementTrigger, Order, PointsLedger, Product, Rank, Referral, RewardCode,
    User, UserAchievement,
};

/// 创建用户入参
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub referral_code: String,
    pub referred_by: Option<i64>,
}

/// 用户仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn get_by_referral_code(&self, code: &str) -> Result<Option<User>>;
    async fn create_user(&self, user: &NewUser) -> Result<User>;
    async fn set_rank(&self, user_id: i64, rank_id: Option<i64>) -> Result<()>;
}

/// 等级仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RankRepositoryTrait: Send + Sync {
    async fn get_rank(&self, id: i64) -> Result<Option<Rank>>;
    /// 按门槛升序返回全部等级
    async fn list_ranks(&self) -> Result<Vec<Rank>>;
}

/// 商品仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepositoryTrait: Send + Sync {
    async fn get_product(&self, id: i64) -> Result<Option<Product>>;
    async fn list_active(&self, limit: i64, offset: i64) -> Result<Vec<Product>>;
    async fn count_active(&self) -> Result<i64>;
}

/// 订单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    async fn get_by_order_no(&self, order_no: &str) -> Result<Option<Order>>;
    async fn get_by_idempotency_key(&self, key: &str) -> Result<Option<Order>>;
    async fn list_by_user(&self, user_id: i64, limit: i64, offset: i64) -> Result<Vec<Order>>;
    async fn count_by_user(&self, user_id: i64) -> Result<i64>;
    async fn count_completed_by_user(&self, user_id: i64) -> Result<i64>;
}

/// 积分账本仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerRepositoryTrait: Send + Sync {
    /// 按幂等键查找账本行
    async fn find_by_ref_id(&self, ref_id: &str) -> Result<Option<PointsLedger>>;
    async fn list_by_user(&self, user_id: i64, limit: i64, offset: i64)
    -> Result<Vec<PointsLedger>>;
    async fn count_by_user(&self, user_id: i64) -> Result<i64>;
}

/// 成就仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AchievementRepositoryTrait: Send + Sync {
    async fn get_achievement(&self, id: i64) -> Result<Option<Achievement>>;
    async fn list_active(&self) -> Result<Vec<Achievement>>;
    async fn list_active_by_trigger(&self, trigger: AchievementTrigger)
    -> Result<Vec<Achievement>>;
    async fn list_unlocked(&self, user_id: i64) -> Result<Vec<UserAchievement>>;
    /// 解锁成就，已解锁时返回 false
    async fn unlock(&self, user_id: i64, achievement_id: i64) -> Result<bool>;
}

/// 邀请关系仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReferralRepositoryTrait: Send + Sync {
    async fn create(&self, referrer_id: i64, referred_id: i64) -> Result<Referral>;
    async fn get_by_referred(&self, referred_id: i64) -> Result<Option<Referral>>;
    async fn list_by_referrer(&self, referrer_id: i64) -> Result<Vec<Referral>>;
    async fn count_completed_by_referrer(&self, referrer_id: i64) -> Result<i64>;
    /// 将待完成关系标记为已完成，状态已变化时返回 false
    async fn complete(
        &self,
        id: i64,
        referrer_points: i64,
        referred_points: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<bool>;
}

/// 兑换码仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RewardCodeRepositoryTrait: Send + Sync {
    async fn get_by_code(&self, code: &str) -> Result<Option<RewardCode>>;
    async fn count_user_claims(&self, code_id: i64, user_id: i64) -> Result<i64>;
}
