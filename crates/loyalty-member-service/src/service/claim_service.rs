//! 兑换码领取服务
//!
//! 处理"扫码领积分"的核心业务逻辑：
//! - 码有效性校验（状态、时间窗口）
//! - 单用户领取上限校验
//! - 守卫式全局余量扣减（数据库侧兜底防超发）
//! - 事务性写入（领取流水、余额、账本）
//! - 领取成功后的等级重算与后置钩子复用积分服务
//!
//! ## 领取流程
//!
//! 1. 码校验 -> 2. 单用户上限 -> 3. 事务内（锁用户行 -> 占全局余量
//!    -> 领取流水 -> 加分 -> 账本）-> 4. 等级重算与成就/邀请钩子

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument};

use loyalty_shared::observability::metrics;

use crate::error::{LoyaltyError, Result};
use crate::models::{ChangeType, RewardCodeStatus, SourceType};
use crate::repository::{
    LedgerRepository, RewardCodeRepository, RewardCodeRepositoryTrait, UserRepository,
    UserRepositoryTrait,
};
use crate::service::dto::ClaimResponse;
use crate::service::points_service::PointsService;

/// 兑换码领取服务
pub struct ClaimService<UR>
where
    UR: UserRepositoryTrait,
{
    code_repo: Arc<RewardCodeRepository>,
    points: Arc<PointsService<UR>>,
    pool: PgPool,
}

impl<UR> ClaimService<UR>
where
    UR: UserRepositoryTrait,
{
    pub fn new(
        code_repo: Arc<RewardCodeRepository>,
        points: Arc<PointsService<UR>>,
        pool: PgPool,
    ) -> Self {
        Self {
            code_repo,
            points,
            pool,
        }
    }

    /// 领取兑换码（公开接口）
    #[instrument(skip(self), fields(user_id = user_id, code = %code))]
    pub async fn claim(&self, user_id: i64, code: &str) -> Result<ClaimResponse> {
        let result = self.claim_inner(user_id, code).await;

        match &result {
            Ok(_) => metrics::record_code_claim("success"),
            Err(e) if e.is_business_error() => metrics::record_code_claim("rejected"),
            Err(_) => metrics::record_code_claim("error"),
        }

        result
    }

    async fn claim_inner(&self, user_id: i64, code: &str) -> Result<ClaimResponse> {
        // 1. 码校验
        let reward_code = self
            .code_repo
            .get_by_code(code)
            .await?
            .ok_or_else(|| LoyaltyError::CodeNotFound(code.to_string()))?;

        if reward_code.status == RewardCodeStatus::Disabled {
            return Err(LoyaltyError::CodeDisabled(code.to_string()));
        }

        let now = Utc::now();
        if let Some(starts_at) = reward_code.starts_at
            && now < starts_at
        {
            return Err(LoyaltyError::CodeNotStarted(code.to_string()));
        }
        if let Some(expires_at) = reward_code.expires_at
            && now >= expires_at
        {
            return Err(LoyaltyError::CodeExpired(code.to_string()));
        }

        // 2. 单用户上限
        let claimed = self.code_repo.count_user_claims(reward_code.id, user_id).await?;
        if claimed >= reward_code.per_user_limit as i64 {
            return Err(LoyaltyError::CodeClaimLimitReached {
                code: code.to_string(),
                limit: reward_code.per_user_limit,
            });
        }
        let claim_seq = (claimed + 1) as i32;

        // 全局余量预检，最终以事务内守卫式更新为准
        if !reward_code.has_supply() {
            return Err(LoyaltyError::CodeExhausted(code.to_string()));
        }

        // 3. 事务内执行领取
        let amount = reward_code.points_value;
        let ref_id = format!(
            "code:{}:user:{}:seq:{}",
            reward_code.id, user_id, claim_seq
        );

        let mut tx = self.pool.begin().await?;

        let user = UserRepository::get_user_for_update(&mut tx, user_id)
            .await?
            .ok_or(LoyaltyError::UserNotFound(user_id))?;

        if !user.is_active() {
            return Err(LoyaltyError::UserSuspended(user_id));
        }

        if !RewardCodeRepository::reserve_claim_in_tx(&mut tx, reward_code.id).await? {
            return Err(LoyaltyError::CodeExhausted(code.to_string()));
        }

        RewardCodeRepository::insert_claim_in_tx(&mut tx, reward_code.id, user_id, claim_seq)
            .await?;

        let new_balance = user.points_balance + amount;
        let new_lifetime = user.lifetime_points + amount;
        UserRepository::apply_balance_in_tx(&mut tx, user_id, new_balance, new_lifetime).await?;

        LedgerRepository::append_in_tx(
            &mut tx,
            user_id,
            ChangeType::Earn,
            amount,
            new_balance,
            SourceType::CodeClaim,
            Some(&ref_id),
            Some(&format!("兑换码领取: {}", reward_code.code)),
        )
        .await?;

        tx.commit().await?;

        metrics::record_points_grant(SourceType::CodeClaim.as_str(), amount);

        info!(
            user_id = user_id,
            code = %reward_code.code,
            claim_seq = claim_seq,
            points_granted = amount,
            points_balance = new_balance,
            "兑换码领取成功"
        );

        // 4. 等级重算、缓存失效与邀请/成就钩子
        self.points
            .post_earn_followups(user_id, SourceType::CodeClaim)
            .await?;

        Ok(ClaimResponse {
            points_granted: amount,
            points_balance: new_balance,
            lifetime_points: new_lifetime,
            claim_seq,
        })
    }
}
