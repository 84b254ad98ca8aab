//! 积分发放服务
//!
//! 处理积分变动的核心业务逻辑，包括：
//! - 幂等处理（账本 ref_id）
//! - 事务性写入（余额、累计积分、账本流水）
//! - 等级重算（门槛线性扫描，等级列表走缓存）
//! - 缓存失效
//! - 邀请关系完成（被邀请人首次获得积分时发放双方奖励）
//! - 成就评估触发（失败不影响主流程）
//!
//! ## 发放流程
//!
//! 1. 参数校验 -> 2. 幂等检查 -> 3. 事务写入（锁用户行）
//!    -> 4. 等级重算 -> 5. 缓存失效
//!    -> 6. 邀请完成检查（失败不影响主流程）
//!    -> 7. 成就评估（失败不影响主流程）

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use loyalty_shared::cache::{Cache, CacheKey};
use loyalty_shared::config::ReferralConfig;
use loyalty_shared::observability::metrics;

use crate::error::{LoyaltyError, Result};
use crate::models::{
    AchievementTrigger, ChangeType, Rank, SourceType, User, pick_rank,
};
use crate::repository::{
    LedgerRepository, ReferralRepository, ReferralRepositoryTrait, UserRepository,
    UserRepositoryTrait,
};
use crate::service::achievement_service::{AchievementEvaluator, PointsGranter};
use crate::service::dto::{
    AdjustPointsRequest, GrantPointsRequest, GrantPointsResponse, RankChange,
};

/// 等级列表缓存时长
const RANK_CACHE_TTL: Duration = Duration::from_secs(300);

const RANK_LIST_SQL: &str = "SELECT id, name, points_required, sort_order, icon_url, perks, \
     created_at, updated_at FROM ranks ORDER BY points_required ASC";

/// 积分发放服务
///
/// 负责积分变动的完整流程，包括验证、事务处理、等级重算和后置钩子。
///
/// ## 邀请完成
///
/// 被邀请人首次获得积分（来源非邀请奖励本身）时，其待完成的邀请关系
/// 会被标记完成，并向双方发放配置的奖励积分。完成检查失败不影响主流程。
///
/// ## 成就评估
///
/// 积分发放成功后触发累计积分维度的成就评估；来源为成就奖励的发放
/// 不再触发评估，避免无限递归。评估失败不影响主流程。
pub struct PointsService<UR>
where
    UR: UserRepositoryTrait,
{
    user_repo: Arc<UR>,
    referral_repo: Arc<ReferralRepository>,
    cache: Arc<Cache>,
    pool: PgPool,
    referral_config: ReferralConfig,
    /// 成就评估器（延迟注入，避免循环依赖）
    achievement_evaluator: RwLock<Option<Arc<AchievementEvaluator>>>,
}

impl<UR> PointsService<UR>
where
    UR: UserRepositoryTrait,
{
    pub fn new(
        user_repo: Arc<UR>,
        referral_repo: Arc<ReferralRepository>,
        cache: Arc<Cache>,
        pool: PgPool,
        referral_config: ReferralConfig,
    ) -> Self {
        Self {
            user_repo,
            referral_repo,
            cache,
            pool,
            referral_config,
            achievement_evaluator: RwLock::new(None),
        }
    }

    /// 设置成就评估器
    ///
    /// 由于 PointsService 和 AchievementEvaluator 存在循环依赖，
    /// 需要在服务初始化后通过此方法延迟注入评估器。
    pub async fn set_achievement_evaluator(&self, evaluator: Arc<AchievementEvaluator>) {
        let mut guard = self.achievement_evaluator.write().await;
        *guard = Some(evaluator);
        info!("PointsService 成就评估器已设置");
    }

    /// 发放积分给用户（公开接口）
    ///
    /// 完整流程：
    /// 1. 参数校验
    /// 2. 幂等检查（如果有 ref_id）
    /// 3. 事务内写入（锁用户行、更新余额与累计、追加账本）
    /// 4. 等级重算与缓存失效
    /// 5. 邀请完成检查（仅非邀请来源，失败不影响主流程）
    /// 6. 成就评估（仅非成就来源，失败不影响主流程）
    #[instrument(skip(self), fields(user_id = request.user_id, amount = request.amount))]
    pub async fn grant_points(&self, request: GrantPointsRequest) -> Result<GrantPointsResponse> {
        if request.amount <= 0 {
            return Err(LoyaltyError::InvalidAmount(
                "发放积分必须大于0".to_string(),
            ));
        }

        // 1. 幂等检查
        if let Some(ref key) = request.ref_id
            && let Some(response) = self.check_idempotency(key).await?
        {
            info!(ref_id = %key, "幂等请求，返回已存在的账本记录");
            return Ok(response);
        }

        // 2. 事务内执行发放
        let change_type = change_type_for_grant(request.source_type);
        let (ledger_id, points_balance, lifetime_points) = self
            .execute_change(
                request.user_id,
                change_type,
                request.amount,
                request.source_type,
                request.ref_id.as_deref(),
                request.remark.as_deref(),
            )
            .await?;

        metrics::record_points_grant(request.source_type.as_str(), request.amount);

        // 3. 等级重算、缓存失效与后置钩子
        let rank_change = self
            .post_earn_followups(request.user_id, request.source_type)
            .await?;

        info!(
            user_id = request.user_id,
            amount = request.amount,
            ledger_id = ledger_id,
            points_balance = points_balance,
            "积分发放成功"
        );

        Ok(GrantPointsResponse::success(
            ledger_id,
            points_balance,
            lifetime_points,
            rank_change,
        ))
    }

    /// 运营积分调整
    ///
    /// 正数加分、负数减分；减分不允许把余额调成负数。
    /// 减分不回退累计积分，等级不会因此下降。
    #[instrument(skip(self), fields(user_id = request.user_id, delta = request.delta))]
    pub async fn adjust_points(&self, request: AdjustPointsRequest) -> Result<GrantPointsResponse> {
        if request.delta == 0 {
            return Err(LoyaltyError::InvalidAmount("调整量不能为0".to_string()));
        }

        let change_type = if request.delta > 0 {
            ChangeType::AdjustIn
        } else {
            ChangeType::AdjustOut
        };
        let amount = request.delta.abs();
        let remark = format!("{} (操作人: {})", request.reason, request.operator);

        let (ledger_id, points_balance, lifetime_points) = self
            .execute_change(
                request.user_id,
                change_type,
                amount,
                SourceType::Manual,
                None,
                Some(&remark),
            )
            .await?;

        let rank_change = if request.delta > 0 {
            metrics::record_points_grant(SourceType::Manual.as_str(), amount);
            // 加分视同获得积分，照常走邀请完成与成就评估
            self.post_earn_followups(request.user_id, SourceType::Manual)
                .await?
        } else {
            self.invalidate_user_cache(request.user_id).await;
            None
        };

        info!(
            user_id = request.user_id,
            delta = request.delta,
            operator = %request.operator,
            points_balance = points_balance,
            "运营积分调整完成"
        );

        Ok(GrantPointsResponse::success(
            ledger_id,
            points_balance,
            lifetime_points,
            rank_change,
        ))
    }

    /// 积分入账后的统一后置处理
    ///
    /// 等级重算、用户缓存失效，然后触发邀请完成检查和成就评估。
    /// 供本服务和兑换码领取流程复用。
    pub async fn post_earn_followups(
        &self,
        user_id: i64,
        source_type: SourceType,
    ) -> Result<Option<RankChange>> {
        let rank_change = self.recalculate_rank(user_id).await?;
        self.invalidate_user_cache(user_id).await;

        // 仅非邀请来源触发邀请完成，避免无限递归
        if source_type != SourceType::Referral {
            self.try_complete_referral(user_id).await;
        }

        // 仅非成就来源触发成就评估，避免无限递归
        if source_type != SourceType::Achievement {
            self.trigger_achievements(user_id, AchievementTrigger::LifetimePoints)
                .await;
        }

        Ok(rank_change)
    }

    /// 重算用户等级
    ///
    /// 取累计积分达到门槛的最高等级，与当前等级不同时写回。
    /// 返回等级变化，未变化时返回 None。
    pub async fn recalculate_rank(&self, user_id: i64) -> Result<Option<RankChange>> {
        let user = self
            .user_repo
            .get_user(user_id)
            .await?
            .ok_or(LoyaltyError::UserNotFound(user_id))?;

        let ranks = self.load_ranks().await?;
        let target = pick_rank(&ranks, user.lifetime_points);
        let target_id = target.map(|r| r.id);

        if target_id == user.rank_id {
            return Ok(None);
        }

        self.user_repo.set_rank(user_id, target_id).await?;
        metrics::record_rank_promotion();

        let change = RankChange {
            from_rank_id: user.rank_id,
            to_rank_id: target_id,
            to_rank_name: target.map(|r| r.name.clone()),
        };

        info!(
            user_id = user_id,
            from_rank = ?change.from_rank_id,
            to_rank = ?change.to_rank_id,
            lifetime_points = user.lifetime_points,
            "用户等级已更新"
        );

        Ok(Some(change))
    }

    /// 加载等级列表（按门槛升序）
    ///
    /// 优先走缓存，缓存不可用时降级为直接查库
    pub async fn load_ranks(&self) -> Result<Vec<Rank>> {
        let pool = self.pool.clone();
        let loaded = self
            .cache
            .get_or_set(&CacheKey::rank_list(), RANK_CACHE_TTL, || async move {
                let ranks = sqlx::query_as::<_, Rank>(RANK_LIST_SQL)
                    .fetch_all(&pool)
                    .await?;
                Ok(ranks)
            })
            .await;

        match loaded {
            Ok(ranks) => Ok(ranks),
            Err(e) => {
                warn!(error = %e, "等级缓存不可用，降级查库");
                let ranks = sqlx::query_as::<_, Rank>(RANK_LIST_SQL)
                    .fetch_all(&self.pool)
                    .await?;
                Ok(ranks)
            }
        }
    }

    // ==================== 私有方法 ====================

    /// 幂等检查
    ///
    /// 查询是否已存在相同幂等键的账本记录
    async fn check_idempotency(&self, key: &str) -> Result<Option<GrantPointsResponse>> {
        let row = sqlx::query(
            r#"
            SELECT l.id, l.balance_after, u.lifetime_points
            FROM points_ledger l
            JOIN users u ON u.id = l.user_id
            WHERE l.ref_id = $1
            LIMIT 1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            let ledger_id: i64 = row.get("id");
            let balance_after: i64 = row.get("balance_after");
            let lifetime_points: i64 = row.get("lifetime_points");
            return Ok(Some(GrantPointsResponse::from_existing(
                ledger_id,
                balance_after,
                lifetime_points,
            )));
        }

        Ok(None)
    }

    /// 执行积分变动事务
    ///
    /// 在单个事务内完成：
    /// - 锁定用户行并校验状态
    /// - 更新余额与累计积分
    /// - 追加账本流水
    ///
    /// 返回（账本 ID，新余额，新累计积分）
    async fn execute_change(
        &self,
        user_id: i64,
        change_type: ChangeType,
        amount: i64,
        source_type: SourceType,
        ref_id: Option<&str>,
        remark: Option<&str>,
    ) -> Result<(i64, i64, i64)> {
        let mut tx = self.pool.begin().await?;

        let user = UserRepository::get_user_for_update(&mut tx, user_id)
            .await?
            .ok_or(LoyaltyError::UserNotFound(user_id))?;

        // 冻结账号只拦截用户侧获得积分，运营调整不受限
        if source_type != SourceType::Manual && !user.is_active() {
            return Err(LoyaltyError::UserSuspended(user_id));
        }

        let signed = amount * change_type.sign();
        let new_balance = user.points_balance + signed;
        if new_balance < 0 {
            return Err(LoyaltyError::InsufficientPoints {
                required: amount,
                available: user.points_balance,
            });
        }

        let new_lifetime = if change_type.affects_lifetime() {
            user.lifetime_points + amount
        } else {
            user.lifetime_points
        };

        UserRepository::apply_balance_in_tx(&mut tx, user_id, new_balance, new_lifetime).await?;

        let ledger_id = LedgerRepository::append_in_tx(
            &mut tx,
            user_id,
            change_type,
            amount,
            new_balance,
            source_type,
            ref_id,
            remark,
        )
        .await?;

        tx.commit().await?;

        Ok((ledger_id, new_balance, new_lifetime))
    }

    /// 邀请完成检查（失败不影响主流程）
    ///
    /// 返回装箱的 Future：完成流程会再次调用 grant_points 发放奖励，
    /// 装箱切断递归的 Future 类型
    fn try_complete_referral(&self, user_id: i64) -> futures::future::BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Err(e) = self.complete_pending_referral(user_id).await {
                warn!(
                    user_id = user_id,
                    error = %e,
                    "邀请完成处理失败，但不影响主发放流程"
                );
            }
        })
    }

    /// 完成待处理的邀请关系
    ///
    /// 被邀请人首次获得积分时调用：守卫式更新保证并发下只完成一次，
    /// 完成后向双方发放配置的奖励积分（各自带幂等键）。
    async fn complete_pending_referral(&self, user_id: i64) -> Result<()> {
        let Some(referral) = self.referral_repo.get_by_referred(user_id).await? else {
            return Ok(());
        };
        if !referral.is_pending() {
            return Ok(());
        }

        let referrer_points = self.referral_config.referrer_points;
        let referred_points = self.referral_config.referred_points;

        let completed = self
            .referral_repo
            .complete(referral.id, referrer_points, referred_points, Utc::now())
            .await?;
        if !completed {
            // 并发下已由其他请求完成
            return Ok(());
        }

        info!(
            referral_id = referral.id,
            referrer_id = referral.referrer_id,
            referred_id = referral.referred_id,
            "邀请关系已完成，发放双方奖励"
        );

        self.grant_points(GrantPointsRequest {
            user_id: referral.referrer_id,
            amount: referrer_points,
            source_type: SourceType::Referral,
            ref_id: Some(format!("referral:{}:referrer", referral.id)),
            remark: Some("邀请好友奖励".to_string()),
        })
        .await?;

        self.grant_points(GrantPointsRequest {
            user_id: referral.referred_id,
            amount: referred_points,
            source_type: SourceType::Referral,
            ref_id: Some(format!("referral:{}:referred", referral.id)),
            remark: Some("受邀注册奖励".to_string()),
        })
        .await?;

        // 邀请人的邀请数维度成就
        self.trigger_achievements(referral.referrer_id, AchievementTrigger::ReferralCount)
            .await;

        Ok(())
    }

    /// 触发成就评估（失败不影响主流程）
    async fn trigger_achievements(&self, user_id: i64, trigger: AchievementTrigger) {
        let evaluator = {
            let guard = self.achievement_evaluator.read().await;
            guard.clone()
        };

        if let Some(evaluator) = evaluator
            && let Err(e) = evaluator.evaluate(user_id, trigger).await
        {
            warn!(
                user_id = user_id,
                trigger = trigger.as_str(),
                error = %e,
                "成就评估失败，但不影响主发放流程"
            );
        }
    }

    /// 清除用户相关缓存（失败仅记录日志）
    async fn invalidate_user_cache(&self, user_id: i64) {
        if let Err(e) = self.cache.delete(&CacheKey::user_profile(user_id)).await {
            warn!(user_id = user_id, error = %e, "清除用户档案缓存失败");
        }
    }
}

#[async_trait::async_trait]
impl<UR> PointsGranter for PointsService<UR>
where
    UR: UserRepositoryTrait + 'static,
{
    async fn grant_bonus(
        &self,
        user_id: i64,
        amount: i64,
        source_type: SourceType,
        ref_id: String,
        remark: String,
    ) -> Result<()> {
        self.grant_points(GrantPointsRequest {
            user_id,
            amount,
            source_type,
            ref_id: Some(ref_id),
            remark: Some(remark),
        })
        .await
        .map(|_| ())
    }
}

/// 根据来源推导发放的账本变动类型
fn change_type_for_grant(source_type: SourceType) -> ChangeType {
    match source_type {
        SourceType::Referral => ChangeType::ReferralBonus,
        SourceType::Achievement => ChangeType::AchievementBonus,
        _ => ChangeType::Earn,
    }
}

/// 带锁用户行上的余额校验结果（供其他服务事务内复用）
pub fn checked_debit(user: &User, cost: i64) -> Result<i64> {
    if user.points_balance < cost {
        return Err(LoyaltyError::InsufficientPoints {
            required: cost,
            available: user.points_balance,
        });
    }
    Ok(user.points_balance - cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_type_for_grant() {
        assert_eq!(
            change_type_for_grant(SourceType::CodeClaim),
            ChangeType::Earn
        );
        assert_eq!(change_type_for_grant(SourceType::System), ChangeType::Earn);
        assert_eq!(
            change_type_for_grant(SourceType::Referral),
            ChangeType::ReferralBonus
        );
        assert_eq!(
            change_type_for_grant(SourceType::Achievement),
            ChangeType::AchievementBonus
        );
    }

    #[test]
    fn test_checked_debit() {
        let mut user = test_user();
        user.points_balance = 500;

        assert_eq!(checked_debit(&user, 500).unwrap(), 0);
        assert_eq!(checked_debit(&user, 120).unwrap(), 380);

        let err = checked_debit(&user, 501).unwrap_err();
        assert!(matches!(
            err,
            LoyaltyError::InsufficientPoints {
                required: 501,
                available: 500
            }
        ));
    }

    fn test_user() -> User {
        use crate::models::UserStatus;
        use chrono::Utc;

        User {
            id: 1,
            email: "user@example.com".to_string(),
            name: "Test".to_string(),
            password_hash: String::new(),
            points_balance: 0,
            lifetime_points: 0,
            rank_id: None,
            referral_code: "ABCD2345".to_string(),
            referred_by: None,
            status: UserStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
