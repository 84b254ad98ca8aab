//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态与服务装配

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use loyalty_shared::cache::Cache;
use loyalty_shared::config::ReferralConfig;

use crate::auth::{JwtConfig, JwtManager};
use crate::error::{LoyaltyError, Result};
use crate::models::User;
use crate::repository::{
    AchievementRepository, ProductRepository, ReferralRepository, RewardCodeRepository,
    UserRepository, UserRepositoryTrait,
};
use crate::service::{
    AchievementEvaluator, ClaimService, PointsService, QueryService, RedemptionService,
    ReferralService,
};

/// Axum 应用共享状态
///
/// 服务在 [`AppState::build`] 中统一装配，handler 间通过 Arc 共享
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL 连接池
    pub pool: PgPool,
    /// Redis 缓存客户端
    pub cache: Arc<Cache>,
    /// JWT 管理器
    pub jwt_manager: JwtManager,
    /// 积分发放服务
    pub points: Arc<PointsService<UserRepository>>,
    /// 商品兑换服务
    pub redemption: Arc<RedemptionService<ProductRepository>>,
    /// 兑换码领取服务
    pub claim: Arc<ClaimService<UserRepository>>,
    /// 邀请关系服务
    pub referral: Arc<ReferralService<UserRepository, ReferralRepository>>,
    /// 会员查询服务
    pub query: Arc<QueryService>,
    user_repo: Arc<UserRepository>,
}

impl AppState {
    /// 装配全部服务并解开循环依赖
    ///
    /// 积分服务与成就评估器互相依赖（发积分触发成就、成就解锁发奖励积分），
    /// 先各自构造，再通过延迟注入互相挂接。
    pub async fn build(
        pool: PgPool,
        cache: Arc<Cache>,
        jwt_config: JwtConfig,
        referral_config: ReferralConfig,
    ) -> Self {
        let user_repo = Arc::new(UserRepository::new(pool.clone()));
        let product_repo = Arc::new(ProductRepository::new(pool.clone()));
        let referral_repo = Arc::new(ReferralRepository::new(pool.clone()));
        let achievement_repo = Arc::new(AchievementRepository::new(pool.clone()));
        let code_repo = Arc::new(RewardCodeRepository::new(pool.clone()));

        let points = Arc::new(PointsService::new(
            user_repo.clone(),
            referral_repo.clone(),
            cache.clone(),
            pool.clone(),
            referral_config,
        ));

        let evaluator = Arc::new(AchievementEvaluator::new(achievement_repo, pool.clone()));
        evaluator.set_granter(points.clone()).await;
        points.set_achievement_evaluator(evaluator.clone()).await;

        let redemption = Arc::new(RedemptionService::new(
            product_repo,
            cache.clone(),
            pool.clone(),
        ));
        redemption.set_achievement_evaluator(evaluator).await;

        let claim = Arc::new(ClaimService::new(code_repo, points.clone(), pool.clone()));

        let referral = Arc::new(ReferralService::new(user_repo.clone(), referral_repo));

        let query = Arc::new(QueryService::new(pool.clone(), cache.clone()));

        info!("会员服务装配完成");

        Self {
            pool,
            cache,
            jwt_manager: JwtManager::new(jwt_config),
            points,
            redemption,
            claim,
            referral,
            query,
            user_repo,
        }
    }

    /// 加载用户，不存在时返回业务错误
    pub async fn load_user(&self, user_id: i64) -> Result<User> {
        self.user_repo
            .get_user(user_id)
            .await?
            .ok_or(LoyaltyError::UserNotFound(user_id))
    }

    /// 用户仓储（注册等写路径使用）
    pub fn user_repo(&self) -> &Arc<UserRepository> {
        &self.user_repo
    }
}
