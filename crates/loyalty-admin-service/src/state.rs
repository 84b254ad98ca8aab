//! 应用状态定义

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use loyalty_member::{
    AchievementEvaluator, AchievementRepository, PointsService, ProductRepository,
    RedemptionService, ReferralRepository, UserRepository,
};
use loyalty_shared::cache::Cache;
use loyalty_shared::config::ReferralConfig;

use crate::auth::{JwtConfig, JwtManager};

/// 管理后台共享状态
///
/// 复用会员领域服务：人工调整积分走 [`PointsService`]，
/// 取消订单走 [`RedemptionService`]，保证与 C 端同一套账务规则。
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
}

impl AppState {
    /// 装配领域服务并解开积分与成就的循环依赖
    pub async fn build(
        pool: PgPool,
        cache: Arc<Cache>,
        jwt_config: JwtConfig,
        referral_config: ReferralConfig,
    ) -> Self {
        let user_repo = Arc::new(UserRepository::new(pool.clone()));
        let referral_repo = Arc::new(ReferralRepository::new(pool.clone()));
        let product_repo = Arc::new(ProductRepository::new(pool.clone()));
        let achievement_repo = Arc::new(AchievementRepository::new(pool.clone()));

        let points = Arc::new(PointsService::new(
            user_repo,
            referral_repo,
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

        info!("管理后台服务装配完成");

        Self {
            pool,
            cache,
            jwt_manager: JwtManager::new(jwt_config),
            points,
            redemption,
        }
    }
}
