//! 会员查询服务
//!
//! 提供档案、账本、订单、目录、成就等读路径；
//! 热点数据（档案、等级列表、商品详情）走 Redis 缓存

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tracing::warn;

use loyalty_shared::cache::{Cache, CacheKey};

use crate::error::{LoyaltyError, Result};
use crate::models::{
    Achievement, Order, PointsLedger, Product, Rank, User, next_rank, pick_rank,
};
use crate::repository::{
    AchievementRepository, AchievementRepositoryTrait, LedgerRepository, LedgerRepositoryTrait,
    OrderRepository, OrderRepositoryTrait, ProductRepository, ProductRepositoryTrait,
    RankRepository, RankRepositoryTrait, UserRepository, UserRepositoryTrait,
};
use crate::service::dto::{AchievementView, Page, ProductView, ProfileView};

/// 档案缓存时长
const PROFILE_CACHE_TTL: Duration = Duration::from_secs(60);
/// 等级列表缓存时长
const RANK_CACHE_TTL: Duration = Duration::from_secs(300);
/// 商品详情缓存时长
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(60);

/// 单页条数上限
const MAX_PAGE_SIZE: i64 = 100;

/// 规整分页参数，返回（页码，页大小，偏移量）
pub fn normalize_page(page: i64, page_size: i64) -> (i64, i64, i64) {
    let page = page.max(1);
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    (page, page_size, (page - 1) * page_size)
}

/// 会员查询服务
pub struct QueryService {
    user_repo: Arc<UserRepository>,
    rank_repo: Arc<RankRepository>,
    product_repo: Arc<ProductRepository>,
    order_repo: Arc<OrderRepository>,
    ledger_repo: Arc<LedgerRepository>,
    achievement_repo: Arc<AchievementRepository>,
    cache: Arc<Cache>,
}

impl QueryService {
    pub fn new(pool: PgPool, cache: Arc<Cache>) -> Self {
        Self {
            user_repo: Arc::new(UserRepository::new(pool.clone())),
            rank_repo: Arc::new(RankRepository::new(pool.clone())),
            product_repo: Arc::new(ProductRepository::new(pool.clone())),
            order_repo: Arc::new(OrderRepository::new(pool.clone())),
            ledger_repo: Arc::new(LedgerRepository::new(pool.clone())),
            achievement_repo: Arc::new(AchievementRepository::new(pool)),
            cache,
        }
    }

    /// 用户档案（含等级与晋级进度），走缓存
    pub async fn profile(&self, user_id: i64) -> Result<ProfileView> {
        let key = CacheKey::user_profile(user_id);
        if let Ok(Some(cached)) = self.cache.get::<ProfileView>(&key).await {
            return Ok(cached);
        }

        let view = self.build_profile(user_id).await?;

        if let Err(e) = self.cache.set(&key, &view, PROFILE_CACHE_TTL).await {
            warn!(user_id = user_id, error = %e, "写入用户档案缓存失败");
        }

        Ok(view)
    }

    async fn build_profile(&self, user_id: i64) -> Result<ProfileView> {
        let user = self
            .user_repo
            .get_user(user_id)
            .await?
            .ok_or(LoyaltyError::UserNotFound(user_id))?;

        let ranks = self.ranks().await?;
        let rank = pick_rank(&ranks, user.lifetime_points).cloned();
        let next = next_rank(&ranks, user.lifetime_points).cloned();
        let points_to_next = next
            .as_ref()
            .map(|r| r.points_required - user.lifetime_points);

        Ok(ProfileView {
            user,
            rank,
            next_rank: next,
            points_to_next_rank: points_to_next,
        })
    }

    /// 等级列表（按门槛升序），缓存不可用时降级查库
    pub async fn ranks(&self) -> Result<Vec<Rank>> {
        let rank_repo = self.rank_repo.clone();
        let loaded = self
            .cache
            .get_or_set(&CacheKey::rank_list(), RANK_CACHE_TTL, || async move {
                let ranks = rank_repo.list_ranks().await.map_err(|e| {
                    loyalty_shared::error::InfraError::Internal(e.to_string())
                })?;
                Ok(ranks)
            })
            .await;

        match loaded {
            Ok(ranks) => Ok(ranks),
            Err(e) => {
                warn!(error = %e, "等级缓存不可用，降级查库");
                self.rank_repo.list_ranks().await
            }
        }
    }

    /// 积分账本分页
    pub async fn ledger_page(
        &self,
        user_id: i64,
        page: i64,
        page_size: i64,
    ) -> Result<Page<PointsLedger>> {
        let (page, page_size, offset) = normalize_page(page, page_size);
        let items = self
            .ledger_repo
            .list_by_user(user_id, page_size, offset)
            .await?;
        let total = self.ledger_repo.count_by_user(user_id).await?;

        Ok(Page::new(items, total, page, page_size))
    }

    /// 兑换订单分页
    pub async fn orders_page(&self, user_id: i64, page: i64, page_size: i64) -> Result<Page<Order>> {
        let (page, page_size, offset) = normalize_page(page, page_size);
        let items = self
            .order_repo
            .list_by_user(user_id, page_size, offset)
            .await?;
        let total = self.order_repo.count_by_user(user_id).await?;

        Ok(Page::new(items, total, page, page_size))
    }

    /// 订单详情（校验归属）
    pub async fn order_detail(&self, user_id: i64, order_no: &str) -> Result<Order> {
        let order = self
            .order_repo
            .get_by_order_no(order_no)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| LoyaltyError::OrderNotFound(order_no.to_string()))?;

        Ok(order)
    }

    /// 兑换目录分页
    ///
    /// 登录用户额外标注等级锁定状态；未登录（viewer 为空）只看可用性
    pub async fn catalog(
        &self,
        viewer: Option<&User>,
        page: i64,
        page_size: i64,
    ) -> Result<Page<ProductView>> {
        let (page, page_size, offset) = normalize_page(page, page_size);
        let products = self.product_repo.list_active(page_size, offset).await?;
        let total = self.product_repo.count_active().await?;

        let ranks = self.ranks().await?;
        let items = products
            .into_iter()
            .map(|p| self.build_product_view(p, viewer, &ranks))
            .collect();

        Ok(Page::new(items, total, page, page_size))
    }

    /// 商品详情，商品本体走缓存
    pub async fn product_detail(&self, product_id: i64, viewer: Option<&User>) -> Result<ProductView> {
        let key = CacheKey::product_detail(product_id);

        let product = match self.cache.get::<Product>(&key).await {
            Ok(Some(cached)) => cached,
            _ => {
                let product = self
                    .product_repo
                    .get_product(product_id)
                    .await?
                    .ok_or(LoyaltyError::ProductNotFound(product_id))?;

                if let Err(e) = self.cache.set(&key, &product, PRODUCT_CACHE_TTL).await {
                    warn!(product_id = product_id, error = %e, "写入商品详情缓存失败");
                }
                product
            }
        };

        let ranks = self.ranks().await?;
        Ok(self.build_product_view(product, viewer, &ranks))
    }

    /// 成就列表（定义 + 当前用户解锁状态）
    pub async fn achievements(&self, user_id: i64) -> Result<Vec<AchievementView>> {
        let achievements: Vec<Achievement> = self.achievement_repo.list_active().await?;
        let unlocked = self.achievement_repo.list_unlocked(user_id).await?;

        let views = achievements
            .into_iter()
            .map(|a| {
                let record = unlocked.iter().find(|u| u.achievement_id == a.id);
                AchievementView {
                    unlocked: record.is_some(),
                    unlocked_at: record.map(|u| u.unlocked_at),
                    achievement: a,
                }
            })
            .collect();

        Ok(views)
    }

    // ==================== 私有方法 ====================

    fn build_product_view(
        &self,
        product: Product,
        viewer: Option<&User>,
        ranks: &[Rank],
    ) -> ProductView {
        let rank_locked = match (viewer, product.required_rank_id) {
            (Some(user), Some(required_id)) => ranks
                .iter()
                .find(|r| r.id == required_id)
                .is_some_and(|r| user.lifetime_points < r.points_required),
            _ => false,
        };

        ProductView {
            available: product.is_redeemable(),
            rank_locked,
            product,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_page() {
        assert_eq!(normalize_page(1, 20), (1, 20, 0));
        assert_eq!(normalize_page(3, 20), (3, 20, 40));
        // 非法页码回落到第一页
        assert_eq!(normalize_page(0, 20), (1, 20, 0));
        assert_eq!(normalize_page(-5, 20), (1, 20, 0));
        // 页大小夹在 1..=100
        assert_eq!(normalize_page(1, 0), (1, 1, 0));
        assert_eq!(normalize_page(1, 1000), (1, 100, 0));
    }
}
