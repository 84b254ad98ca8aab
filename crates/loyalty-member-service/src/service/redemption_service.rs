//! 商品兑换服务
//!
//! 处理积分兑换商品的核心业务逻辑，包括：
//! - 幂等处理（订单 idempotency_key，重复请求返回原订单）
//! - 商品有效性与等级门槛校验
//! - 余额校验与扣减
//! - 守卫式库存扣减（数据库侧兜底防超卖）
//! - 事务性写入（余额、账本、库存、订单）
//! - 订单取消与积分退回
//!
//! ## 兑换流程
//!
//! 1. 幂等检查 -> 2. 商品校验 -> 3. 事务内（锁用户行 -> 等级门槛
//!    -> 余额校验 -> 占库存 -> 扣分 -> 账本 -> 建单）-> 4. 缓存失效
//!    -> 5. 成就评估（失败不影响主流程）

use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use loyalty_shared::cache::{Cache, CacheKey};
use loyalty_shared::observability::metrics;

use crate::error::{LoyaltyError, Result};
use crate::models::{
    AchievementTrigger, ChangeType, Order, OrderStatus, ProductStatus, SourceType,
    generate_order_no,
};
use crate::repository::{
    LedgerRepository, OrderRepository, ProductRepository, ProductRepositoryTrait, UserRepository,
};
use crate::service::achievement_service::AchievementEvaluator;
use crate::service::dto::{RedeemRequest, RedeemResponse};
use crate::service::points_service::checked_debit;

const ORDER_COLUMNS: &str = "id, order_no, user_id, product_id, points_spent, status, \
     idempotency_key, cancel_reason, created_at, updated_at";

/// 商品兑换服务
///
/// 等级门槛按门槛积分比较而非等级 ID 比较：用户累计积分达到
/// 门槛等级的 points_required 即可兑换，等级行的增删不会影响判定。
pub struct RedemptionService<PR>
where
    PR: ProductRepositoryTrait,
{
    product_repo: Arc<PR>,
    cache: Arc<Cache>,
    pool: PgPool,
    /// 成就评估器（延迟注入，避免循环依赖）
    achievement_evaluator: RwLock<Option<Arc<AchievementEvaluator>>>,
}

impl<PR> RedemptionService<PR>
where
    PR: ProductRepositoryTrait,
{
    pub fn new(product_repo: Arc<PR>, cache: Arc<Cache>, pool: PgPool) -> Self {
        Self {
            product_repo,
            cache,
            pool,
            achievement_evaluator: RwLock::new(None),
        }
    }

    /// 设置成就评估器
    pub async fn set_achievement_evaluator(&self, evaluator: Arc<AchievementEvaluator>) {
        let mut guard = self.achievement_evaluator.write().await;
        *guard = Some(evaluator);
        info!("RedemptionService 成就评估器已设置");
    }

    /// 兑换商品（公开接口）
    #[instrument(skip(self), fields(user_id = request.user_id, product_id = request.product_id))]
    pub async fn redeem(&self, request: RedeemRequest) -> Result<RedeemResponse> {
        let start = Instant::now();
        let result = self.redeem_inner(&request).await;

        match &result {
            Ok(response) if !response.duplicate => {
                metrics::record_redemption("success", start.elapsed().as_secs_f64());
            }
            Ok(_) => {}
            Err(e) if e.is_business_error() => {
                metrics::record_redemption("rejected", start.elapsed().as_secs_f64());
            }
            Err(_) => {
                metrics::record_redemption("error", start.elapsed().as_secs_f64());
            }
        }

        result
    }

    async fn redeem_inner(&self, request: &RedeemRequest) -> Result<RedeemResponse> {
        // 1. 幂等检查：同一用户重复提交返回原订单。
        //    查询必须按用户限定，避免拿别人的幂等键读到他人订单
        if let Some(ref key) = request.idempotency_key
            && let Some(order) = self
                .find_order_by_idempotency_key(key, request.user_id)
                .await?
        {
            info!(idempotency_key = %key, order_no = %order.order_no, "幂等请求，返回已存在的订单");
            let balance = self.current_balance(order.user_id).await?;
            return Ok(RedeemResponse {
                order,
                points_balance: balance,
                duplicate: true,
            });
        }

        // 2. 商品校验
        let product = self
            .product_repo
            .get_product(request.product_id)
            .await?
            .ok_or(LoyaltyError::ProductNotFound(request.product_id))?;

        if product.status != ProductStatus::Active {
            return Err(LoyaltyError::ProductInactive(product.id));
        }

        // 3. 事务内执行兑换
        let order_no = generate_order_no();
        let mut tx = self.pool.begin().await?;

        let user = UserRepository::get_user_for_update(&mut tx, request.user_id)
            .await?
            .ok_or(LoyaltyError::UserNotFound(request.user_id))?;

        if !user.is_active() {
            return Err(LoyaltyError::UserSuspended(user.id));
        }

        // 等级门槛：按门槛积分比较
        if let Some(required_rank_id) = product.required_rank_id {
            let rank = sqlx::query_as::<_, (String, i64)>(
                "SELECT name, points_required FROM ranks WHERE id = $1",
            )
            .bind(required_rank_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LoyaltyError::RankNotFound(required_rank_id))?;

            if user.lifetime_points < rank.1 {
                return Err(LoyaltyError::RankRequirementNotMet {
                    required_rank: rank.0,
                });
            }
        }

        // 余额校验（InsufficientPoints 对外映射 402）
        let new_balance = checked_debit(&user, product.cost_points)?;

        // 守卫式占库存，售罄由此兜底
        if !ProductRepository::reserve_stock_in_tx(&mut tx, product.id).await? {
            return Err(LoyaltyError::ProductOutOfStock(product.id));
        }

        UserRepository::apply_balance_in_tx(&mut tx, user.id, new_balance, user.lifetime_points)
            .await?;

        LedgerRepository::append_in_tx(
            &mut tx,
            user.id,
            ChangeType::RedeemOut,
            product.cost_points,
            new_balance,
            SourceType::Redemption,
            Some(&order_no),
            Some(&product.name),
        )
        .await?;

        // 幂等键属于其他用户时由唯一约束兜底，映射为冲突而非泄露原订单
        OrderRepository::create_in_tx(
            &mut tx,
            &order_no,
            user.id,
            product.id,
            product.cost_points,
            OrderStatus::Completed,
            request.idempotency_key.as_deref(),
        )
        .await
        .map_err(map_idempotency_conflict)?;

        tx.commit().await?;

        // 4. 缓存失效
        self.invalidate_caches(user.id, product.id).await;

        info!(
            user_id = user.id,
            product_id = product.id,
            order_no = %order_no,
            points_spent = product.cost_points,
            points_balance = new_balance,
            "商品兑换成功"
        );

        // 5. 兑换订单数维度成就
        self.trigger_achievements(user.id).await;

        let order = self
            .get_order(&order_no)
            .await?
            .ok_or_else(|| LoyaltyError::Internal("刚创建的订单查询不到".to_string()))?;

        Ok(RedeemResponse {
            order,
            points_balance: new_balance,
            duplicate: false,
        })
    }

    /// 取消兑换订单（运营操作）
    ///
    /// 仅已完成订单可取消；事务内退回积分（不计入累计）、
    /// 回补库存并改写订单状态。
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_no: &str, reason: &str, operator: &str) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_no = $1 FOR UPDATE"
        ))
        .bind(order_no)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| LoyaltyError::OrderNotFound(order_no.to_string()))?;

        if !order.is_cancellable() {
            return Err(LoyaltyError::InvalidOrderStatus {
                order_no: order_no.to_string(),
                current_status: format!("{:?}", order.status).to_lowercase(),
            });
        }

        if !OrderRepository::cancel_in_tx(&mut tx, order.id, reason).await? {
            return Err(LoyaltyError::ConcurrencyConflict);
        }

        let user = UserRepository::get_user_for_update(&mut tx, order.user_id)
            .await?
            .ok_or(LoyaltyError::UserNotFound(order.user_id))?;

        // 退回只恢复余额，不重复累计
        let new_balance = user.points_balance + order.points_spent;
        UserRepository::apply_balance_in_tx(&mut tx, user.id, new_balance, user.lifetime_points)
            .await?;

        let remark = format!("{} (操作人: {})", reason, operator);
        LedgerRepository::append_in_tx(
            &mut tx,
            user.id,
            ChangeType::RedeemRefund,
            order.points_spent,
            new_balance,
            SourceType::Redemption,
            Some(&format!("refund:{}", order_no)),
            Some(&remark),
        )
        .await?;

        ProductRepository::release_stock_in_tx(&mut tx, order.product_id).await?;

        tx.commit().await?;

        self.invalidate_caches(user.id, order.product_id).await;

        info!(
            order_no = %order_no,
            user_id = user.id,
            refunded = order.points_spent,
            operator = %operator,
            "兑换订单已取消，积分已退回"
        );

        self.get_order(order_no)
            .await?
            .ok_or_else(|| LoyaltyError::OrderNotFound(order_no.to_string()))
    }

    // ==================== 私有方法 ====================

    async fn find_order_by_idempotency_key(&self, key: &str, user_id: i64) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE idempotency_key = $1 AND user_id = $2"
        ))
        .bind(key)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn get_order(&self, order_no: &str) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_no = $1"
        ))
        .bind(order_no)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn current_balance(&self, user_id: i64) -> Result<i64> {
        let balance = sqlx::query_scalar::<_, i64>("SELECT points_balance FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .unwrap_or(0);

        Ok(balance)
    }

    /// 触发兑换订单数维度的成就评估（失败不影响主流程）
    async fn trigger_achievements(&self, user_id: i64) {
        let evaluator = {
            let guard = self.achievement_evaluator.read().await;
            guard.clone()
        };

        if let Some(evaluator) = evaluator
            && let Err(e) = evaluator
                .evaluate(user_id, AchievementTrigger::OrderCount)
                .await
        {
            warn!(
                user_id = user_id,
                error = %e,
                "成就评估失败，但不影响兑换主流程"
            );
        }
    }

    /// 清除用户与商品相关缓存（失败仅记录日志）
    async fn invalidate_caches(&self, user_id: i64, product_id: i64) {
        if let Err(e) = self.cache.delete(&CacheKey::user_profile(user_id)).await {
            warn!(user_id = user_id, error = %e, "清除用户档案缓存失败");
        }
        if let Err(e) = self.cache.delete(&CacheKey::product_detail(product_id)).await {
            warn!(product_id = product_id, error = %e, "清除商品详情缓存失败");
        }
    }
}

/// 将幂等键唯一约束冲突转换为业务错误
fn map_idempotency_conflict(err: LoyaltyError) -> LoyaltyError {
    if let LoyaltyError::Database(sqlx::Error::Database(ref db)) = err
        && db.constraint() == Some("uq_orders_idempotency_key")
    {
        return LoyaltyError::IdempotencyKeyConflict;
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_idempotency_conflict_passthrough() {
        // 非约束冲突的数据库错误原样返回
        let err = map_idempotency_conflict(LoyaltyError::Database(sqlx::Error::RowNotFound));
        assert!(matches!(err, LoyaltyError::Database(_)));

        let err = map_idempotency_conflict(LoyaltyError::ProductOutOfStock(1));
        assert!(matches!(err, LoyaltyError::ProductOutOfStock(1)));
    }
}
