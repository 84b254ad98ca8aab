//! PointsService 集成测试
//!
//! 使用真实 PostgreSQL 和 Redis 测试积分发放的完整流程。
//! PointsService 内部通过 sqlx::query 直接操作数据库（幂等检查、行锁、
//! 等级重算、邀请完成钩子），无法通过纯 mock 覆盖，因此需要集成测试。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... REDIS_URL=redis://... \
//!   cargo test --test points_flow_test -- --ignored
//! ```

use std::sync::Arc;

use sqlx::PgPool;

use loyalty_member::error::LoyaltyError;
use loyalty_member::repository::{ReferralRepository, UserRepository};
use loyalty_member::service::PointsService;
use loyalty_member::service::dto::{AdjustPointsRequest, GrantPointsRequest};
use loyalty_member::{ReferralService, SourceType};
use loyalty_shared::cache::Cache;
use loyalty_shared::config::{RedisConfig, ReferralConfig};

// ==================== 辅助函数 ====================

fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests")
}

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
}

fn test_cache() -> Arc<Cache> {
    let redis_config = RedisConfig {
        url: redis_url(),
        pool_size: 2,
    };
    Arc::new(Cache::new(&redis_config).expect("Redis connection failed"))
}

/// 创建 PointsService 实例（真实仓储 + Cache，不挂成就评估器）
fn setup_points_service(pool: &PgPool) -> PointsService<UserRepository> {
    let user_repo = Arc::new(UserRepository::new(pool.clone()));
    let referral_repo = Arc::new(ReferralRepository::new(pool.clone()));
    PointsService::new(
        user_repo,
        referral_repo,
        test_cache(),
        pool.clone(),
        ReferralConfig::default(),
    )
}

/// 插入测试用户（幂等，已存在则重置余额）
async fn seed_user(
    pool: &PgPool,
    user_id: i64,
    referral_code: &str,
    points_balance: i64,
    lifetime_points: i64,
    status: &str,
) {
    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, password_hash, points_balance, lifetime_points,
                           referral_code, status)
        VALUES ($1, $2, $3, '$2b$12$integtest', $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE SET
            points_balance = EXCLUDED.points_balance,
            lifetime_points = EXCLUDED.lifetime_points,
            rank_id = NULL,
            status = EXCLUDED.status
        "#,
    )
    .bind(user_id)
    .bind(format!("integ_user_{}@test.local", user_id))
    .bind(format!("IntegUser{}", user_id))
    .bind(points_balance)
    .bind(lifetime_points)
    .bind(referral_code)
    .bind(status)
    .execute(pool)
    .await
    .expect("插入测试用户失败");
}

/// 插入测试等级
async fn seed_rank(pool: &PgPool, rank_id: i64, name: &str, points_required: i64) {
    sqlx::query(
        r#"
        INSERT INTO ranks (id, name, points_required, sort_order, perks)
        VALUES ($1, $2, $3, 0, '[]')
        ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            points_required = EXCLUDED.points_required
        "#,
    )
    .bind(rank_id)
    .bind(name)
    .bind(points_required)
    .execute(pool)
    .await
    .expect("插入测试等级失败");
}

/// 清理测试数据，按外键依赖顺序删除
async fn cleanup_test_data(pool: &PgPool, user_ids: &[i64], rank_ids: &[i64]) {
    for uid in user_ids {
        for table in [
            "points_ledger",
            "user_achievements",
            "reward_code_claims",
            "orders",
        ] {
            sqlx::query(&format!("DELETE FROM {} WHERE user_id = $1", table))
                .bind(uid)
                .execute(pool)
                .await
                .ok();
        }

        sqlx::query("DELETE FROM referrals WHERE referrer_id = $1 OR referred_id = $1")
            .bind(uid)
            .execute(pool)
            .await
            .ok();

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(uid)
            .execute(pool)
            .await
            .ok();
    }

    for rid in rank_ids {
        sqlx::query("DELETE FROM ranks WHERE id = $1")
            .bind(rid)
            .execute(pool)
            .await
            .ok();
    }
}

/// 构建发放请求的快捷方法
fn grant_request(user_id: i64, amount: i64, ref_id: Option<&str>) -> GrantPointsRequest {
    GrantPointsRequest {
        user_id,
        amount,
        source_type: SourceType::Manual,
        ref_id: ref_id.map(|s| s.to_string()),
        remark: Some("集成测试".to_string()),
    }
}

// ==================== 测试用例 ====================

/// 正常发放：余额、累计与账本记录均正确
#[tokio::test]
#[ignore = "需要 PostgreSQL 和 Redis"]
async fn test_grant_points_success() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let user_id = 98001;

    cleanup_test_data(&pool, &[user_id], &[]).await;
    seed_user(&pool, user_id, "ITGCODE1", 0, 0, "active").await;

    let svc = setup_points_service(&pool);
    let resp = svc.grant_points(grant_request(user_id, 300, None)).await;

    assert!(resp.is_ok(), "发放应成功: {:?}", resp.err());
    let resp = resp.unwrap();
    assert_eq!(resp.points_balance, 300);
    assert_eq!(resp.lifetime_points, 300);
    assert!(!resp.duplicate);

    // 验证账本记录
    let ledger: (i64, i64) = sqlx::query_as(
        "SELECT amount, balance_after FROM points_ledger \
         WHERE user_id = $1 AND change_type = 'EARN' ORDER BY id DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(ledger.0, 300);
    assert_eq!(ledger.1, 300);

    cleanup_test_data(&pool, &[user_id], &[]).await;
}

/// 幂等发放：相同 ref_id 第二次返回原结果，余额不重复累加
#[tokio::test]
#[ignore = "需要 PostgreSQL 和 Redis"]
async fn test_grant_points_idempotent() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let user_id = 98002;

    cleanup_test_data(&pool, &[user_id], &[]).await;
    seed_user(&pool, user_id, "ITGCODE2", 0, 0, "active").await;

    let svc = setup_points_service(&pool);

    let r1 = svc
        .grant_points(grant_request(user_id, 100, Some("idem-98002")))
        .await
        .unwrap();
    assert!(!r1.duplicate);

    let r2 = svc
        .grant_points(grant_request(user_id, 100, Some("idem-98002")))
        .await
        .unwrap();
    assert!(r2.duplicate, "相同 ref_id 应命中幂等");
    assert_eq!(r2.ledger_id, r1.ledger_id);

    let balance: (i64,) = sqlx::query_as("SELECT points_balance FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(balance.0, 100, "幂等不应导致余额重复累加");

    cleanup_test_data(&pool, &[user_id], &[]).await;
}

/// 非法金额：amount <= 0 返回 InvalidAmount
#[tokio::test]
#[ignore = "需要 PostgreSQL 和 Redis"]
async fn test_grant_points_invalid_amount() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let svc = setup_points_service(&pool);

    let result = svc.grant_points(grant_request(98003, 0, None)).await;
    assert!(matches!(result.unwrap_err(), LoyaltyError::InvalidAmount(_)));

    let result = svc.grant_points(grant_request(98003, -5, None)).await;
    assert!(matches!(result.unwrap_err(), LoyaltyError::InvalidAmount(_)));
}

/// 冻结用户：发放被拒绝，返回 UserSuspended
#[tokio::test]
#[ignore = "需要 PostgreSQL 和 Redis"]
async fn test_grant_points_suspended_user() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let user_id = 98004;

    cleanup_test_data(&pool, &[user_id], &[]).await;
    seed_user(&pool, user_id, "ITGCODE4", 100, 100, "suspended").await;

    let svc = setup_points_service(&pool);
    let result = svc.grant_points(grant_request(user_id, 50, None)).await;

    assert!(
        matches!(result.unwrap_err(), LoyaltyError::UserSuspended(id) if id == user_id),
        "冻结用户应拒绝发放"
    );

    cleanup_test_data(&pool, &[user_id], &[]).await;
}

/// 发放触发等级晋升：累计积分跨过门槛后 rank_id 更新
#[tokio::test]
#[ignore = "需要 PostgreSQL 和 Redis"]
async fn test_grant_points_rank_promotion() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let user_id = 98005;
    let rank_bronze = 98801;
    let rank_silver = 98802;

    cleanup_test_data(&pool, &[user_id], &[rank_bronze, rank_silver]).await;
    seed_rank(&pool, rank_bronze, "IntegBronze", 0).await;
    seed_rank(&pool, rank_silver, "IntegSilver", 1000).await;
    seed_user(&pool, user_id, "ITGCODE5", 0, 900, "active").await;

    let svc = setup_points_service(&pool);
    let resp = svc
        .grant_points(grant_request(user_id, 200, None))
        .await
        .unwrap();

    // 900 + 200 = 1100，跨过白银门槛
    assert_eq!(resp.lifetime_points, 1100);
    let change = resp.rank_change.expect("应产生等级变化");
    assert_eq!(change.to_rank_id, Some(rank_silver));

    let rank_id: (Option<i64>,) = sqlx::query_as("SELECT rank_id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rank_id.0, Some(rank_silver));

    cleanup_test_data(&pool, &[user_id], &[rank_bronze, rank_silver]).await;
}

/// 运营调减：余额扣减且账本记录 ADJUST_OUT；累计积分不变
#[tokio::test]
#[ignore = "需要 PostgreSQL 和 Redis"]
async fn test_adjust_points_decrease() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let user_id = 98006;

    cleanup_test_data(&pool, &[user_id], &[]).await;
    seed_user(&pool, user_id, "ITGCODE6", 500, 500, "active").await;

    let svc = setup_points_service(&pool);
    let resp = svc
        .adjust_points(AdjustPointsRequest {
            user_id,
            delta: -200,
            operator: "integ_admin".to_string(),
            reason: "错发回收".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(resp.points_balance, 300);
    assert_eq!(resp.lifetime_points, 500, "调减不应影响累计积分");

    let ledger_count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM points_ledger WHERE user_id = $1 AND change_type = 'ADJUST_OUT'",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(ledger_count.0, 1);

    cleanup_test_data(&pool, &[user_id], &[]).await;
}

/// 运营调减超过余额：返回 InsufficientPoints，余额不变
#[tokio::test]
#[ignore = "需要 PostgreSQL 和 Redis"]
async fn test_adjust_points_insufficient() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let user_id = 98007;

    cleanup_test_data(&pool, &[user_id], &[]).await;
    seed_user(&pool, user_id, "ITGCODE7", 100, 100, "active").await;

    let svc = setup_points_service(&pool);
    let result = svc
        .adjust_points(AdjustPointsRequest {
            user_id,
            delta: -500,
            operator: "integ_admin".to_string(),
            reason: "超额扣减测试".to_string(),
        })
        .await;

    assert!(matches!(
        result.unwrap_err(),
        LoyaltyError::InsufficientPoints {
            required: 500,
            available: 100
        }
    ));

    let balance: (i64,) = sqlx::query_as("SELECT points_balance FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(balance.0, 100, "失败的调减不应改变余额");

    cleanup_test_data(&pool, &[user_id], &[]).await;
}

/// 邀请完成流程：被邀请人首次获得积分后双方收到奖励
#[tokio::test]
#[ignore = "需要 PostgreSQL 和 Redis"]
async fn test_referral_completion_on_first_earn() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let referrer_id = 98008;
    let referred_id = 98009;

    cleanup_test_data(&pool, &[referrer_id, referred_id], &[]).await;
    seed_user(&pool, referrer_id, "ITGREF8", 0, 0, "active").await;
    seed_user(&pool, referred_id, "ITGREF9", 0, 0, "active").await;

    // 登记邀请关系
    let user_repo = Arc::new(UserRepository::new(pool.clone()));
    let referral_repo = Arc::new(ReferralRepository::new(pool.clone()));
    let referral_svc = ReferralService::new(user_repo, referral_repo);
    referral_svc
        .register_referral("ITGREF8", referred_id)
        .await
        .expect("登记邀请关系失败");

    // 被邀请人首次获得积分，触发邀请完成
    let svc = setup_points_service(&pool);
    svc.grant_points(grant_request(referred_id, 100, None))
        .await
        .unwrap();

    // 默认配置：邀请人 +500，被邀请人 +250
    let referrer_balance: (i64,) = sqlx::query_as("SELECT points_balance FROM users WHERE id = $1")
        .bind(referrer_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(referrer_balance.0, 500, "邀请人应获得奖励");

    let referred_balance: (i64,) = sqlx::query_as("SELECT points_balance FROM users WHERE id = $1")
        .bind(referred_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(referred_balance.0, 100 + 250, "被邀请人应获得首充 + 奖励");

    // 邀请记录上同时落库双方获得的奖励积分
    let referral_row: (String, i64, i64) = sqlx::query_as(
        "SELECT status, referrer_points, referred_points FROM referrals WHERE referred_id = $1",
    )
    .bind(referred_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(referral_row.0, "completed");
    assert_eq!(referral_row.1, 500, "邀请人奖励应落库");
    assert_eq!(referral_row.2, 250, "被邀请人奖励应落库");

    cleanup_test_data(&pool, &[referrer_id, referred_id], &[]).await;
}

/// 自邀被拒绝
#[tokio::test]
#[ignore = "需要 PostgreSQL 和 Redis"]
async fn test_referral_self_rejected() {
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let user_id = 98010;

    cleanup_test_data(&pool, &[user_id], &[]).await;
    seed_user(&pool, user_id, "ITGSELF1", 0, 0, "active").await;

    let user_repo = Arc::new(UserRepository::new(pool.clone()));
    let referral_repo = Arc::new(ReferralRepository::new(pool.clone()));
    let referral_svc = ReferralService::new(user_repo, referral_repo);

    let result = referral_svc.register_referral("ITGSELF1", user_id).await;
    assert!(matches!(result.unwrap_err(), LoyaltyError::SelfReferral));

    cleanup_test_data(&pool, &[user_id], &[]).await;
}
