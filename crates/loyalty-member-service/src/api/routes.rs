//! C端 API 路由定义
//!
//! 挂载在 /api/v1 前缀下；公开路由的放行由认证中间件统一控制

use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{
    achievement, auth, catalog, claim, profile, redemption, referral,
};
use crate::api::state::AppState;

/// 认证路由
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
}

/// 档案与等级路由
fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile::get_profile))
        .route("/profile/ledger", get(profile::get_ledger))
        .route("/ranks", get(profile::list_ranks))
}

/// 兑换目录路由（对未登录用户开放）
fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/catalog", get(catalog::list_catalog))
        .route("/catalog/{id}", get(catalog::get_product))
}

/// 兑换与订单路由
fn redemption_routes() -> Router<AppState> {
    Router::new()
        .route("/redeem", post(redemption::redeem))
        .route("/orders", get(redemption::list_orders))
        .route("/orders/{order_no}", get(redemption::get_order))
}

/// 兑换码领取路由
fn claim_routes() -> Router<AppState> {
    Router::new().route("/claim", post(claim::claim_code))
}

/// 成就路由
fn achievement_routes() -> Router<AppState> {
    Router::new().route("/achievements", get(achievement::list_achievements))
}

/// 邀请路由
fn referral_routes() -> Router<AppState> {
    Router::new().route("/referrals", get(referral::referral_summary))
}

/// 汇总全部 C端 API 路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(profile_routes())
        .merge(catalog_routes())
        .merge(redemption_routes())
        .merge(claim_routes())
        .merge(achievement_routes())
        .merge(referral_routes())
}
