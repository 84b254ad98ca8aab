//! 管理后台路由定义

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::handlers;
use crate::state::AppState;

/// 认证路由
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::get_current_user))
        .route("/auth/refresh", post(handlers::auth::refresh_token))
}

/// 等级管理路由
fn rank_routes() -> Router<AppState> {
    Router::new()
        .route("/ranks", post(handlers::rank::create_rank))
        .route("/ranks", get(handlers::rank::list_ranks))
        .route("/ranks/{id}", get(handlers::rank::get_rank))
        .route("/ranks/{id}", put(handlers::rank::update_rank))
        .route("/ranks/{id}", delete(handlers::rank::delete_rank))
}

/// 商品管理路由
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(handlers::product::create_product))
        .route("/products", get(handlers::product::list_products))
        .route("/products/{id}", get(handlers::product::get_product))
        .route("/products/{id}", put(handlers::product::update_product))
        .route(
            "/products/{id}/publish",
            post(handlers::product::publish_product),
        )
        .route(
            "/products/{id}/offline",
            post(handlers::product::offline_product),
        )
}

/// 成就管理路由
fn achievement_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/achievements",
            post(handlers::achievement::create_achievement),
        )
        .route(
            "/achievements",
            get(handlers::achievement::list_achievements),
        )
        .route(
            "/achievements/{id}",
            get(handlers::achievement::get_achievement),
        )
        .route(
            "/achievements/{id}",
            put(handlers::achievement::update_achievement),
        )
        .route(
            "/achievements/{id}/publish",
            post(handlers::achievement::publish_achievement),
        )
        .route(
            "/achievements/{id}/offline",
            post(handlers::achievement::offline_achievement),
        )
}

/// 兑换码管理路由
fn reward_code_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/reward-codes",
            post(handlers::reward_code::create_reward_code),
        )
        .route(
            "/reward-codes",
            get(handlers::reward_code::list_reward_codes),
        )
        .route(
            "/reward-codes/{id}",
            get(handlers::reward_code::get_reward_code),
        )
        .route(
            "/reward-codes/{id}",
            put(handlers::reward_code::update_reward_code),
        )
        .route(
            "/reward-codes/{id}/disable",
            post(handlers::reward_code::disable_reward_code),
        )
}

/// 会员管理路由
fn member_routes() -> Router<AppState> {
    Router::new()
        .route("/members", get(handlers::member::search_members))
        .route("/members/{id}", get(handlers::member::get_member))
        .route(
            "/members/{id}/ledger",
            get(handlers::member::get_member_ledger),
        )
        .route(
            "/members/{id}/orders",
            get(handlers::member::get_member_orders),
        )
        .route(
            "/members/{id}/points",
            post(handlers::member::adjust_member_points),
        )
        .route(
            "/members/{id}/status",
            put(handlers::member::update_member_status),
        )
}

/// 订单管理路由
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(handlers::order::list_orders))
        .route("/orders/{order_no}", get(handlers::order::get_order))
        .route(
            "/orders/{order_no}/cancel",
            post(handlers::order::cancel_order),
        )
}

/// 统计报表路由
fn stats_routes() -> Router<AppState> {
    Router::new().route("/stats/overview", get(handlers::stats::get_overview))
}

/// 组装全部管理后台 API 路由
///
/// 调用方负责挂载到 /api/admin 前缀下
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(rank_routes())
        .merge(product_routes())
        .merge(achievement_routes())
        .merge(reward_code_routes())
        .merge(member_routes())
        .merge(order_routes())
        .merge(stats_routes())
}
