//! 统计报表 API 处理器
//!
//! 基于 users、points_ledger 和 orders 表聚合计算运营总览。
//! 积分发放/消耗按账本变动类型的符号区分。

use axum::{Json, extract::State};
use tracing::instrument;

use crate::dto::{ApiResponse, StatsOverview};
use crate::error::Result;
use crate::state::AppState;

/// 统计总览
///
/// GET /api/admin/stats/overview
///
/// 返回会员规模、积分发放/消耗总量与当日订单数据
#[instrument(skip(state))]
pub async fn get_overview(State(state): State<AppState>) -> Result<Json<ApiResponse<StatsOverview>>> {
    let member_counts: (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE status = 'active')
        FROM users
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    // 发放 = 所有加分类型，消耗 = 兑换扣分；退回不计入消耗
    let ledger_totals: (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(amount) FILTER (WHERE change_type IN
                ('EARN', 'ADJUST_IN', 'REFERRAL_BONUS', 'ACHIEVEMENT_BONUS')), 0),
            COALESCE(SUM(amount) FILTER (WHERE change_type = 'REDEEM_OUT'), 0)
        FROM points_ledger
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    let order_counts: (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE DATE(created_at) = CURRENT_DATE)
        FROM orders
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    let today_issued: (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(amount) FILTER (WHERE change_type IN
            ('EARN', 'ADJUST_IN', 'REFERRAL_BONUS', 'ACHIEVEMENT_BONUS')), 0)
        FROM points_ledger
        WHERE DATE(created_at) = CURRENT_DATE
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    let overview = StatsOverview {
        total_members: member_counts.0,
        active_members: member_counts.1,
        total_points_issued: ledger_totals.0,
        total_points_redeemed: ledger_totals.1,
        total_orders: order_counts.0,
        today_orders: order_counts.1,
        today_points_issued: today_issued.0,
    };

    Ok(Json(ApiResponse::success(overview)))
}
