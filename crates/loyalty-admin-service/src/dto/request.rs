//! B端服务请求 DTO 定义
//!
//! 所有 REST API 的请求体与查询参数结构

use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

/// 分页查询参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

fn default_per_user_limit() -> i32 {
    1
}

/// 管理员登录请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginRequest {
    #[validate(length(min = 1, max = 50, message = "用户名长度必须在 1-50 之间"))]
    pub username: String,
    #[validate(length(min = 1, max = 100, message = "密码长度必须在 1-100 之间"))]
    pub password: String,
}

/// 创建等级请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRankRequest {
    #[validate(length(min = 1, max = 50, message = "等级名称长度必须在 1-50 之间"))]
    pub name: String,
    #[validate(range(min = 0, message = "门槛积分不能为负数"))]
    pub points_required: i64,
    #[serde(default)]
    pub sort_order: i32,
    pub icon_url: Option<String>,
    /// 等级权益描述，自由 JSON
    pub perks: Option<serde_json::Value>,
}

/// 更新等级请求（缺省字段保持原值）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRankRequest {
    #[validate(length(min = 1, max = 50, message = "等级名称长度必须在 1-50 之间"))]
    pub name: Option<String>,
    #[validate(range(min = 0, message = "门槛积分不能为负数"))]
    pub points_required: Option<i64>,
    pub sort_order: Option<i32>,
    pub icon_url: Option<String>,
    pub perks: Option<serde_json::Value>,
}

/// 创建商品请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 100, message = "商品名称长度必须在 1-100 之间"))]
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[validate(range(min = 1, message = "兑换所需积分必须大于 0"))]
    pub cost_points: i64,
    /// 兑换所需最低等级（空表示不限制）
    pub required_rank_id: Option<i64>,
    /// 库存（空表示不限量）
    #[validate(range(min = 0, message = "库存不能为负数"))]
    pub stock: Option<i32>,
    pub metadata: Option<serde_json::Value>,
}

/// 更新商品请求（缺省字段保持原值）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 100, message = "商品名称长度必须在 1-100 之间"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[validate(range(min = 1, message = "兑换所需积分必须大于 0"))]
    pub cost_points: Option<i64>,
    pub required_rank_id: Option<i64>,
    #[validate(range(min = 0, message = "库存不能为负数"))]
    pub stock: Option<i32>,
    pub metadata: Option<serde_json::Value>,
}

/// 创建成就请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAchievementRequest {
    #[validate(length(min = 1, max = 50, message = "成就编码长度必须在 1-50 之间"))]
    pub code: String,
    #[validate(length(min = 1, max = 100, message = "成就名称长度必须在 1-100 之间"))]
    pub name: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    #[validate(range(min = 0, message = "奖励积分不能为负数"))]
    pub points_reward: i64,
    /// 解锁条件：{"trigger": "LIFETIME_POINTS"|"ORDER_COUNT"|"REFERRAL_COUNT", "threshold": n}
    pub criteria: serde_json::Value,
}

/// 更新成就请求（缺省字段保持原值）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAchievementRequest {
    #[validate(length(min = 1, max = 100, message = "成就名称长度必须在 1-100 之间"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    #[validate(range(min = 0, message = "奖励积分不能为负数"))]
    pub points_reward: Option<i64>,
    pub criteria: Option<serde_json::Value>,
}

/// 创建兑换码请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRewardCodeRequest {
    #[validate(length(min = 1, max = 64, message = "兑换码长度必须在 1-64 之间"))]
    pub code: String,
    #[validate(range(min = 1, message = "兑换码积分必须大于 0"))]
    pub points_value: i64,
    /// 全局可领取次数（空表示不限量）
    #[validate(range(min = 1, message = "全局可领取次数必须大于 0"))]
    pub max_claims: Option<i32>,
    /// 单用户可领取次数
    #[serde(default = "default_per_user_limit")]
    #[validate(range(min = 1, message = "单用户可领取次数必须大于 0"))]
    pub per_user_limit: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// 更新兑换码请求（缺省字段保持原值）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRewardCodeRequest {
    #[validate(range(min = 1, message = "兑换码积分必须大于 0"))]
    pub points_value: Option<i64>,
    #[validate(range(min = 1, message = "全局可领取次数必须大于 0"))]
    pub max_claims: Option<i32>,
    #[validate(range(min = 1, message = "单用户可领取次数必须大于 0"))]
    pub per_user_limit: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// 会员搜索参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSearchParams {
    /// 按邮箱或昵称模糊搜索
    pub keyword: Option<String>,
    /// 按状态过滤（active/suspended）
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

/// 会员积分调整请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdjustPointsBody {
    /// 有符号调整量，正数加分、负数减分
    pub delta: i64,
    #[validate(length(min = 1, max = 200, message = "调整原因长度必须在 1-200 之间"))]
    pub reason: String,
}

/// 会员状态变更请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberStatusBody {
    /// 目标状态：ACTIVE 或 SUSPENDED
    #[validate(length(min = 1, message = "状态不能为空"))]
    pub status: String,
}

/// 订单列表过滤参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListParams {
    pub user_id: Option<i64>,
    /// 按状态过滤（pending/completed/cancelled）
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

/// 取消订单请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderBody {
    #[validate(length(min = 1, max = 200, message = "取消原因长度必须在 1-200 之间"))]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_product_validation() {
        let valid = CreateProductRequest {
            name: "星巴克券".to_string(),
            description: None,
            image_url: None,
            cost_points: 500,
            required_rank_id: None,
            stock: Some(100),
            metadata: None,
        };
        assert!(valid.validate().is_ok());

        let zero_cost = CreateProductRequest {
            cost_points: 0,
            ..valid
        };
        assert!(zero_cost.validate().is_err());
    }

    #[test]
    fn test_create_reward_code_defaults() {
        let json = r#"{"code": "WELCOME100", "pointsValue": 100}"#;
        let req: CreateRewardCodeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.per_user_limit, 1);
        assert!(req.max_claims.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_pagination_defaults() {
        let params: PaginationParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, 20);
    }
}
