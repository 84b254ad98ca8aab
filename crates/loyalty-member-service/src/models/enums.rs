//! 积分服务枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 用户状态
///
/// 控制用户账号是否可以登录和参与积分活动
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum UserStatus {
    /// 正常 - 可登录、可积分、可兑换
    #[default]
    Active,
    /// 已冻结 - 禁止积分变动和兑换，历史数据保留
    Suspended,
}

/// 商品状态（运营侧）
///
/// 控制商品是否在兑换目录中展示和可兑换
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum ProductStatus {
    /// 草稿 - 配置中，不对用户展示
    #[default]
    Draft,
    /// 已上架 - 正常展示和兑换
    Active,
    /// 已下架 - 停止兑换，历史订单不受影响
    Inactive,
}

/// 兑换订单状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum OrderStatus {
    /// 待处理 - 订单已创建，等待执行
    #[default]
    Pending,
    /// 已完成 - 扣分和库存均已落账
    Completed,
    /// 已取消 - 运营取消，积分已退回
    Cancelled,
}

/// 积分账本变动类型
///
/// 采用复式记账思想，记录余额的每一次变动；
/// 账本行的 amount 恒为正数，方向由类型的 sign 决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    /// 获取（+）- 扫码领取、活动发放等常规积分获取
    Earn,
    /// 兑换消耗（-）- 兑换商品扣除
    RedeemOut,
    /// 兑换退回（+）- 订单取消后的积分退回
    RedeemRefund,
    /// 运营调增（+）- 后台人工加分
    AdjustIn,
    /// 运营调减（-）- 后台人工减分
    AdjustOut,
    /// 邀请奖励（+）- 邀请关系完成后双方获得的奖励
    ReferralBonus,
    /// 成就奖励（+）- 解锁成就附带的积分奖励
    AchievementBonus,
}

impl ChangeType {
    /// 返回该变动类型的余额符号
    /// 正数表示增加，负数表示减少
    pub fn sign(&self) -> i64 {
        match self {
            Self::Earn
            | Self::RedeemRefund
            | Self::AdjustIn
            | Self::ReferralBonus
            | Self::AchievementBonus => 1,
            Self::RedeemOut | Self::AdjustOut => -1,
        }
    }

    /// 判断该变动是否计入累计积分
    ///
    /// 累计积分只增不减：兑换退回只恢复余额，不重复累计
    pub fn affects_lifetime(&self) -> bool {
        matches!(
            self,
            Self::Earn | Self::AdjustIn | Self::ReferralBonus | Self::AchievementBonus
        )
    }
}

/// 来源/关联类型
///
/// 标识积分变动的触发来源，用于追溯和审计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    /// 兑换码领取 - 用户扫码/输码
    CodeClaim,
    /// 兑换 - 兑换流程产生（扣分或退回）
    Redemption,
    /// 邀请 - 邀请关系完成触发
    Referral,
    /// 成就 - 成就解锁触发
    Achievement,
    /// 手动 - 运营后台操作
    Manual,
    /// 系统操作 - 系统自动处理
    #[default]
    System,
}

impl SourceType {
    /// 指标标签用的字符串形式
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeClaim => "code_claim",
            Self::Redemption => "redemption",
            Self::Referral => "referral",
            Self::Achievement => "achievement",
            Self::Manual => "manual",
            Self::System => "system",
        }
    }
}

/// 成就状态（运营侧）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum AchievementStatus {
    /// 草稿 - 配置中，不参与评估
    #[default]
    Draft,
    /// 已上线 - 参与自动评估和展示
    Active,
    /// 已下线 - 停止评估，已解锁的仍可展示
    Inactive,
}

/// 成就触发维度
///
/// 决定成就评估时比对哪项用户指标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AchievementTrigger {
    /// 累计积分达标
    LifetimePoints,
    /// 完成兑换订单数达标
    OrderCount,
    /// 成功邀请人数达标
    ReferralCount,
}

impl AchievementTrigger {
    /// criteria JSON 中存储的字符串形式
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LifetimePoints => "LIFETIME_POINTS",
            Self::OrderCount => "ORDER_COUNT",
            Self::ReferralCount => "REFERRAL_COUNT",
        }
    }
}

/// 邀请关系状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum ReferralStatus {
    /// 待完成 - 被邀请人已注册但尚未获得首笔积分
    #[default]
    Pending,
    /// 已完成 - 双方奖励已发放
    Completed,
}

/// 兑换码状态（运营侧）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum RewardCodeStatus {
    /// 启用 - 窗口期内可领取
    #[default]
    Active,
    /// 已停用 - 运营手动停用
    Disabled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_type_sign() {
        assert_eq!(ChangeType::Earn.sign(), 1);
        assert_eq!(ChangeType::RedeemOut.sign(), -1);
        assert_eq!(ChangeType::RedeemRefund.sign(), 1);
        assert_eq!(ChangeType::AdjustOut.sign(), -1);
        assert_eq!(ChangeType::ReferralBonus.sign(), 1);
        assert_eq!(ChangeType::AchievementBonus.sign(), 1);
    }

    #[test]
    fn test_change_type_affects_lifetime() {
        // 累计积分只增不减
        assert!(ChangeType::Earn.affects_lifetime());
        assert!(ChangeType::AdjustIn.affects_lifetime());
        assert!(ChangeType::ReferralBonus.affects_lifetime());
        assert!(ChangeType::AchievementBonus.affects_lifetime());

        // 退回和扣减不影响累计
        assert!(!ChangeType::RedeemRefund.affects_lifetime());
        assert!(!ChangeType::RedeemOut.affects_lifetime());
        assert!(!ChangeType::AdjustOut.affects_lifetime());
    }

    #[test]
    fn test_change_type_serialization() {
        assert_eq!(
            serde_json::to_string(&ChangeType::RedeemOut).unwrap(),
            "\"REDEEM_OUT\""
        );
        assert_eq!(
            serde_json::from_str::<ChangeType>("\"ACHIEVEMENT_BONUS\"").unwrap(),
            ChangeType::AchievementBonus
        );
    }

    #[test]
    fn test_achievement_trigger_serialization() {
        assert_eq!(
            serde_json::to_string(&AchievementTrigger::LifetimePoints).unwrap(),
            "\"LIFETIME_POINTS\""
        );
        assert_eq!(
            serde_json::from_str::<AchievementTrigger>("\"REFERRAL_COUNT\"").unwrap(),
            AchievementTrigger::ReferralCount
        );
    }

    #[test]
    fn test_status_defaults() {
        assert_eq!(UserStatus::default(), UserStatus::Active);
        assert_eq!(ProductStatus::default(), ProductStatus::Draft);
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(ReferralStatus::default(), ReferralStatus::Pending);
        assert_eq!(RewardCodeStatus::default(), RewardCodeStatus::Active);
    }
}
