//! 成就实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::{AchievementStatus, AchievementTrigger};

/// 成就解锁条件
///
/// 嵌入在 Achievement 的 criteria 字段中（JSON）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementCriteria {
    /// 触发维度
    pub trigger: AchievementTrigger,
    /// 达标阈值
    pub threshold: i64,
}

/// 成就定义
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: i64,
    /// 业务唯一编码，用于日志追踪和外部对接
    pub code: String,
    /// 成就名称
    pub name: String,
    /// 成就描述
    #[sqlx(default)]
    pub description: Option<String>,
    /// 成就图标 URL
    #[sqlx(default)]
    pub icon_url: Option<String>,
    /// 解锁附带的积分奖励（0 表示无奖励）
    pub points_reward: i64,
    /// 解锁条件（JSON）
    /// 存储 AchievementCriteria 结构
    pub criteria: Value,
    /// 成就状态
    pub status: AchievementStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Achievement {
    /// 解析解锁条件
    pub fn parse_criteria(&self) -> Result<AchievementCriteria, serde_json::Error> {
        serde_json::from_value(self.criteria.clone())
    }
}

/// 用户成就解锁记录
///
/// user_id + achievement_id 唯一，成就只解锁一次
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievement {
    pub id: i64,
    pub user_id: i64,
    pub achievement_id: i64,
    pub unlocked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_criteria() {
        let achievement = Achievement {
            id: 1,
            code: "FIRST_1000".to_string(),
            name: "First Thousand".to_string(),
            description: None,
            icon_url: None,
            points_reward: 100,
            criteria: json!({"trigger": "LIFETIME_POINTS", "threshold": 1000}),
            status: AchievementStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let criteria = achievement.parse_criteria().unwrap();
        assert_eq!(criteria.trigger, AchievementTrigger::LifetimePoints);
        assert_eq!(criteria.threshold, 1000);
    }

    #[test]
    fn test_parse_criteria_invalid() {
        let achievement = Achievement {
            id: 1,
            code: "BROKEN".to_string(),
            name: "Broken".to_string(),
            description: None,
            icon_url: None,
            points_reward: 0,
            criteria: json!({"trigger": "UNKNOWN_DIMENSION", "threshold": 1}),
            status: AchievementStatus::Draft,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(achievement.parse_criteria().is_err());
    }
}
