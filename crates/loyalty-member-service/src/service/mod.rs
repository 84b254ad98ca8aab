//! 业务服务层
//!
//! 编排仓储与缓存完成完整业务流程，事务边界在此层控制

pub mod achievement_service;
pub mod claim_service;
pub mod dto;
pub mod points_service;
pub mod query_service;
pub mod redemption_service;
pub mod referral_service;

pub use achievement_service::{AchievementEvaluator, PointsGranter};
pub use claim_service::ClaimService;
pub use points_service::PointsService;
pub use query_service::QueryService;
pub use redemption_service::RedemptionService;
pub use referral_service::ReferralService;
