//! 积分服务领域模型
//!
//! 包含积分体系的所有核心实体定义

pub mod achievement;
pub mod enums;
pub mod order;
pub mod product;
pub mod rank;
pub mod referral;
pub mod reward_code;
pub mod user;

// 重新导出常用类型
pub use achievement::{Achievement, AchievementCriteria, UserAchievement};
pub use enums::{
    AchievementStatus, AchievementTrigger, ChangeType, OrderStatus, ProductStatus, ReferralStatus,
    RewardCodeStatus, SourceType, UserStatus,
};
pub use order::{Order, PointsLedger, generate_order_no};
pub use product::Product;
pub use rank::{Rank, next_rank, pick_rank};
pub use referral::Referral;
pub use reward_code::{RewardCode, RewardCodeClaim};
pub use user::{User, generate_referral_code};
