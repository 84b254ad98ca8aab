//! 数据库仓储层
//!
//! 提供所有实体的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 使用 SQLx 进行类型安全的数据库操作
//! - 事务控制由调用方（服务层）决定，`*_in_tx` 方法在调用方事务内执行
//! - 定义 trait 接口以支持 mock 测试

mod achievement_repo;
mod ledger_repo;
mod order_repo;
mod product_repo;
mod rank_repo;
mod referral_repo;
mod reward_code_repo;
mod traits;
mod user_repo;

pub use achievement_repo::AchievementRepository;
pub use ledger_repo::LedgerRepository;
pub use order_repo::OrderRepository;
pub use product_repo::ProductRepository;
pub use rank_repo::RankRepository;
pub use referral_repo::ReferralRepository;
pub use reward_code_repo::RewardCodeRepository;
pub use traits::*;
pub use user_repo::UserRepository;
