//! 会员积分服务（C端）
//!
//! 提供会员注册登录、积分账户、等级、兑换码领取、商品兑换、
//! 邀请与成就等 C 端功能。
//!
//! ## 核心功能
//!
//! - **账户与等级**：注册登录、档案查询、累计积分驱动的等级体系
//! - **积分发放**：带幂等键的事务性积分入账与账本流水
//! - **兑换码领取**：时间窗口、全局余量与单用户上限控制
//! - **商品兑换**：等级门槛、余额与库存校验，幂等下单与订单取消退回
//! - **邀请关系**：注册登记邀请，首次入账完成关系并发放双方奖励
//! - **成就体系**：累计积分/兑换次数/邀请数维度的成就解锁与奖励
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `repository`: 数据库仓储层
//! - `service`: 业务服务层
//! - `auth`: JWT 与密码处理
//! - `api`: HTTP API 层（路由、中间件、处理器）

pub mod api;
pub mod auth;
pub mod error;
pub mod models;
pub mod repository;
pub mod service;

pub use error::{LoyaltyError, Result};
pub use models::*;
pub use repository::{
    AchievementRepository, LedgerRepository, OrderRepository, ProductRepository, RankRepository,
    ReferralRepository, RewardCodeRepository, UserRepository,
};
pub use service::{
    AchievementEvaluator, ClaimService, PointsService, QueryService, RedemptionService,
    ReferralService, dto,
};
