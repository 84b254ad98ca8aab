//! 积分运营管理后台（B端）
//!
//! 核心功能：
//! - 管理员认证：登录、登出、Token 刷新，支持失败锁定
//! - 等级管理：等级 CRUD，门槛唯一性与在用保护
//! - 商品管理：商品 CRUD 与上下架
//! - 成就管理：成就 CRUD 与上下线
//! - 兑换码管理：创建、调整与停用
//! - 会员管理：检索、详情、账本/订单查询、人工积分调整、冻结/解冻
//! - 订单管理：检索与取消退分
//! - 统计报表：运营总览
//!
//! 账务相关操作复用会员领域服务（loyalty-member），保证两端账务规则一致。

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{AdminError, Result};
pub use state::AppState;
