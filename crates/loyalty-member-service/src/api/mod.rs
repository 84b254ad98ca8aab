//! C端 HTTP API 层
//!
//! 统一响应信封、错误映射、认证中间件与各业务处理器

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, Result};
pub use state::AppState;
