//! 管理后台认证模块
//!
//! 提供 JWT Token 管理和密码哈希功能

mod jwt;
mod password;

pub use jwt::{Claims, JwtConfig, JwtManager};
pub use password::{hash_password, verify_password};
