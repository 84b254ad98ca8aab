//! 管理后台 API 处理器

pub mod achievement;
pub mod auth;
pub mod member;
pub mod order;
pub mod product;
pub mod rank;
pub mod reward_code;
pub mod stats;
