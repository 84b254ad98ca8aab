//! C端 API 处理器

pub mod achievement;
pub mod auth;
pub mod catalog;
pub mod claim;
pub mod profile;
pub mod redemption;
pub mod referral;
