//! B端 API DTO 定义

mod request;
mod response;

pub use request::*;
pub use response::*;
