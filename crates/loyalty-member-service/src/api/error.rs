//! HTTP 层错误类型
//!
//! 将领域错误映射为带 HTTP 状态码的统一 API 响应

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::error::LoyaltyError;

/// API 错误类型
#[derive(Debug, Error)]
pub enum ApiError {
    /// 领域错误，按变体映射状态码
    #[error("{0}")]
    Domain(#[from] LoyaltyError),

    /// 认证失败
    #[error("未授权: {0}")]
    Unauthorized(String),
}

/// API 层 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// 获取对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Domain(e) => domain_status(e),
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.error_code(),
            Self::Unauthorized(_) => "UNAUTHORIZED",
        }
    }

    /// 是否为系统内部错误（对外隐藏详情）
    pub fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// 领域错误到 HTTP 状态码的映射
///
/// 余额不足单独映射 402，客户端据此引导用户去赚取积分
fn domain_status(err: &LoyaltyError) -> StatusCode {
    match err {
        LoyaltyError::UserNotFound(_)
        | LoyaltyError::RankNotFound(_)
        | LoyaltyError::ProductNotFound(_)
        | LoyaltyError::OrderNotFound(_)
        | LoyaltyError::CodeNotFound(_)
        | LoyaltyError::AchievementNotFound(_) => StatusCode::NOT_FOUND,

        LoyaltyError::InsufficientPoints { .. } => StatusCode::PAYMENT_REQUIRED,

        LoyaltyError::InvalidCredentials => StatusCode::UNAUTHORIZED,

        LoyaltyError::UserSuspended(_) | LoyaltyError::RankRequirementNotMet { .. } => {
            StatusCode::FORBIDDEN
        }

        LoyaltyError::EmailTaken(_)
        | LoyaltyError::ProductInactive(_)
        | LoyaltyError::ProductOutOfStock(_)
        | LoyaltyError::InvalidOrderStatus { .. }
        | LoyaltyError::IdempotencyKeyConflict
        | LoyaltyError::CodeDisabled(_)
        | LoyaltyError::CodeNotStarted(_)
        | LoyaltyError::CodeExpired(_)
        | LoyaltyError::CodeExhausted(_)
        | LoyaltyError::CodeClaimLimitReached { .. }
        | LoyaltyError::ReferralExists(_)
        | LoyaltyError::ConcurrencyConflict => StatusCode::CONFLICT,

        LoyaltyError::InvalidAmount(_)
        | LoyaltyError::ReferralCodeInvalid(_)
        | LoyaltyError::SelfReferral
        | LoyaltyError::Validation(_) => StatusCode::BAD_REQUEST,

        LoyaltyError::Database(_)
        | LoyaltyError::Serialization(_)
        | LoyaltyError::Redis(_)
        | LoyaltyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统错误只返回统一提示，详情落日志
        let message = if self.is_internal() {
            tracing::error!(error = %self, "请求处理发生系统错误");
            "服务内部错误，请稍后重试".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": null
        });

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("字段 {} 校验失败", field))
                })
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::Domain(LoyaltyError::Validation(message))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Domain(LoyaltyError::Database(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 覆盖所有领域错误变体的映射样例
    fn all_domain_variants() -> Vec<LoyaltyError> {
        vec![
            LoyaltyError::UserNotFound(1),
            LoyaltyError::UserSuspended(1),
            LoyaltyError::EmailTaken("a@b.com".to_string()),
            LoyaltyError::InvalidCredentials,
            LoyaltyError::InsufficientPoints {
                required: 500,
                available: 120,
            },
            LoyaltyError::InvalidAmount("0".to_string()),
            LoyaltyError::RankNotFound(1),
            LoyaltyError::RankRequirementNotMet {
                required_rank: "黄金".to_string(),
            },
            LoyaltyError::ProductNotFound(1),
            LoyaltyError::ProductInactive(1),
            LoyaltyError::ProductOutOfStock(1),
            LoyaltyError::OrderNotFound("LO1".to_string()),
            LoyaltyError::InvalidOrderStatus {
                order_no: "LO1".to_string(),
                current_status: "cancelled".to_string(),
            },
            LoyaltyError::IdempotencyKeyConflict,
            LoyaltyError::CodeNotFound("X".to_string()),
            LoyaltyError::CodeDisabled("X".to_string()),
            LoyaltyError::CodeNotStarted("X".to_string()),
            LoyaltyError::CodeExpired("X".to_string()),
            LoyaltyError::CodeExhausted("X".to_string()),
            LoyaltyError::CodeClaimLimitReached {
                code: "X".to_string(),
                limit: 1,
            },
            LoyaltyError::ReferralCodeInvalid("X".to_string()),
            LoyaltyError::SelfReferral,
            LoyaltyError::ReferralExists(1),
            LoyaltyError::AchievementNotFound(1),
            LoyaltyError::Database(sqlx::Error::RowNotFound),
            LoyaltyError::Serialization(serde_json::from_str::<i64>("x").unwrap_err()),
            LoyaltyError::Redis("connection refused".to_string()),
            LoyaltyError::Internal("boom".to_string()),
            LoyaltyError::Validation("bad input".to_string()),
            LoyaltyError::ConcurrencyConflict,
        ]
    }

    #[test]
    fn test_status_code_mapping() {
        let cases = vec![
            (LoyaltyError::UserNotFound(1), StatusCode::NOT_FOUND),
            (
                LoyaltyError::InsufficientPoints {
                    required: 500,
                    available: 120,
                },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (LoyaltyError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (LoyaltyError::UserSuspended(1), StatusCode::FORBIDDEN),
            (
                LoyaltyError::RankRequirementNotMet {
                    required_rank: "黄金".to_string(),
                },
                StatusCode::FORBIDDEN,
            ),
            (
                LoyaltyError::EmailTaken("a@b.com".to_string()),
                StatusCode::CONFLICT,
            ),
            (LoyaltyError::ProductOutOfStock(1), StatusCode::CONFLICT),
            (LoyaltyError::IdempotencyKeyConflict, StatusCode::CONFLICT),
            (
                LoyaltyError::CodeExhausted("X".to_string()),
                StatusCode::CONFLICT,
            ),
            (LoyaltyError::SelfReferral, StatusCode::BAD_REQUEST),
            (
                LoyaltyError::Validation("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                LoyaltyError::Internal("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                LoyaltyError::Redis("down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let api_err = ApiError::Domain(err);
            assert_eq!(api_err.status_code(), expected, "错误: {}", api_err);
        }
    }

    #[test]
    fn test_all_variants_have_mapping() {
        // 每个变体都必须映射到 4xx/5xx，防止新增变体时遗漏
        for err in all_domain_variants() {
            let api_err = ApiError::Domain(err);
            let status = api_err.status_code();
            assert!(
                status.is_client_error() || status.is_server_error(),
                "错误 {} 映射到了非错误状态码 {}",
                api_err,
                status
            );
            assert!(!api_err.error_code().is_empty());
        }
    }

    #[test]
    fn test_internal_error_hides_detail() {
        let err = ApiError::Domain(LoyaltyError::Internal(
            "password_hash column corrupted".to_string(),
        ));
        assert!(err.is_internal());

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_business_error_keeps_detail() {
        let err = ApiError::Domain(LoyaltyError::InsufficientPoints {
            required: 500,
            available: 120,
        });
        assert!(!err.is_internal());
        assert_eq!(err.error_code(), "INSUFFICIENT_POINTS");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn test_validation_errors_conversion() {
        use validator::Validate;

        #[derive(Validate)]
        struct Input {
            #[validate(length(min = 8, message = "密码长度至少 8 位"))]
            password: String,
        }

        let input = Input {
            password: "short".to_string(),
        };
        let err: ApiError = input.validate().unwrap_err().into();

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("密码长度至少 8 位"));
    }

    #[test]
    fn test_unauthorized() {
        let err = ApiError::Unauthorized("缺少认证 Token".to_string());
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.error_code(), "UNAUTHORIZED");
    }
}
