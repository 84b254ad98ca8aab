//! B端管理后台错误类型定义
//!
//! 包含所有 admin service 特有的错误类型

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use loyalty_member::LoyaltyError;

/// B端管理后台错误类型
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    // 认证错误
    #[error("未授权: {0}")]
    Unauthorized(String),
    #[error("禁止访问: {0}")]
    Forbidden(String),
    #[error("用户名或密码错误")]
    InvalidCredentials,
    #[error("管理员账号已被禁用")]
    AccountDisabled,
    #[error("管理员账号已被锁定，请稍后重试")]
    AccountLocked,
    #[error("管理员不存在: {0}")]
    AdminNotFound(String),

    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    // 资源不存在
    #[error("等级不存在: {0}")]
    RankNotFound(i64),
    #[error("商品不存在: {0}")]
    ProductNotFound(i64),
    #[error("成就不存在: {0}")]
    AchievementNotFound(i64),
    #[error("兑换码不存在: {0}")]
    CodeNotFound(i64),
    #[error("会员不存在: {0}")]
    MemberNotFound(i64),
    #[error("兑换订单不存在: {0}")]
    OrderNotFound(String),
    #[error("资源不存在: {0}")]
    NotFound(String),

    // 业务错误
    #[error("等级门槛已被占用: {0}")]
    DuplicateRankThreshold(i64),
    #[error("等级仍被会员或商品引用，无法删除: {0}")]
    RankInUse(i64),
    #[error("兑换码已存在: {0}")]
    DuplicateCode(String),
    #[error("成就编码已存在: {0}")]
    DuplicateAchievementCode(String),
    #[error("会员积分余额不足: 需要 {required}, 可用 {available}")]
    InsufficientPoints { required: i64, available: i64 },
    #[error("订单状态不允许此操作: order_no={order_no}, current_status={current_status}")]
    InvalidOrderStatus {
        order_no: String,
        current_status: String,
    },
    #[error("并发冲突，请重试")]
    ConcurrencyConflict,

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Redis错误: {0}")]
    Redis(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AdminError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 认证错误
            Self::Unauthorized(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::AccountDisabled | Self::AccountLocked => {
                StatusCode::FORBIDDEN
            }
            Self::AdminNotFound(_) => StatusCode::NOT_FOUND,

            Self::Validation(_) => StatusCode::BAD_REQUEST,

            Self::RankNotFound(_)
            | Self::ProductNotFound(_)
            | Self::AchievementNotFound(_)
            | Self::CodeNotFound(_)
            | Self::MemberNotFound(_)
            | Self::OrderNotFound(_)
            | Self::NotFound(_) => StatusCode::NOT_FOUND,

            // 余额不足沿用 C端语义，对外 402
            Self::InsufficientPoints { .. } => StatusCode::PAYMENT_REQUIRED,

            Self::DuplicateRankThreshold(_)
            | Self::RankInUse(_)
            | Self::DuplicateCode(_)
            | Self::DuplicateAchievementCode(_)
            | Self::InvalidOrderStatus { .. }
            | Self::ConcurrencyConflict => StatusCode::CONFLICT,

            Self::Database(_) | Self::Redis(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            // 认证错误
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::AccountDisabled => "ACCOUNT_DISABLED",
            Self::AccountLocked => "ACCOUNT_LOCKED",
            Self::AdminNotFound(_) => "ADMIN_NOT_FOUND",

            Self::Validation(_) => "VALIDATION_ERROR",
            Self::RankNotFound(_) => "RANK_NOT_FOUND",
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::AchievementNotFound(_) => "ACHIEVEMENT_NOT_FOUND",
            Self::CodeNotFound(_) => "CODE_NOT_FOUND",
            Self::MemberNotFound(_) => "MEMBER_NOT_FOUND",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::NotFound(_) => "NOT_FOUND",
            Self::DuplicateRankThreshold(_) => "DUPLICATE_RANK_THRESHOLD",
            Self::RankInUse(_) => "RANK_IN_USE",
            Self::DuplicateCode(_) => "DUPLICATE_CODE",
            Self::DuplicateAchievementCode(_) => "DUPLICATE_ACHIEVEMENT_CODE",
            Self::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            Self::InvalidOrderStatus { .. } => "INVALID_ORDER_STATUS",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Redis(_) => "REDIS_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志，防止信息泄露
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Redis(e) => {
                tracing::error!(error = %e, "Redis 操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for AdminError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 从 JSON 序列化错误转换
impl From<serde_json::Error> for AdminError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON 处理错误: {}", err))
    }
}

/// 从会员服务的领域错误转换
///
/// 管理后台复用积分调整与订单取消等下游服务，
/// 显式映射保证「资源不存在」「余额不足」等语义不丢失。
impl From<LoyaltyError> for AdminError {
    fn from(err: LoyaltyError) -> Self {
        match err {
            LoyaltyError::Database(e) => Self::Database(e),
            LoyaltyError::UserNotFound(id) => Self::MemberNotFound(id),
            LoyaltyError::UserSuspended(id) => Self::Forbidden(format!("会员已冻结: {}", id)),
            LoyaltyError::RankNotFound(id) => Self::RankNotFound(id),
            LoyaltyError::ProductNotFound(id) => Self::ProductNotFound(id),
            LoyaltyError::AchievementNotFound(id) => Self::AchievementNotFound(id),
            LoyaltyError::OrderNotFound(no) => Self::OrderNotFound(no),
            LoyaltyError::InvalidOrderStatus {
                order_no,
                current_status,
            } => Self::InvalidOrderStatus {
                order_no,
                current_status,
            },
            LoyaltyError::InsufficientPoints {
                required,
                available,
            } => Self::InsufficientPoints {
                required,
                available,
            },
            LoyaltyError::InvalidAmount(msg) | LoyaltyError::Validation(msg) => {
                Self::Validation(msg)
            }
            LoyaltyError::ConcurrencyConflict => Self::ConcurrencyConflict,
            other => Self::Internal(other.to_string()),
        }
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, AdminError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    // ---- 辅助函数 ----

    /// 构造所有错误变体及其期望的 (StatusCode, error_code) 映射。
    /// 使用表驱动方式避免逐个变体写重复断言，同时保证新增变体时只需在一处维护。
    fn all_error_variants() -> Vec<(AdminError, StatusCode, &'static str)> {
        vec![
            // 认证 & 权限类：这些错误直接决定用户能否继续操作，状态码必须精确
            (AdminError::Unauthorized("token expired".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (AdminError::Forbidden("no permission".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (AdminError::InvalidCredentials, StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            (AdminError::AccountDisabled, StatusCode::FORBIDDEN, "ACCOUNT_DISABLED"),
            (AdminError::AccountLocked, StatusCode::FORBIDDEN, "ACCOUNT_LOCKED"),
            (AdminError::AdminNotFound("admin".into()), StatusCode::NOT_FOUND, "ADMIN_NOT_FOUND"),
            // 参数校验
            (AdminError::Validation("name is required".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            // 资源不存在类：前端依赖 404 做条件跳转，错误码用于区分具体缺失资源
            (AdminError::RankNotFound(10), StatusCode::NOT_FOUND, "RANK_NOT_FOUND"),
            (AdminError::ProductNotFound(20), StatusCode::NOT_FOUND, "PRODUCT_NOT_FOUND"),
            (AdminError::AchievementNotFound(30), StatusCode::NOT_FOUND, "ACHIEVEMENT_NOT_FOUND"),
            (AdminError::CodeNotFound(40), StatusCode::NOT_FOUND, "CODE_NOT_FOUND"),
            (AdminError::MemberNotFound(50), StatusCode::NOT_FOUND, "MEMBER_NOT_FOUND"),
            (AdminError::OrderNotFound("LO1".into()), StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
            (AdminError::NotFound("some resource".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            // 余额不足：独立的 402，客户端据此提示会员先赚取积分
            (
                AdminError::InsufficientPoints { required: 500, available: 120 },
                StatusCode::PAYMENT_REQUIRED,
                "INSUFFICIENT_POINTS",
            ),
            // 业务冲突类：409 表示请求合法但与当前状态冲突
            (AdminError::DuplicateRankThreshold(1000), StatusCode::CONFLICT, "DUPLICATE_RANK_THRESHOLD"),
            (AdminError::RankInUse(3), StatusCode::CONFLICT, "RANK_IN_USE"),
            (AdminError::DuplicateCode("WELCOME100".into()), StatusCode::CONFLICT, "DUPLICATE_CODE"),
            (AdminError::DuplicateAchievementCode("first_order".into()), StatusCode::CONFLICT, "DUPLICATE_ACHIEVEMENT_CODE"),
            (
                AdminError::InvalidOrderStatus { order_no: "LO1".into(), current_status: "cancelled".into() },
                StatusCode::CONFLICT,
                "INVALID_ORDER_STATUS",
            ),
            (AdminError::ConcurrencyConflict, StatusCode::CONFLICT, "CONCURRENCY_CONFLICT"),
            // 系统级错误：统一 500，防止内部实现细节泄露
            (AdminError::Redis("connection refused".into()), StatusCode::INTERNAL_SERVER_ERROR, "REDIS_ERROR"),
            (AdminError::Internal("unexpected state".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ]
    }

    // ---- 表驱动：全量 status_code 覆盖 ----

    /// 确保每个错误变体都映射到正确的 HTTP 状态码。
    /// 状态码错误会导致前端误判请求结果（如把 403 当 500 处理），所以需要逐一验证。
    #[test]
    fn test_all_variants_status_code() {
        for (error, expected_status, label) in all_error_variants() {
            assert_eq!(
                error.status_code(),
                expected_status,
                "状态码不匹配: variant={label}"
            );
        }
    }

    // ---- 表驱动：全量 error_code 覆盖 ----

    /// 错误码是 API 契约的一部分，客户端用它做条件分支。
    /// 任何错误码变更都是破坏性变更，必须逐一锁定。
    #[test]
    fn test_all_variants_error_code() {
        for (error, _status, expected_code) in all_error_variants() {
            assert_eq!(
                error.error_code(),
                expected_code,
                "错误码不匹配: expected={expected_code}"
            );
        }
    }

    // ---- Display trait 测试 ----

    /// Display 输出直接作为 API 响应的 message 字段返回给用户，
    /// 必须包含关键上下文（如 ID、订单号），否则用户无法定位问题。
    #[test]
    fn test_display_contains_context_for_parameterized_variants() {
        assert!(AdminError::Unauthorized("expired".into()).to_string().contains("expired"));
        assert!(AdminError::AdminNotFound("alice".into()).to_string().contains("alice"));
        assert!(AdminError::Validation("email invalid".into()).to_string().contains("email invalid"));
        assert!(AdminError::OrderNotFound("LO42".into()).to_string().contains("LO42"));
        assert!(AdminError::DuplicateCode("SPRING".into()).to_string().contains("SPRING"));
        assert!(AdminError::Redis("timeout".into()).to_string().contains("timeout"));

        assert!(AdminError::RankNotFound(42).to_string().contains("42"));
        assert!(AdminError::ProductNotFound(99).to_string().contains("99"));
        assert!(AdminError::MemberNotFound(7).to_string().contains("7"));

        let err = AdminError::InsufficientPoints {
            required: 500,
            available: 120,
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("120"));
    }

    // ---- IntoResponse 测试 ----

    /// IntoResponse 是错误到 HTTP 响应的最终出口。
    /// 必须验证：状态码正确、响应体结构完整（success/code/message/data 四字段），
    /// 否则前端解析会崩溃。
    #[tokio::test]
    async fn test_into_response_body_structure() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let label = format!("{:?}", error);
            let response = error.into_response();

            assert_eq!(
                response.status(),
                expected_status,
                "响应状态码不匹配: {label}"
            );

            let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("读取响应体失败");
            let body: serde_json::Value =
                serde_json::from_slice(&body_bytes).expect("响应体不是合法 JSON");

            // 四个字段必须存在
            assert_eq!(body["success"], json!(false), "success 字段应为 false: {label}");
            assert_eq!(body["code"], json!(expected_code), "code 字段不匹配: {label}");
            assert!(body.get("message").is_some(), "缺少 message 字段: {label}");
            assert!(!body["message"].as_str().unwrap_or("").is_empty(), "message 不应为空: {label}");
            assert!(body.get("data").is_some(), "缺少 data 字段: {label}");
            assert!(body["data"].is_null(), "data 字段应为 null: {label}");
        }
    }

    /// 系统级错误（Database/Redis/Internal）的响应消息不应泄露内部细节，
    /// 只返回通用提示。这是安全要求，防止攻击者通过错误消息探测系统架构。
    #[tokio::test]
    async fn test_system_errors_hide_internal_details() {
        let system_errors: Vec<(AdminError, &str)> = vec![
            (AdminError::Redis("redis://10.0.0.1:6379 connection refused".into()), "redis://10.0.0.1:6379"),
            (AdminError::Internal("stack overflow at module X".into()), "stack overflow"),
        ];

        for (error, leaked_detail) in system_errors {
            let response = error.into_response();
            let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("读取响应体失败");
            let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
            let message = body["message"].as_str().unwrap();

            // 响应消息中不应包含内部错误详情
            assert!(
                !message.contains(leaked_detail),
                "系统错误消息泄露了内部细节: message={message}, leaked={leaked_detail}"
            );
            // 应返回统一的通用提示
            assert!(
                message.contains("服务内部错误"),
                "系统错误应返回通用提示，实际: {message}"
            );
        }
    }

    /// 业务错误的响应消息应保留原始描述，帮助用户理解问题
    #[tokio::test]
    async fn test_business_errors_preserve_display_message() {
        let business_errors: Vec<(AdminError, &str)> = vec![
            (AdminError::Unauthorized("token expired".into()), "token expired"),
            (AdminError::Forbidden("需要超级管理员权限".into()), "需要超级管理员权限"),
            (AdminError::ProductNotFound(42), "42"),
            (AdminError::Validation("name is required".into()), "name is required"),
        ];

        for (error, expected_fragment) in business_errors {
            let response = error.into_response();
            let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("读取响应体失败");
            let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
            let message = body["message"].as_str().unwrap();

            assert!(
                message.contains(expected_fragment),
                "业务错误消息应包含上下文: message={message}, expected_fragment={expected_fragment}"
            );
        }
    }

    // ---- From<validator::ValidationErrors> 转换测试 ----

    /// validator 是请求参数校验的统一入口，转换必须把字段级错误信息带入 AdminError，
    /// 否则用户无法知道哪个字段校验失败。
    #[test]
    fn test_from_validation_errors() {
        use validator::{ValidationError, ValidationErrors};

        let mut errors = ValidationErrors::new();
        let mut field_error = ValidationError::new("length");
        field_error.message = Some("名称长度不能超过 50 个字符".into());
        errors.add("name", field_error);

        let admin_error: AdminError = errors.into();
        match &admin_error {
            AdminError::Validation(msg) => {
                assert!(msg.contains("name"), "转换后应保留字段名: {msg}");
            }
            other => panic!("期望 Validation 变体，实际: {:?}", other),
        }

        // 转换后的状态码和错误码也必须正确
        assert_eq!(admin_error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(admin_error.error_code(), "VALIDATION_ERROR");
    }

    // ---- From<LoyaltyError> 转换测试 ----

    /// 会员服务是下游核心服务，错误转换逻辑决定了管理后台能否正确区分
    /// 「资源不存在」「余额不足」和「系统故障」。映射错误会导致误导性提示。
    #[test]
    fn test_from_loyalty_error_mapped_variants() {
        let err: AdminError = LoyaltyError::UserNotFound(100).into();
        assert!(matches!(err, AdminError::MemberNotFound(100)));

        let err: AdminError = LoyaltyError::ProductNotFound(200).into();
        assert!(matches!(err, AdminError::ProductNotFound(200)));

        let err: AdminError = LoyaltyError::OrderNotFound("LO300".into()).into();
        assert!(matches!(err, AdminError::OrderNotFound(ref no) if no == "LO300"));

        let err: AdminError = LoyaltyError::ConcurrencyConflict.into();
        assert!(matches!(err, AdminError::ConcurrencyConflict));

        let err: AdminError = LoyaltyError::Validation("amount too big".into()).into();
        match err {
            AdminError::Validation(msg) => assert!(msg.contains("amount too big")),
            other => panic!("期望 Validation，实际: {:?}", other),
        }
    }

    /// 余额不足必须穿透为 402，这是与 C端一致的 API 契约
    #[test]
    fn test_from_loyalty_error_insufficient_points_passthrough() {
        let err: AdminError = LoyaltyError::InsufficientPoints {
            required: 500,
            available: 120,
        }
        .into();

        assert!(matches!(
            err,
            AdminError::InsufficientPoints {
                required: 500,
                available: 120
            }
        ));
        assert_eq!(err.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(err.error_code(), "INSUFFICIENT_POINTS");
    }

    /// 未在映射表中显式列出的 LoyaltyError 变体应回退到 AdminError::Internal，
    /// 避免 panic 或漏掉未知错误。
    #[test]
    fn test_from_loyalty_error_fallback_to_internal() {
        let err: AdminError = LoyaltyError::SelfReferral.into();
        match err {
            AdminError::Internal(msg) => {
                assert!(!msg.is_empty(), "Internal 消息不应为空");
            }
            other => panic!("未映射的 LoyaltyError 应回退到 Internal，实际: {:?}", other),
        }

        let err: AdminError = LoyaltyError::Redis("connection lost".into()).into();
        match err {
            AdminError::Internal(msg) => assert!(msg.contains("connection lost")),
            other => panic!("LoyaltyError::Redis 应回退到 Internal，实际: {:?}", other),
        }
    }

    /// Database 错误从 LoyaltyError 转换时应保持为 AdminError::Database，
    /// 因为 sqlx::Error 已经实现了 From，需要确保不会被意外路由到 Internal。
    #[test]
    fn test_from_loyalty_error_database_stays_database() {
        let loyalty_err = LoyaltyError::Database(sqlx::Error::RowNotFound);
        let admin_err: AdminError = loyalty_err.into();
        assert!(
            matches!(admin_err, AdminError::Database(_)),
            "LoyaltyError::Database 应映射到 AdminError::Database"
        );
        assert_eq!(admin_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(admin_err.error_code(), "DATABASE_ERROR");
    }

    // ---- Database (sqlx::Error) From 转换测试 ----

    /// sqlx::Error 通过 #[from] 自动派生 From，验证转换后类型和状态码正确
    #[test]
    fn test_from_sqlx_error() {
        let sqlx_err = sqlx::Error::RowNotFound;
        let admin_err = AdminError::from(sqlx_err);
        assert!(matches!(admin_err, AdminError::Database(_)));
        assert_eq!(admin_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(admin_err.error_code(), "DATABASE_ERROR");
    }

    // ---- 变体完备性校验 ----

    /// 确保测试用例覆盖了所有变体（不含 Database，因为它需要 sqlx::Error 不易在表中构造）。
    /// 如果新增了变体但忘记加测试，这个计数断言会失败。
    #[test]
    fn test_all_variants_covered_in_table() {
        // 共 24 个变体，Database 不在表中构造，故 23
        assert_eq!(
            all_error_variants().len(),
            23,
            "表驱动用例数量与变体总数不一致，可能新增了变体但未更新测试"
        );
    }
}
