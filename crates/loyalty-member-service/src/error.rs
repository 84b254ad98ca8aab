//! 积分服务错误类型
//!
//! 定义服务层的业务错误和系统错误

use thiserror::Error;

/// 积分服务错误类型
#[derive(Debug, Error)]
pub enum LoyaltyError {
    // === 用户相关错误 ===
    #[error("用户不存在: {0}")]
    UserNotFound(i64),

    #[error("用户已冻结: {0}")]
    UserSuspended(i64),

    #[error("邮箱已被注册: {0}")]
    EmailTaken(String),

    #[error("邮箱或密码不正确")]
    InvalidCredentials,

    // === 积分相关错误 ===
    #[error("积分余额不足: 需要 {required}, 可用 {available}")]
    InsufficientPoints { required: i64, available: i64 },

    #[error("积分数量不合法: {0}")]
    InvalidAmount(String),

    // === 等级相关错误 ===
    #[error("等级不存在: {0}")]
    RankNotFound(i64),

    #[error("等级不满足兑换要求: 需要 {required_rank}")]
    RankRequirementNotMet { required_rank: String },

    // === 商品/订单相关错误 ===
    #[error("商品不存在: {0}")]
    ProductNotFound(i64),

    #[error("商品未上架: {0}")]
    ProductInactive(i64),

    #[error("商品库存不足: product_id={0}")]
    ProductOutOfStock(i64),

    #[error("兑换订单不存在: {0}")]
    OrderNotFound(String),

    #[error("订单状态不允许此操作: order_no={order_no}, current_status={current_status}")]
    InvalidOrderStatus {
        order_no: String,
        current_status: String,
    },

    #[error("幂等键已被其他用户使用")]
    IdempotencyKeyConflict,

    // === 兑换码相关错误 ===
    #[error("兑换码不存在: {0}")]
    CodeNotFound(String),

    #[error("兑换码已停用: {0}")]
    CodeDisabled(String),

    #[error("兑换码未生效: {0}")]
    CodeNotStarted(String),

    #[error("兑换码已过期: {0}")]
    CodeExpired(String),

    #[error("兑换码已被领完: {0}")]
    CodeExhausted(String),

    #[error("已达到该兑换码的领取上限: code={code}, limit={limit}")]
    CodeClaimLimitReached { code: String, limit: i32 },

    // === 邀请相关错误 ===
    #[error("邀请码无效: {0}")]
    ReferralCodeInvalid(String),

    #[error("不能使用自己的邀请码")]
    SelfReferral,

    #[error("用户已有邀请关系: referred_id={0}")]
    ReferralExists(i64),

    // === 成就相关错误 ===
    #[error("成就不存在: {0}")]
    AchievementNotFound(i64),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Redis 错误: {0}")]
    Redis(String),

    #[error("内部错误: {0}")]
    Internal(String),

    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("并发冲突，请重试")]
    ConcurrencyConflict,
}

/// 积分服务 Result 类型别名
pub type Result<T> = std::result::Result<T, LoyaltyError>;

impl LoyaltyError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Redis(_) | Self::ConcurrencyConflict
        )
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_)
                | Self::Serialization(_)
                | Self::Redis(_)
                | Self::Internal(_)
                | Self::ConcurrencyConflict
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::UserSuspended(_) => "USER_SUSPENDED",
            Self::EmailTaken(_) => "EMAIL_TAKEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InsufficientPoints { .. } => "INSUFFICIENT_POINTS",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::RankNotFound(_) => "RANK_NOT_FOUND",
            Self::RankRequirementNotMet { .. } => "RANK_REQUIREMENT_NOT_MET",
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::ProductInactive(_) => "PRODUCT_INACTIVE",
            Self::ProductOutOfStock(_) => "PRODUCT_OUT_OF_STOCK",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::InvalidOrderStatus { .. } => "INVALID_ORDER_STATUS",
            Self::IdempotencyKeyConflict => "IDEMPOTENCY_KEY_CONFLICT",
            Self::CodeNotFound(_) => "CODE_NOT_FOUND",
            Self::CodeDisabled(_) => "CODE_DISABLED",
            Self::CodeNotStarted(_) => "CODE_NOT_STARTED",
            Self::CodeExpired(_) => "CODE_EXPIRED",
            Self::CodeExhausted(_) => "CODE_EXHAUSTED",
            Self::CodeClaimLimitReached { .. } => "CODE_CLAIM_LIMIT_REACHED",
            Self::ReferralCodeInvalid(_) => "REFERRAL_CODE_INVALID",
            Self::SelfReferral => "SELF_REFERRAL",
            Self::ReferralExists(_) => "REFERRAL_EXISTS",
            Self::AchievementNotFound(_) => "ACHIEVEMENT_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Redis(_) => "REDIS_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
        }
    }
}

impl From<loyalty_shared::error::InfraError> for LoyaltyError {
    fn from(err: loyalty_shared::error::InfraError) -> Self {
        use loyalty_shared::error::InfraError;
        match err {
            InfraError::Database(e) => Self::Database(e),
            InfraError::Redis(e) => Self::Redis(e.to_string()),
            InfraError::Serialization(e) => Self::Serialization(e),
            InfraError::Config(e) => Self::Internal(e.to_string()),
            InfraError::Internal(msg) => Self::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(LoyaltyError::ConcurrencyConflict.is_retryable());
        assert!(LoyaltyError::Redis("connection failed".to_string()).is_retryable());
        assert!(!LoyaltyError::UserNotFound(1).is_retryable());
        assert!(
            !LoyaltyError::InsufficientPoints {
                required: 500,
                available: 120
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_error_is_business_error() {
        assert!(LoyaltyError::ProductOutOfStock(1).is_business_error());
        assert!(
            LoyaltyError::InsufficientPoints {
                required: 500,
                available: 120
            }
            .is_business_error()
        );
        assert!(!LoyaltyError::Internal("panic".to_string()).is_business_error());
        assert!(!LoyaltyError::ConcurrencyConflict.is_business_error());
    }

    #[test]
    fn test_error_code() {
        assert_eq!(
            LoyaltyError::InsufficientPoints {
                required: 500,
                available: 120
            }
            .error_code(),
            "INSUFFICIENT_POINTS"
        );
        assert_eq!(
            LoyaltyError::CodeClaimLimitReached {
                code: "WELCOME100".to_string(),
                limit: 1
            }
            .error_code(),
            "CODE_CLAIM_LIMIT_REACHED"
        );
        assert_eq!(
            LoyaltyError::ConcurrencyConflict.error_code(),
            "CONCURRENCY_CONFLICT"
        );
    }

    #[test]
    fn test_error_display() {
        let err = LoyaltyError::InsufficientPoints {
            required: 500,
            available: 120,
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("120"));

        let err = LoyaltyError::InvalidOrderStatus {
            order_no: "LO123".to_string(),
            current_status: "cancelled".to_string(),
        };
        assert!(err.to_string().contains("LO123"));
        assert!(err.to_string().contains("cancelled"));
    }
}
