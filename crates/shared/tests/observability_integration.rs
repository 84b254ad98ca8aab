//! 可观测性模块集成测试
//!
//! 测试 metrics 记录函数与配置构建的核心功能。
//! 指标记录函数内部直接调用 metrics 宏，未安装 recorder 时为空操作，
//! 这里主要验证各种标签组合不会 panic。

use loyalty_shared::config::ObservabilityConfig as ObservabilityFileConfig;
use loyalty_shared::observability::ObservabilityConfig;

// ============================================================================
// 指标记录测试
// ============================================================================

mod metrics_tests {
    use loyalty_shared::observability::metrics::{
        record_achievement_unlock, record_code_claim, record_http_request, record_points_grant,
        record_rank_promotion, record_redemption,
    };

    #[test]
    fn test_record_http_request() {
        // 各种 HTTP 方法和状态码组合
        record_http_request("GET", "/api/v1/profile", 200, 0.05);
        record_http_request("POST", "/api/v1/redeem", 201, 0.12);
        record_http_request("POST", "/api/v1/redeem", 402, 0.08);
        record_http_request("GET", "/api/v1/not-found", 404, 0.01);
        record_http_request("POST", "/api/v1/error", 500, 0.25);
    }

    #[test]
    fn test_record_points_grant() {
        record_points_grant("code_claim", 100);
        record_points_grant("manual", 500);
        record_points_grant("referral", 250);
        record_points_grant("achievement", 50);
    }

    #[test]
    fn test_record_redemption() {
        record_redemption("success", 0.1);
        record_redemption("insufficient_points", 0.02);
        record_redemption("out_of_stock", 0.03);
    }

    #[test]
    fn test_record_code_claim() {
        record_code_claim("success");
        record_code_claim("limit_reached");
        record_code_claim("expired");
    }

    #[test]
    fn test_record_achievement_and_rank() {
        record_achievement_unlock("FIRST_REDEEM");
        record_achievement_unlock("POINTS_10K");
        record_rank_promotion();
    }
}

// ============================================================================
// 配置构建测试
// ============================================================================

#[test]
fn test_config_from_app_config() {
    let file_config = ObservabilityFileConfig {
        log_level: "debug".to_string(),
        log_format: "json".to_string(),
        metrics_enabled: false,
        metrics_port: 9191,
    };

    let config = ObservabilityConfig::from_app_config(&file_config, "loyalty-member-service");

    assert_eq!(config.service_name, "loyalty-member-service");
    assert_eq!(config.log_level, "debug");
    assert!(config.json_logs);
    assert!(!config.metrics_enabled);
    assert_eq!(config.metrics_port, 9191);
}

#[test]
fn test_config_default() {
    let config = ObservabilityConfig::default();

    assert_eq!(config.service_name, "unknown-service");
    assert_eq!(config.metrics_port, 9090);
    assert!(config.metrics_enabled);
    assert!(!config.json_logs);
}
