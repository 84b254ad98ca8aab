//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    // 构建 Prometheus recorder
    let builder = PrometheusBuilder::new();
    let handle = builder.install_recorder()?;

    // 保存到全局，供其他地方获取指标快照
    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    // 注册服务级别的标签
    register_common_metrics(&config.service_name);

    // 启动指标 HTTP 服务器
    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标（预定义的业务指标）
fn register_common_metrics(service_name: &str) {
    // 描述会出现在 /metrics 端点的 HELP 注释中

    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!("points_grants_total", "Total number of point grants");
    metrics::describe_counter!("points_granted_sum", "Total points granted");

    metrics::describe_counter!("redemptions_total", "Total number of redemptions");
    metrics::describe_histogram!(
        "redemption_duration_seconds",
        "Redemption duration in seconds"
    );

    metrics::describe_counter!("code_claims_total", "Total number of reward code claims");
    metrics::describe_counter!(
        "achievement_unlocks_total",
        "Total number of achievement unlocks"
    );
    metrics::describe_counter!("rank_promotions_total", "Total number of rank promotions");

    // 记录服务启动
    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录积分发放
#[inline]
pub fn record_points_grant(source: &str, amount: i64) {
    metrics::counter!("points_grants_total", "source" => source.to_string()).increment(1);
    if amount > 0 {
        metrics::counter!("points_granted_sum", "source" => source.to_string())
            .increment(amount as u64);
    }
}

/// 记录兑换
#[inline]
pub fn record_redemption(result: &str, duration_secs: f64) {
    metrics::counter!("redemptions_total", "result" => result.to_string()).increment(1);
    metrics::histogram!("redemption_duration_seconds", "result" => result.to_string())
        .record(duration_secs);
}

/// 记录奖励码领取
#[inline]
pub fn record_code_claim(result: &str) {
    metrics::counter!("code_claims_total", "result" => result.to_string()).increment(1);
}

/// 记录成就解锁
#[inline]
pub fn record_achievement_unlock(code: &str) {
    metrics::counter!("achievement_unlocks_total", "achievement" => code.to_string()).increment(1);
}

/// 记录等级晋升
#[inline]
pub fn record_rank_promotion() {
    metrics::counter!("rank_promotions_total").increment(1);
}
