//! JWT 认证中间件
//!
//! 校验请求头中的 Bearer Token，并将管理员身份注入请求扩展

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::state::AppState;

/// 无需认证的路径
const PUBLIC_PATHS: &[&str] = &["/api/admin/auth/login", "/health", "/ready"];

/// JWT 认证中间件
///
/// 从 Authorization 头提取 Bearer Token 并校验，
/// 校验通过后将 Claims 注入请求扩展供后续 Handler 使用
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();

    if PUBLIC_PATHS.contains(&path) {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let token = match token {
        Some(t) => t,
        None => return unauthorized_response("缺少认证信息"),
    };

    match state.jwt_manager.verify_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Token 校验失败");
            unauthorized_response(&e.to_string())
        }
    }
}

/// 构造 401 响应
fn unauthorized_response(message: &str) -> Response {
    let body = json!({
        "success": false,
        "code": "UNAUTHORIZED",
        "message": message,
        "data": null,
    });

    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_paths() {
        assert!(PUBLIC_PATHS.contains(&"/api/admin/auth/login"));
        assert!(PUBLIC_PATHS.contains(&"/health"));
        assert!(!PUBLIC_PATHS.contains(&"/api/admin/ranks"));
    }
}
