//! HTTP 层配置键

// ==================== HTTP 配置 ====================

/// 是否信任代理头（X-Forwarded-Proto / X-Forwarded-Host）
pub const HTTP_TRUST_PROXY: &str = "http.trust-proxy";

/// 缺少 Host 头时使用的基础 URL
pub const DEFAULT_APP_URL: &str = "http://localhost";

// ==================== Server 配置 ====================

pub const SERVER_HOST: &str = "server.host";

pub const SERVER_PORT: &str = "server.port";

/// 请求体大小上限（字节）
pub const SERVER_MAX_BODY_SIZE: &str = "server.max-body-size";

pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// 2 MiB
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

// ==================== 响应 ====================

pub const ROUTE_NOT_FOUND: &str = "Route not found";

pub const REQUEST_ID_HEADER: &str = "x-request-id";
