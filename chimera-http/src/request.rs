//! 请求
//!
//! 请求的不可变事实（方法、路径、请求头、Cookie、查询参数）在构造时一次解析完成；
//! 调度期间只有两个字段会被写入：
//! - `parsed_body`：由请求体解析中间件设置
//! - `route_params`：由 Router 在匹配成功后设置

use bytes::Bytes;
use cookie::Cookie;
use http::{header, Extensions, HeaderMap, Method, Uri};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::net::SocketAddr;

use crate::constants::DEFAULT_APP_URL;
use crate::path::RouteParams;
use crate::transport::RawRequest;

/// 构造请求时使用的选项
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// 是否信任 X-Forwarded-* 头
    pub trust_proxy: bool,

    /// 无法从请求头推断时使用的基础 URL
    pub fallback_url: String,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            trust_proxy: false,
            fallback_url: DEFAULT_APP_URL.to_string(),
        }
    }
}

/// 一次调用的请求
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    query: Vec<(String, String)>,
    cookies: HashMap<String, String>,
    base_url: String,
    parsed_body: Option<Value>,
    route_params: RouteParams,
    extensions: Extensions,
}

impl Request {
    pub fn from_raw(raw: RawRequest) -> Self {
        Self::from_raw_with(raw, &RequestOptions::default())
    }

    pub fn from_raw_with(raw: RawRequest, options: &RequestOptions) -> Self {
        let query = raw
            .uri
            .query()
            .map(parse_query)
            .unwrap_or_default();
        let cookies = parse_cookies(&raw.headers);
        let base_url = resolve_base_url(&raw.uri, &raw.headers, options);

        Self {
            method: raw.method,
            uri: raw.uri,
            headers: raw.headers,
            body: raw.body,
            remote_addr: raw.remote_addr,
            query,
            cookies,
            base_url,
            parsed_body: None,
            route_params: RouteParams::default(),
            extensions: Extensions::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// 请求头，名称大小写不敏感，非 ASCII 值返回 None
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// 请求的 Content-Type，不含参数部分
    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    /// 查询参数的第一个值
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn query_all(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 完整 URL（基础 URL + 路径 + 查询串）
    pub fn full_url(&self) -> String {
        match self.uri.path_and_query() {
            Some(pq) => format!("{}{}", self.base_url, pq),
            None => format!("{}{}", self.base_url, self.path()),
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.route_params.get(name)
    }

    pub fn params(&self) -> &RouteParams {
        &self.route_params
    }

    pub fn set_route_params(&mut self, params: RouteParams) {
        self.route_params = params;
    }

    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn parsed_body(&self) -> Option<&Value> {
        self.parsed_body.as_ref()
    }

    pub fn parsed_body_mut(&mut self) -> Option<&mut Value> {
        self.parsed_body.as_mut()
    }

    pub fn set_parsed_body(&mut self, body: Value) {
        self.parsed_body = Some(body);
    }

    pub fn take_parsed_body(&mut self) -> Option<Value> {
        self.parsed_body.take()
    }

    /// 请求范围内的类型化数据
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// 读取输入：路由参数，其次是请求体字段，最后是查询参数
    pub fn input(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.param(key) {
            return Some(Value::String(value.to_string()));
        }
        if let Some(value) = self
            .parsed_body
            .as_ref()
            .and_then(Value::as_object)
            .and_then(|body| body.get(key))
        {
            return Some(value.clone());
        }
        self.query(key).map(|v| Value::String(v.to_string()))
    }

    /// 字符串形式的输入
    pub fn input_str(&self, key: &str) -> Option<String> {
        self.input(key).and_then(|value| match value {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        })
    }

    /// 查询参数与请求体合并，同名时请求体优先
    pub fn all(&self) -> Map<String, Value> {
        let mut merged = Map::new();
        for (key, value) in &self.query {
            merged
                .entry(key.clone())
                .or_insert_with(|| Value::String(value.clone()));
        }
        if let Some(body) = self.parsed_body.as_ref().and_then(Value::as_object) {
            for (key, value) in body {
                merged.insert(key.clone(), value.clone());
            }
        }
        merged
    }

    pub fn only(&self, keys: &[&str]) -> Map<String, Value> {
        let mut all = self.all();
        all.retain(|key, _| keys.contains(&key.as_str()));
        all
    }

    pub fn except(&self, keys: &[&str]) -> Map<String, Value> {
        let mut all = self.all();
        all.retain(|key, _| !keys.contains(&key.as_str()));
        all
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str(query).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Ignoring malformed query string");
        Vec::new()
    })
}

fn parse_cookies(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value))
        .filter_map(Result::ok)
        .map(|c| (c.name().to_string(), c.value().to_string()))
        .collect()
}

fn first_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn resolve_base_url(uri: &Uri, headers: &HeaderMap, options: &RequestOptions) -> String {
    let (scheme, host) = if options.trust_proxy {
        (
            first_value(headers, "x-forwarded-proto"),
            first_value(headers, "x-forwarded-host").or_else(|| first_value(headers, "host")),
        )
    } else {
        (None, first_value(headers, "host"))
    };

    match host.or_else(|| uri.authority().map(|a| a.to_string())) {
        Some(host) => {
            let scheme = scheme
                .or_else(|| uri.scheme_str().map(str::to_string))
                .unwrap_or_else(|| "http".to_string());
            format!("{}://{}", scheme, host)
        }
        None => options.fallback_url.trim_end_matches('/').to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(uri: &'static str) -> RawRequest {
        RawRequest::new(Method::GET, Uri::from_static(uri))
    }

    #[test]
    fn test_query_and_cookies_are_parsed() {
        let request = Request::from_raw(
            raw("/search?q=rust&tag=a&tag=b&empty=")
                .with_header("Cookie", "session=abc; theme=dark"),
        );

        assert_eq!(request.query("q"), Some("rust"));
        assert_eq!(request.query("tag"), Some("a"));
        assert_eq!(request.query("empty"), Some(""));
        assert_eq!(request.query_all().len(), 4);
        assert_eq!(request.cookie("session"), Some("abc"));
        assert_eq!(request.cookie("theme"), Some("dark"));
        assert_eq!(request.path(), "/search");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = Request::from_raw(raw("/").with_header("X-Custom", "value"));
        assert_eq!(request.header("x-custom"), Some("value"));
        assert_eq!(request.header("X-CUSTOM"), Some("value"));
    }

    #[test]
    fn test_base_url_from_host() {
        let request = Request::from_raw(raw("/").with_header("Host", "example.com"));
        assert_eq!(request.base_url(), "http://example.com");
    }

    #[test]
    fn test_base_url_honours_proxy_only_when_trusted() {
        let make = || {
            raw("/a?b=1")
                .with_header("Host", "internal:8080")
                .with_header("X-Forwarded-Proto", "https")
                .with_header("X-Forwarded-Host", "shop.example.com")
        };

        let untrusted = Request::from_raw(make());
        assert_eq!(untrusted.base_url(), "http://internal:8080");

        let trusted = Request::from_raw_with(
            make(),
            &RequestOptions {
                trust_proxy: true,
                ..RequestOptions::default()
            },
        );
        assert_eq!(trusted.base_url(), "https://shop.example.com");
        assert_eq!(trusted.full_url(), "https://shop.example.com/a?b=1");
    }

    #[test]
    fn test_base_url_falls_back_to_configured_url() {
        let request = Request::from_raw_with(
            raw("/"),
            &RequestOptions {
                trust_proxy: false,
                fallback_url: "https://app.test/".to_string(),
            },
        );
        assert_eq!(request.base_url(), "https://app.test");
    }

    #[test]
    fn test_input_lookup_order() {
        let mut request = Request::from_raw(raw("/users/1?id=query&name=q&page=2"));
        let mut params = RouteParams::new();
        params.push("id", "route");
        request.set_route_params(params);
        request.set_parsed_body(json!({"id": "body", "name": "body-name"}));

        assert_eq!(request.input("id"), Some(json!("route")));
        assert_eq!(request.input("name"), Some(json!("body-name")));
        assert_eq!(request.input("page"), Some(json!("2")));
        assert_eq!(request.input("missing"), None);
    }

    #[test]
    fn test_all_only_except() {
        let mut request = Request::from_raw(raw("/?a=1&b=2"));
        request.set_parsed_body(json!({"b": "body", "c": 3}));

        let all = request.all();
        assert_eq!(all.get("a"), Some(&json!("1")));
        assert_eq!(all.get("b"), Some(&json!("body")));
        assert_eq!(all.get("c"), Some(&json!(3)));

        let only = request.only(&["a", "c"]);
        assert_eq!(only.len(), 2);
        assert!(!only.contains_key("b"));

        let except = request.except(&["a"]);
        assert!(!except.contains_key("a"));
        assert_eq!(except.len(), 2);
    }

    #[test]
    fn test_input_str_renders_scalars() {
        let mut request = Request::from_raw(raw("/"));
        request.set_parsed_body(json!({"age": 30, "gone": null}));
        assert_eq!(request.input_str("age"), Some("30".to_string()));
        assert_eq!(request.input_str("gone"), None);
    }
}
