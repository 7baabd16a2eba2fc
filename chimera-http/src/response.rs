//! 响应
//!
//! 响应在调度回溯期间由处理器和中间件逐步构建，
//! 最终由 [`Response::terminate`] 一次性写出到传输层。

use bytes::Bytes;
use cookie::Cookie;
use http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::transport::ResponseSink;

/// 结构化数据包装，处理器返回时序列化为 JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

#[derive(Debug, Clone, Default)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    cookies: Vec<String>,
    body: Option<Bytes>,
    terminated: bool,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== 构建 ====================

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn ok(self) -> Self {
        self.status(StatusCode::OK)
    }

    pub fn created(self) -> Self {
        self.status(StatusCode::CREATED)
    }

    pub fn no_content(self) -> Self {
        self.status(StatusCode::NO_CONTENT)
    }

    pub fn forbidden(self) -> Self {
        self.status(StatusCode::FORBIDDEN)
    }

    pub fn not_found(self) -> Self {
        self.status(StatusCode::NOT_FOUND)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.set_header(name, value);
        self
    }

    /// 添加 Cookie，未指定 Path 时默认为 `/`
    pub fn cookie(mut self, cookie: Cookie<'_>) -> Self {
        self.set_cookie(cookie);
        self
    }

    /// JSON 响应体
    pub fn json(mut self, value: Value) -> Self {
        self.set_json(value);
        self
    }

    /// 原样发送，未设置 Content-Type 时根据内容推断
    pub fn send(mut self, body: impl Into<Bytes>) -> Self {
        self.set_send(body);
        self
    }

    // ==================== 原地修改 ====================

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    pub fn set_cookie(&mut self, mut cookie: Cookie<'_>) {
        if cookie.path().is_none() {
            cookie.set_path("/");
        }
        self.cookies.push(cookie.to_string());
    }

    pub fn set_json(&mut self, value: Value) {
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(Bytes::from(value.to_string()));
    }

    pub fn set_send(&mut self, body: impl Into<Bytes>) {
        let body = body.into();
        if !self.headers.contains_key(header::CONTENT_TYPE) {
            let content_type = if body.starts_with(b"<") {
                "text/html"
            } else {
                "text/plain"
            };
            self.headers
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        self.body = Some(body);
    }

    /// 直接替换响应体，不修改 Content-Type
    pub fn set_content(&mut self, body: impl Into<Bytes>) {
        self.body = Some(body.into());
    }

    // ==================== 读取 ====================

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn cookies(&self) -> &[String] {
        &self.cookies
    }

    pub fn content(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// 响应体按 JSON 解析，测试与中间件使用
    pub fn content_json(&self) -> Option<Value> {
        self.body
            .as_ref()
            .and_then(|b| serde_json::from_slice(b).ok())
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// 写出到传输层，重复调用是空操作
    pub fn terminate(&mut self, sink: &mut dyn ResponseSink) {
        if self.terminated || sink.is_ended() {
            self.terminated = true;
            return;
        }
        self.terminated = true;

        sink.set_status(self.status);
        for name in self.headers.keys() {
            let mut values = self.headers.get_all(name).iter();
            if let Some(first) = values.next() {
                sink.set_header(name.clone(), first.clone());
            }
            for value in values {
                sink.append_header(name.clone(), value.clone());
            }
        }
        for cookie in &self.cookies {
            match HeaderValue::from_str(cookie) {
                Ok(value) => sink.append_set_cookie(value),
                Err(e) => tracing::warn!(error = %e, "Skipping invalid Set-Cookie value"),
            }
        }
        sink.end(self.body.clone().unwrap_or_default());
    }
}

impl From<StatusCode> for Response {
    fn from(status: StatusCode) -> Self {
        Response::new().status(status)
    }
}

impl<T: Serialize> Json<T> {
    pub fn into_value(self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::BufferedSink;
    use serde_json::json;

    /// 记录写出次数的传输层
    #[derive(Default)]
    struct CountingSink {
        inner: BufferedSink,
        ends: usize,
    }

    impl ResponseSink for CountingSink {
        fn set_status(&mut self, status: StatusCode) {
            self.inner.set_status(status)
        }

        fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
            self.inner.set_header(name, value)
        }

        fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
            self.inner.append_header(name, value)
        }

        fn end(&mut self, body: Bytes) {
            self.ends += 1;
            self.inner.end(body)
        }

        fn is_ended(&self) -> bool {
            self.inner.is_ended()
        }
    }

    #[test]
    fn test_terminate_writes_once() {
        let mut response = Response::new().created().json(json!({"id": 1}));
        let mut sink = CountingSink::default();

        response.terminate(&mut sink);
        response.terminate(&mut sink);

        assert_eq!(sink.ends, 1);
        assert!(response.is_terminated());
        assert_eq!(sink.inner.status(), StatusCode::CREATED);
        assert_eq!(sink.inner.body(), &Bytes::from(r#"{"id":1}"#));
    }

    #[test]
    fn test_terminate_skips_ended_sink() {
        let mut sink = CountingSink::default();
        sink.end(Bytes::from_static(b"already"));

        let mut response = Response::new().send("late");
        response.terminate(&mut sink);

        assert_eq!(sink.ends, 1);
        assert_eq!(sink.inner.body(), &Bytes::from_static(b"already"));
    }

    #[test]
    fn test_send_infers_content_type() {
        let html = Response::new().send("<h1>hi</h1>");
        assert_eq!(html.header_str("content-type"), Some("text/html"));

        let text = Response::new().send("hi");
        assert_eq!(text.header_str("content-type"), Some("text/plain"));

        let explicit = Response::new()
            .header(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"))
            .send("<a,b>");
        assert_eq!(explicit.header_str("content-type"), Some("text/csv"));
    }

    #[test]
    fn test_json_sets_content_type() {
        let response = Response::new().json(json!({"message": "ok"}));
        assert_eq!(response.header_str("content-type"), Some("application/json"));
        assert_eq!(response.content_json(), Some(json!({"message": "ok"})));
    }

    #[test]
    fn test_cookies_default_path_and_reach_sink() {
        let mut response = Response::new()
            .cookie(Cookie::new("session", "abc"))
            .cookie(Cookie::build(("lang", "en")).path("/docs").build());
        assert_eq!(response.cookies(), &["session=abc; Path=/", "lang=en; Path=/docs"]);

        let mut sink = BufferedSink::new();
        response.terminate(&mut sink);
        let http_response = sink.into_response();
        assert_eq!(
            http_response
                .headers()
                .get_all(header::SET_COOKIE)
                .iter()
                .count(),
            2
        );
    }

    #[test]
    fn test_repeated_headers_are_preserved() {
        let mut response = Response::new();
        response.append_header(header::VARY, HeaderValue::from_static("Origin"));
        response.append_header(header::VARY, HeaderValue::from_static("Accept"));

        let mut sink = BufferedSink::new();
        response.terminate(&mut sink);
        assert_eq!(sink.headers().get_all(header::VARY).iter().count(), 2);
    }
}
