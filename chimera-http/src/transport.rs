//! 传输层边界
//!
//! 传输层负责读写字节流，Kernel 只通过这里的两个类型与它交互：
//! - [`RawRequest`]：已经结构化的请求（请求体已缓冲）
//! - [`ResponseSink`]：响应写出端，`end` 幂等

use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use std::net::SocketAddr;

/// 传输层交给 Kernel 的原始请求
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub remote_addr: Option<SocketAddr>,
}

impl RawRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
        }
    }

    /// 添加请求头，非法的名称或值会被忽略
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }
}

/// 响应写出端
pub trait ResponseSink: Send {
    fn set_status(&mut self, status: StatusCode);

    /// 覆盖同名响应头
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    /// 追加响应头，保留已有的同名值
    fn append_header(&mut self, name: HeaderName, value: HeaderValue);

    fn append_set_cookie(&mut self, cookie: HeaderValue) {
        self.append_header(header::SET_COOKIE, cookie);
    }

    /// 写出响应体并结束，第二次调用必须是空操作
    fn end(&mut self, body: Bytes);

    fn is_ended(&self) -> bool;

    /// 状态与响应头是否已经发出
    fn headers_sent(&self) -> bool {
        self.is_ended()
    }
}

/// 内存中的写出端，由 axum 适配器和测试使用
#[derive(Debug, Default)]
pub struct BufferedSink {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    ended: bool,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_response(self) -> http::Response<Bytes> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseSink for BufferedSink {
    fn set_status(&mut self, status: StatusCode) {
        if !self.ended {
            self.status = status;
        }
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        if !self.ended {
            self.headers.insert(name, value);
        }
    }

    fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        if !self.ended {
            self.headers.append(name, value);
        }
    }

    fn end(&mut self, body: Bytes) {
        if self.ended {
            return;
        }
        self.body = body;
        self.ended = true;
    }

    fn is_ended(&self) -> bool {
        self.ended
    }
}
