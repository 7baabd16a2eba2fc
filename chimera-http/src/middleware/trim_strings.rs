//! 去除请求体字符串字段两端的空白

use async_trait::async_trait;
use serde_json::Value;

use super::{Middleware, Next};
use crate::error::HttpResult;
use crate::request::Request;
use crate::response::Response;

#[derive(Debug, Clone)]
pub struct TrimStrings {
    except: Vec<String>,
}

impl TrimStrings {
    pub fn new() -> Self {
        Self {
            except: vec!["password".to_string(), "password_confirmation".to_string()],
        }
    }

    /// 额外跳过的字段
    pub fn except(mut self, key: impl Into<String>) -> Self {
        self.except.push(key.into());
        self
    }

    fn clean(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, field) in map.iter_mut() {
                    if self.except.iter().any(|k| k == key) {
                        continue;
                    }
                    self.clean(field);
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|item| self.clean(item)),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.len() != s.len() {
                    *s = trimmed.to_string();
                }
            }
            _ => {}
        }
    }
}

impl Default for TrimStrings {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for TrimStrings {
    fn name(&self) -> &str {
        "trim-strings"
    }

    async fn handle(&self, mut request: Request, next: Next) -> HttpResult<Response> {
        if let Some(body) = request.parsed_body_mut() {
            self.clean(body);
        }
        next.run(request).await
    }
}
