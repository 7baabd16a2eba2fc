//! 将请求体中的空字符串转换为 null

use async_trait::async_trait;
use serde_json::Value;

use super::{Middleware, Next};
use crate::error::HttpResult;
use crate::request::Request;
use crate::response::Response;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertEmptyStringsToNull;

impl ConvertEmptyStringsToNull {
    fn clean(value: &mut Value) {
        if value.as_str() == Some("") {
            *value = Value::Null;
            return;
        }
        match value {
            Value::Object(map) => map.values_mut().for_each(Self::clean),
            Value::Array(items) => items.iter_mut().for_each(Self::clean),
            _ => {}
        }
    }
}

#[async_trait]
impl Middleware for ConvertEmptyStringsToNull {
    fn name(&self) -> &str {
        "convert-empty-strings-to-null"
    }

    async fn handle(&self, mut request: Request, next: Next) -> HttpResult<Response> {
        if let Some(body) = request.parsed_body_mut() {
            Self::clean(body);
        }
        next.run(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{MiddlewareUnit, TrimStrings};
    use crate::pipeline::Pipeline;
    use crate::transport::RawRequest;
    use http::{Method, Uri};
    use serde_json::json;

    #[test]
    fn test_converts_nested_empty_strings() {
        let mut body = json!({"a": "", "b": {"c": ""}, "d": ["", "x"], "e": " "});
        ConvertEmptyStringsToNull::clean(&mut body);
        assert_eq!(body, json!({"a": null, "b": {"c": null}, "d": [null, "x"], "e": " "}));
    }

    #[tokio::test]
    async fn test_runs_after_trimming() {
        let mut request = Request::from_raw(RawRequest::new(Method::POST, Uri::from_static("/")));
        request.set_parsed_body(json!({"nickname": "   "}));

        let pipeline = Pipeline::new()
            .pipe(MiddlewareUnit::new(TrimStrings::new()))
            .pipe(MiddlewareUnit::new(ConvertEmptyStringsToNull));
        let response = pipeline
            .handle(request, |request| async move {
                Ok(Response::new().json(request.parsed_body().cloned().unwrap_or_default()))
            })
            .await
            .unwrap();

        assert_eq!(response.content_json(), Some(json!({"nickname": null})));
    }
}
