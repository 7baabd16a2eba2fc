//! 处理器
//!
//! 普通处理器是形如 `Fn(Request, P1, .., Pn) -> Future` 的闭包（n 为 0 到 4），
//! 位置参数按路由模式中的声明顺序传入，每个参数通过 [`FromParam`] 转换。
//! 处理器的返回值实现 [`IntoHandlerResult`]，最终统一为 [`HandlerOutput`]。

use bytes::Bytes;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::error::{HttpError, HttpResult};
use crate::request::Request;
use crate::response::{Json, Response};

/// 处理器产生的结果，由 Router 转换为响应
#[derive(Debug)]
pub enum HandlerOutput {
    /// 已经构建好的响应，原样返回
    Response(Response),

    /// 文本，按 send 规则推断 Content-Type
    Text(String),

    Bytes(Bytes),

    /// 结构化数据，序列化为 JSON
    Data(Value),
}

impl HandlerOutput {
    /// 以调度时的响应为基础生成最终响应
    pub fn into_response(self, seed: Response) -> Response {
        match self {
            HandlerOutput::Response(response) => response,
            HandlerOutput::Text(text) => seed.send(text),
            HandlerOutput::Bytes(bytes) => seed.send(bytes),
            HandlerOutput::Data(value) => seed.json(value),
        }
    }
}

impl From<Response> for HandlerOutput {
    fn from(response: Response) -> Self {
        HandlerOutput::Response(response)
    }
}

impl From<String> for HandlerOutput {
    fn from(text: String) -> Self {
        HandlerOutput::Text(text)
    }
}

impl From<&'static str> for HandlerOutput {
    fn from(text: &'static str) -> Self {
        HandlerOutput::Text(text.to_string())
    }
}

impl From<Value> for HandlerOutput {
    fn from(value: Value) -> Self {
        HandlerOutput::Data(value)
    }
}

/// 处理器返回值的转换
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> HttpResult<HandlerOutput>;
}

impl IntoHandlerResult for HandlerOutput {
    fn into_handler_result(self) -> HttpResult<HandlerOutput> {
        Ok(self)
    }
}

impl IntoHandlerResult for Response {
    fn into_handler_result(self) -> HttpResult<HandlerOutput> {
        Ok(HandlerOutput::Response(self))
    }
}

impl IntoHandlerResult for String {
    fn into_handler_result(self) -> HttpResult<HandlerOutput> {
        Ok(HandlerOutput::Text(self))
    }
}

impl IntoHandlerResult for &'static str {
    fn into_handler_result(self) -> HttpResult<HandlerOutput> {
        Ok(HandlerOutput::Text(self.to_string()))
    }
}

impl IntoHandlerResult for Bytes {
    fn into_handler_result(self) -> HttpResult<HandlerOutput> {
        Ok(HandlerOutput::Bytes(self))
    }
}

impl IntoHandlerResult for Vec<u8> {
    fn into_handler_result(self) -> HttpResult<HandlerOutput> {
        Ok(HandlerOutput::Bytes(Bytes::from(self)))
    }
}

impl IntoHandlerResult for Value {
    fn into_handler_result(self) -> HttpResult<HandlerOutput> {
        Ok(HandlerOutput::Data(self))
    }
}

/// 没有返回值的处理器输出 JSON `null`
impl IntoHandlerResult for () {
    fn into_handler_result(self) -> HttpResult<HandlerOutput> {
        Ok(HandlerOutput::Data(Value::Null))
    }
}

impl<T: Serialize> IntoHandlerResult for Json<T> {
    fn into_handler_result(self) -> HttpResult<HandlerOutput> {
        Ok(HandlerOutput::Data(self.into_value()?))
    }
}

impl<T, E> IntoHandlerResult for Result<T, E>
where
    T: IntoHandlerResult,
    E: Into<HttpError>,
{
    fn into_handler_result(self) -> HttpResult<HandlerOutput> {
        self.map_err(Into::<HttpError>::into)?.into_handler_result()
    }
}

/// 路由参数到处理器位置参数的转换
pub trait FromParam: Sized {
    fn from_param(value: &str) -> HttpResult<Self>;
}

impl FromParam for String {
    fn from_param(value: &str) -> HttpResult<Self> {
        Ok(value.to_string())
    }
}

macro_rules! impl_from_param_for_int {
    ($($ty:ty),*) => {
        $(
            impl FromParam for $ty {
                fn from_param(value: &str) -> HttpResult<Self> {
                    value.parse().map_err(|e| {
                        HttpError::bad_request(format!("Invalid route parameter '{}'", value))
                            .with_source(e)
                    })
                }
            }
        )*
    };
}

impl_from_param_for_int!(i32, i64, u32, u64, usize);

/// 类型擦除后的处理器
pub type BoxedHandler =
    Arc<dyn Fn(Request, Vec<String>) -> BoxFuture<'static, HttpResult<HandlerOutput>> + Send + Sync>;

/// 普通处理器
///
/// `Args` 是位置参数类型组成的元组，只用于区分不同参数个数的实现
pub trait Handler<Args>: Send + Sync + 'static {
    /// 处理器需要的位置参数个数
    const ARITY: usize;

    fn call(&self, request: Request, params: Vec<String>)
        -> BoxFuture<'static, HttpResult<HandlerOutput>>;
}

macro_rules! impl_handler {
    ($arity:expr; $($ty:ident),*) => {
        impl<F, Fut, R, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: Fn(Request, $($ty,)*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = R> + Send + 'static,
            R: IntoHandlerResult,
            $($ty: FromParam + Send + 'static,)*
        {
            const ARITY: usize = $arity;

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(
                &self,
                request: Request,
                params: Vec<String>,
            ) -> BoxFuture<'static, HttpResult<HandlerOutput>> {
                let mut values = params.into_iter();
                $(
                    let $ty = match <$ty as FromParam>::from_param(
                        &values.next().unwrap_or_default(),
                    ) {
                        Ok(value) => value,
                        Err(e) => return Box::pin(async move { Err(e) }),
                    };
                )*
                let future = (self)(request, $($ty,)*);
                Box::pin(async move { future.await.into_handler_result() })
            }
        }
    };
}

impl_handler!(0;);
impl_handler!(1; P1);
impl_handler!(2; P1, P2);
impl_handler!(3; P1, P2, P3);
impl_handler!(4; P1, P2, P3, P4);

pub(crate) fn boxed<H, Args>(handler: H) -> BoxedHandler
where
    H: Handler<Args>,
{
    Arc::new(move |request, params| handler.call(request, params))
}
