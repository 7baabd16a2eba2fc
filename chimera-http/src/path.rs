//! 路径匹配
//!
//! 路由模式在注册时编译为一组段匹配器，请求路径按段比较：
//! - 字面量段大小写敏感地精确匹配
//! - `:name` 段捕获对应位置的值
//! - 段数必须完全一致，不支持前缀或通配匹配

use crate::error::RouteError;

/// 参数标记
const PARAM_MARKER: char = ':';

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// 编译后的路由模式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// 编译路由模式，空参数名与重复参数名在这里报错
    pub fn compile(pattern: &str) -> Result<Self, RouteError> {
        let mut segments = Vec::new();
        for part in split_segments(pattern) {
            match part.strip_prefix(PARAM_MARKER) {
                Some("") => {
                    return Err(RouteError::EmptyParameterName {
                        pattern: pattern.to_string(),
                    })
                }
                Some(name) => {
                    let duplicated = segments
                        .iter()
                        .any(|s| matches!(s, Segment::Param(existing) if existing == name));
                    if duplicated {
                        return Err(RouteError::DuplicateParameter {
                            pattern: pattern.to_string(),
                            name: name.to_string(),
                        });
                    }
                    segments.push(Segment::Param(name.to_string()));
                }
                None => segments.push(Segment::Literal(part.to_string())),
            }
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    /// 原始模式文本
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// 声明的参数名，按声明顺序
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn param_count(&self) -> usize {
        self.param_names().count()
    }

    /// 匹配请求路径，成功时返回捕获的参数
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let mut parts = split_segments(path);
        let mut params = RouteParams::default();

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => params.push(name.clone(), part.to_string()),
            }
        }

        // 请求路径更长
        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = path.trim_matches('/');
    trimmed.split('/').filter(move |_| !trimmed.is_empty())
}

/// 路由参数，保持声明顺序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    entries: Vec<(String, String)>,
}

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 按声明顺序的参数值，用作处理器的位置参数
    pub fn values(&self) -> Vec<String> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 拼接路径前缀，保证只有一个分隔符并以 `/` 开头
pub fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    let joined = match (prefix.is_empty(), path.is_empty()) {
        (true, true) => return "/".to_string(),
        (true, false) => path.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}/{}", prefix, path),
    };

    if joined.starts_with('/') {
        joined
    } else {
        format!("/{}", joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pattern() {
        let pattern = PathPattern::compile("/users/profile").unwrap();
        assert!(pattern.matches("/users/profile").is_some());
        assert!(pattern.matches("/users/profile/").is_some());
        assert!(pattern.matches("/Users/profile").is_none());
        assert!(pattern.matches("/users").is_none());
    }

    #[test]
    fn test_root_pattern() {
        let pattern = PathPattern::compile("/").unwrap();
        assert!(pattern.matches("/").is_some());
        assert!(pattern.matches("").is_some());
        assert!(pattern.matches("/a").is_none());
    }

    #[test]
    fn test_segment_count_must_match() {
        let pattern = PathPattern::compile("/a/:x").unwrap();
        assert!(pattern.matches("/a/b/c").is_none());
        assert!(pattern.matches("/a").is_none());
        assert_eq!(pattern.matches("/a/b").unwrap().get("x"), Some("b"));

        let users = PathPattern::compile("/users/:id").unwrap();
        assert!(users.matches("/users/1/edit").is_none());
    }

    #[test]
    fn test_params_in_declaration_order() {
        let pattern = PathPattern::compile("/posts/:post/comments/:comment").unwrap();
        let params = pattern.matches("/posts/7/comments/42").unwrap();

        assert_eq!(params.values(), vec!["7".to_string(), "42".to_string()]);
        assert_eq!(params.get("comment"), Some("42"));
        assert_eq!(
            pattern.param_names().collect::<Vec<_>>(),
            vec!["post", "comment"]
        );
    }

    #[test]
    fn test_captured_values_stay_strings() {
        let pattern = PathPattern::compile("/users/:id").unwrap();
        let params = pattern.matches("/users/042").unwrap();
        assert_eq!(params.get("id"), Some("042"));
    }

    #[test]
    fn test_duplicate_parameter_is_rejected() {
        let err = PathPattern::compile("/a/:id/b/:id").unwrap_err();
        assert_eq!(
            err,
            RouteError::DuplicateParameter {
                pattern: "/a/:id/b/:id".to_string(),
                name: "id".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_parameter_name_is_rejected() {
        assert!(matches!(
            PathPattern::compile("/a/:"),
            Err(RouteError::EmptyParameterName { .. })
        ));
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("", ""), "/");
        assert_eq!(join_paths("", "/users"), "/users");
        assert_eq!(join_paths("api", ""), "/api");
        assert_eq!(join_paths("/api/", "/v1"), "/api/v1");
        assert_eq!(join_paths("api", "v1"), "/api/v1");
        assert_eq!(join_paths("/api//", "//test"), "/api/test");
    }
}
