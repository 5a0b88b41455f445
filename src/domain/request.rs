use reqwest::Method;
use serde_json::Value;

/// A single outbound call: method, path relative to the API base URL, query and JSON body.
///
/// Per-attempt bookkeeping (start time, attempt number) is not stored here; it travels
/// through the middleware chain alongside the built `reqwest::Request`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Whether repeating this request cannot cause additional side effects upstream.
    pub fn is_idempotent(&self) -> bool {
        is_idempotent_method(&self.method)
    }
}

pub fn is_idempotent_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_parameters_keep_insertion_order() {
        let request = ApiRequest::get("/call")
            .with_query("limit", 10)
            .with_query("offset", 20);

        assert_eq!(
            request.query,
            vec![
                ("limit".to_string(), "10".to_string()),
                ("offset".to_string(), "20".to_string())
            ]
        );
        assert!(request.body.is_none());
    }

    #[test]
    fn test_idempotency_by_method() {
        assert!(ApiRequest::get("/assistant").is_idempotent());
        assert!(ApiRequest::delete("/assistant/abc").is_idempotent());
        assert!(!ApiRequest::post("/call", json!({})).is_idempotent());
        assert!(!ApiRequest::patch("/assistant/abc", json!({"name": "x"})).is_idempotent());
    }
}
