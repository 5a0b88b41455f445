use crate::config::ClientConfig;
use crate::domain::errors::ApiError;
use crate::domain::ports::RequestExecutor;
use crate::domain::request::ApiRequest;
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use crate::infrastructure::core::retry::AttemptContext;
use crate::infrastructure::observability::ClientMetrics;
use async_trait::async_trait;
use http::Extensions;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use std::error::Error as StdError;
use tracing::debug;

const MAX_ERROR_BODY_CHARS: usize = 500;

/// HTTP transport for the VAPI REST API.
///
/// Every call goes through the retry, latency and body-buffering middleware; the
/// outcome is mapped into [`ApiError`] with the number of attempts that were made.
pub struct VapiTransport {
    client: ClientWithMiddleware,
    base_url: String,
}

impl VapiTransport {
    pub fn new(config: &ClientConfig, metrics: Option<ClientMetrics>) -> Result<Self, ApiError> {
        Ok(Self {
            client: HttpClientFactory::create_client(config, metrics)?,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = build_url_with_query(&self.base_url, &request.path, &request.query)?;

        let mut http_request = reqwest::Request::new(request.method.clone(), url);
        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body).map_err(|e| ApiError::Decode {
                message: format!("failed to encode request body: {}", e),
            })?;
            *http_request.body_mut() = Some(bytes.into());
        }

        let mut extensions = Extensions::new();
        let outcome = self
            .client
            .execute_with_extensions(http_request, &mut extensions)
            .await;
        let attempts = extensions
            .get::<AttemptContext>()
            .map(|ctx| ctx.attempt)
            .unwrap_or(1);

        let response = outcome.map_err(|err| transport_error(err, attempts))?;

        // Already buffered by the middleware chain.
        let status = response.status();
        let body = response.bytes().await.map_err(|e| ApiError::Network {
            message: error_chain(&e),
            attempts,
        })?;
        if status.is_success() {
            return decode_body(&body);
        }

        let message = error_message(status, &body);
        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            attempts,
            "VAPI request failed: {}",
            message
        );

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Err(ApiError::TransientFailure {
                status: status.as_u16(),
                message,
                attempts,
            })
        } else {
            Err(ApiError::Client {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl RequestExecutor for VapiTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError> {
        self.send(request).await
    }
}

/// Errors raised by our own middleware keep their type; anything else means no
/// usable response arrived.
fn transport_error(err: reqwest_middleware::Error, attempts: u32) -> ApiError {
    if let reqwest_middleware::Error::Middleware(inner) = &err {
        if let Some(api_error) = inner.downcast_ref::<ApiError>() {
            return api_error.clone();
        }
    }
    ApiError::Network {
        message: error_chain(&err),
        attempts,
    }
}

fn decode_body(body: &[u8]) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| ApiError::Decode {
        message: e.to_string(),
    })
}

/// Extracts the provider's error message (`message` as string or list, then `error`),
/// falling back to the raw body and finally the status reason.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        match value.get("message") {
            Some(Value::String(message)) => return message.clone(),
            Some(Value::Array(items)) => {
                let joined = items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("; ");
                if !joined.is_empty() {
                    return joined;
                }
            }
            _ => {}
        }
        if let Some(error) = value.get("error").and_then(Value::as_str) {
            return error.to_string();
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        text.chars().take(MAX_ERROR_BODY_CHARS).collect()
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_prefers_provider_message() {
        let body = br#"{"message":"assistantId must be a UUID","error":"Bad Request","statusCode":400}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "assistantId must be a UUID"
        );
    }

    #[test]
    fn test_error_message_joins_validation_lists() {
        let body = br#"{"message":["name too long","voice required"]}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "name too long; voice required"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_reason() {
        assert_eq!(
            error_message(StatusCode::SERVICE_UNAVAILABLE, b""),
            "Service Unavailable"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, b"upstream down"),
            "upstream down"
        );
    }

    #[test]
    fn test_transport_error_keeps_middleware_api_errors() {
        let too_large = reqwest_middleware::Error::Middleware(anyhow::Error::new(
            ApiError::ResponseTooLarge {
                limit: 16,
                actual: 100,
            },
        ));
        assert_eq!(
            transport_error(too_large, 1),
            ApiError::ResponseTooLarge {
                limit: 16,
                actual: 100
            }
        );

        let other = reqwest_middleware::Error::Middleware(anyhow::anyhow!("chain broke"));
        assert!(matches!(
            transport_error(other, 3),
            ApiError::Network { attempts: 3, .. }
        ));
    }

    #[test]
    fn test_decode_empty_body_is_null() {
        assert_eq!(decode_body(b"").unwrap(), Value::Null);
        assert_eq!(decode_body(b"  \n").unwrap(), Value::Null);
        assert_eq!(decode_body(br#"[{"id":"a"}]"#).unwrap(), json!([{"id": "a"}]));
        assert!(matches!(
            decode_body(b"<html>"),
            Err(ApiError::Decode { .. })
        ));
    }
}
