use crate::config::ClientConfig;
use crate::domain::errors::ApiError;
use crate::infrastructure::core::body::BufferedBodyMiddleware;
use crate::infrastructure::core::latency::LatencyLoggingMiddleware;
use crate::infrastructure::core::retry::RetryMiddleware;
use crate::infrastructure::observability::ClientMetrics;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use url::Url;

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Creates a pooled HTTP client with bearer auth, retry, latency logging and
    /// body buffering.
    ///
    /// Middleware order: retry (outermost) -> latency logging -> body buffering -> network.
    pub fn create_client(
        config: &ClientConfig,
        metrics: Option<ClientMetrics>,
    ) -> Result<ClientWithMiddleware, ApiError> {
        let client = Client::builder()
            .default_headers(default_headers(&config.api_key)?)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ApiError::Configuration {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(ClientBuilder::new(client)
            .with(RetryMiddleware::new(config.retry.clone(), metrics.clone()))
            .with(LatencyLoggingMiddleware::new(metrics))
            .with(BufferedBodyMiddleware::new(config.max_response_bytes))
            .build())
    }
}

fn default_headers(api_key: &str) -> Result<HeaderMap, ApiError> {
    let mut bearer =
        HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|_| {
            ApiError::Configuration {
                message: "API key contains characters that are not valid in a header".to_string(),
            }
        })?;
    bearer.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// Joins `path` onto `base_url` and appends percent-encoded query parameters.
pub fn build_url_with_query<K, V>(
    base_url: &str,
    path: &str,
    params: &[(K, V)],
) -> Result<Url, ApiError>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let joined = if path.is_empty() || path.starts_with('/') {
        format!("{}{}", base_url.trim_end_matches('/'), path)
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), path)
    };

    let mut url = Url::parse(&joined).map_err(|e| ApiError::Configuration {
        message: format!("invalid request URL {}: {}", joined, e),
    })?;

    if !params.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())));
    }

    Ok(url)
}
