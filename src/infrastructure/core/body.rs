use crate::domain::errors::ApiError;
use async_trait::async_trait;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use tracing::debug;

/// Reads the whole response body before handing the response back up the chain.
///
/// Installed innermost, so a body that stalls or resets mid-stream surfaces as a
/// network error inside the retry loop instead of after it. Successful responses
/// larger than `max_response_bytes` fail with [`ApiError::ResponseTooLarge`];
/// error bodies are only used for messages and are truncated instead.
pub struct BufferedBodyMiddleware {
    max_response_bytes: u64,
}

impl BufferedBodyMiddleware {
    pub fn new(max_response_bytes: u64) -> Self {
        Self { max_response_bytes }
    }

    async fn buffer(&self, mut response: Response) -> reqwest_middleware::Result<Response> {
        let limit = self.max_response_bytes;
        let strict = response.status().is_success();

        if let Some(declared) = response.content_length() {
            if strict && declared > limit {
                return Err(too_large(limit, declared));
            }
        }

        let mut body = Vec::new();
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(err) if strict => return Err(reqwest_middleware::Error::Reqwest(err)),
                Err(err) => {
                    debug!("Error body truncated after {} bytes: {}", body.len(), err);
                    break;
                }
            };

            let actual = (body.len() + chunk.len()) as u64;
            if actual > limit {
                if strict {
                    return Err(too_large(limit, actual));
                }
                let room = (limit as usize).saturating_sub(body.len());
                body.extend_from_slice(&chunk[..room.min(chunk.len())]);
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(rebuild(&response, body))
    }
}

fn too_large(limit: u64, actual: u64) -> reqwest_middleware::Error {
    reqwest_middleware::Error::Middleware(anyhow::Error::new(ApiError::ResponseTooLarge {
        limit,
        actual,
    }))
}

/// Same status, version and headers, with the buffered bytes as body.
fn rebuild(original: &Response, body: Vec<u8>) -> Response {
    let mut rebuilt = http::Response::new(body);
    *rebuilt.status_mut() = original.status();
    *rebuilt.version_mut() = original.version();
    *rebuilt.headers_mut() = original.headers().clone();
    Response::from(rebuilt)
}

#[async_trait]
impl Middleware for BufferedBodyMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let response = next.run(req, extensions).await?;
        self.buffer(response).await
    }
}
