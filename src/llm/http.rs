use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

use crate::errors::ReproError;

/// Upper bound for a single completion request.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Plans should be reproducible, not creative.
pub(crate) const TEMPERATURE: f64 = 0.2;

pub(crate) const MAX_TOKENS: u32 = 4096;

pub(crate) fn client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Map transport failures onto the retry taxonomy.
pub(crate) fn send_error(provider: &str, err: reqwest::Error) -> ReproError {
    if err.is_timeout() {
        ReproError::Timeout(format!("{} request timed out", provider))
    } else {
        ReproError::Network(format!("{} request failed: {}", provider, err))
    }
}

/// Pass successful responses through; turn HTTP failures into typed errors.
pub(crate) async fn check_status(provider: &str, resp: Response) -> Result<Response, ReproError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(status_error(provider, status, &body))
}

pub(crate) fn status_error(provider: &str, status: StatusCode, body: &str) -> ReproError {
    let detail = error_message(body).unwrap_or_else(|| status.to_string());
    match status {
        StatusCode::TOO_MANY_REQUESTS => ReproError::RateLimit(format!("{}: {}", provider, detail)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ReproError::Authentication(format!("{} rejected the API key: {}", provider, detail))
        }
        StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
            ReproError::Config(format!("{} refused the request: {}", provider, detail))
        }
        _ => ReproError::LLMApi(format!("{} returned {}: {}", provider, status.as_u16(), detail)),
    }
}

/// Both API families wrap failures as `{"error": {"message": ...}}`.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}
