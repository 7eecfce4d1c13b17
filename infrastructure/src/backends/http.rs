//! Shared request plumbing for HTTP model backends

use council_application::BackendError;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub(super) fn build_client(timeout: Duration) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| BackendError::Transport(e.to_string()))
}

/// Send `request` and decode a JSON success body
pub(super) async fn send_json<Res: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<Res, BackendError> {
    let response = request
        .send()
        .await
        .map_err(|e| BackendError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(BackendError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| BackendError::Decode(e.to_string()))
}
