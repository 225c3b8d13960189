use std::time::Duration;

use reqwest::blocking::{
    Client,
    Response,
};

use crate::core::CardError;

pub fn http_client() -> Result<Client, CardError> {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .user_agent(concat!("anki-vocab/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| CardError::Config(format!("HTTP client build failed: {e}")))
}

/// Returns the body of a non-2xx response as the error message.
pub fn ensure_success(resp: Response) -> Result<Response, String> {
    if !resp.status().is_success() {
        let status = resp.status();
        let url = resp.url().to_string();
        let body = resp.text().unwrap_or_default();
        return Err(format!("HTTP error {} from {}: {}", status, url, body.trim()));
    }
    Ok(resp)
}
