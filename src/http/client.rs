use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

// Shared HTTP client instance.
lazy_static::lazy_static! {
    static ref CLIENT: Arc<reqwest::Client> = Arc::new(reqwest::Client::new());
}

/// Custom error type for provider requests.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Environment variable 'marketdata_token' not set")]
    TokenNotSet,
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("HTTP error: {0} returned {1}. Response body: {2}")]
    HttpError(Url, u16, String),
    #[error("Error deserializing JSON: {0}")]
    JsonError(String),
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Other error: {0}")]
    Other(String),
}

/// Builds the request URL from a base, a relative path and query parameters.
pub fn build_url(base: &str, path: &str, params: &[(&str, String)]) -> Result<Url, RequestError> {
    let mut url = Url::parse(base)?.join(path)?;
    if !params.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
    }
    Ok(url)
}

/// Issues a GET request and decodes the JSON body.
pub async fn get<T: DeserializeOwned>(url: Url, token: Option<&str>) -> Result<T, RequestError> {
    let mut req = CLIENT.get(url.as_str());
    if let Some(token) = token {
        req = req.bearer_auth(token)
    }

    let response = req
        .send()
        .await
        .map_err(|e| RequestError::Other(e.to_string()))?;

    // Handle non-success status codes.
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .map_err(|e| RequestError::Other(e.to_string()))?;
        return Err(RequestError::HttpError(url, status.as_u16(), body));
    }

    response
        .json()
        .await
        .map_err(|e| RequestError::JsonError(e.to_string()))
}
