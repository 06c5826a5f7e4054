//! Garmin Connect API client for authenticated requests
//!
//! Thin wrapper over reqwest that attaches the OAuth2 bearer and maps
//! HTTP status codes onto [`TwinError`] variants.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::tokens::OAuth2Token;
use crate::error::{Result, TwinError};

/// User agent for Connect API requests
const API_USER_AGENT: &str = "GCM-iOS-5.7.2.1";

/// Garmin Connect API client
pub struct GarminClient {
    client: Client,
    base_url: String,
}

impl GarminClient {
    /// Create a new API client for the given domain
    pub fn new(domain: &str) -> Result<Self> {
        Self::new_with_base_url(&format!("https://connectapi.{}", domain))
    }

    /// Create a new API client with a custom base URL
    pub fn new_with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build().map_err(TwinError::Http)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn build_headers(&self, token: &OAuth2Token) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(API_USER_AGENT));
        let bearer = HeaderValue::from_str(&token.authorization_header())
            .map_err(|_| TwinError::auth("Access token contains invalid header characters"))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Make an authenticated GET request and return the response
    pub async fn get(&self, token: &OAuth2Token, path: &str) -> Result<Response> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.build_headers(token)?)
            .send()
            .await
            .map_err(TwinError::Http)?;

        handle_response_status(response).await
    }

    /// Make an authenticated GET request and deserialize JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, token: &OAuth2Token, path: &str) -> Result<T> {
        let response = self.get(token, path).await?;
        response.json().await.map_err(|e| {
            TwinError::invalid_response(format!("Failed to parse JSON response: {}", e))
        })
    }
}

/// Handle response status codes and convert to errors
async fn handle_response_status(response: Response) -> Result<Response> {
    let status = response.status();

    match status {
        s if s.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TwinError::auth(format!(
            "Garmin Connect rejected the access token ({})",
            status
        ))),
        StatusCode::TOO_MANY_REQUESTS => Err(TwinError::RateLimited),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(TwinError::api(status.as_u16(), body))
        }
    }
}
