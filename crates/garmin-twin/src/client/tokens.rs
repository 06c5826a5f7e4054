use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Long-lived OAuth1 token written by `garmin auth login`.
/// Only used here to mint fresh OAuth2 bearers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuth1Token {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mfa_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mfa_expiration_timestamp: Option<DateTime<Utc>>,
    #[serde(default = "default_domain")]
    pub domain: String,
}

fn default_domain() -> String {
    "garmin.com".to_string()
}

/// OAuth2 bearer used on every Connect API request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuth2Token {
    pub scope: String,
    pub jti: String,
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: i64,
    pub refresh_token_expires_in: i64,
    #[serde(default)]
    pub refresh_token_expires_at: i64,
}

impl OAuth2Token {
    /// Expired tokens, or tokens about to expire within a minute, need a refresh
    pub fn is_expired(&self) -> bool {
        self.expires_at - 60 < Utc::now().timestamp()
    }

    /// Fill the absolute expiry fields from the relative ones returned by the exchange
    pub fn stamp_expiry(mut self, now: i64) -> Self {
        self.expires_at = now + self.expires_in;
        self.refresh_token_expires_at = now + self.refresh_token_expires_in;
        self
    }

    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}
