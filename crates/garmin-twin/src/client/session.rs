//! Session bootstrap for unattended runs
//!
//! There is no interactive login here: the pipeline reuses the token pair
//! of an existing garmin-cli login and mints a fresh bearer when needed.

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use tracing::{debug, info};

use crate::client::oauth1::{OAuth1Signer, OAuthConsumer};
use crate::client::tokens::{OAuth1Token, OAuth2Token};
use crate::client::GarminClient;
use crate::config::{SourceConfig, TokenStore};
use crate::error::{Result, TwinError};

/// User agent mimicking the Garmin mobile app
const MOBILE_USER_AGENT: &str = "com.garmin.android.apps.connectmobile";

const EXCHANGE_PATH: &str = "/oauth-service/oauth/exchange/user/2.0";

/// An authenticated Connect API session
pub struct Session {
    pub client: GarminClient,
    pub token: OAuth2Token,
}

impl Session {
    /// Load the stored tokens, refreshing the bearer if it expired
    pub async fn login(config: &SourceConfig) -> Result<Self> {
        let store = TokenStore::new(&config.token_dir);
        let (oauth1, oauth2) = store.load()?.ok_or(TwinError::NotAuthenticated)?;

        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| format!("https://connectapi.{}", oauth1.domain));

        let token = if oauth2.is_expired() {
            info!("Access token expired, exchanging OAuth1 token for a new one");
            let consumer = fetch_consumer(&config.consumer_url).await?;
            let fresh = exchange(&api_base, &consumer, &oauth1).await?;
            store.save_oauth2(&fresh)?;
            fresh
        } else {
            debug!("Reusing stored access token from {}", store.dir().display());
            oauth2
        };

        Ok(Self {
            client: GarminClient::new_with_base_url(&api_base)?,
            token,
        })
    }
}

/// Fetch the consumer key pair used to sign the exchange
async fn fetch_consumer(url: &str) -> Result<OAuthConsumer> {
    let response = Client::new().get(url).send().await?;
    if !response.status().is_success() {
        return Err(TwinError::auth(format!(
            "Could not fetch OAuth consumer ({})",
            response.status()
        )));
    }
    response
        .json()
        .await
        .map_err(|e| TwinError::invalid_response(format!("Failed to parse OAuth consumer: {}", e)))
}

/// Trade the OAuth1 token for a fresh OAuth2 bearer
async fn exchange(
    api_base: &str,
    consumer: &OAuthConsumer,
    oauth1: &OAuth1Token,
) -> Result<OAuth2Token> {
    let url = format!("{}{}", api_base.trim_end_matches('/'), EXCHANGE_PATH);
    let form: Vec<(String, String)> = oauth1
        .mfa_token
        .iter()
        .map(|mfa| ("mfa_token".to_string(), mfa.clone()))
        .collect();

    let header = OAuth1Signer::new(consumer.clone())
        .with_token(&oauth1.oauth_token, &oauth1.oauth_token_secret)
        .sign("POST", &url, &form)?;

    let response = Client::new()
        .post(&url)
        .header(USER_AGENT, MOBILE_USER_AGENT)
        .header("Authorization", header)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .form(&form)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(TwinError::auth(format!(
            "Failed to exchange OAuth1 for OAuth2: {}",
            status
        )));
    }

    let token: OAuth2Token = response
        .json()
        .await
        .map_err(|e| TwinError::invalid_response(format!("Failed to parse OAuth2 token: {}", e)))?;

    Ok(token.stamp_expiry(chrono::Utc::now().timestamp()))
}
