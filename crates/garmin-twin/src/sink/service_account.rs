//! Google service-account authentication (JWT bearer grant)

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TwinError};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion lifetime; Google caps it at one hour
const ASSERTION_TTL_SECS: i64 = 3600;

/// The parts of a service-account key file we use
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"***")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| TwinError::config(format!("Invalid service-account credentials: {}", e)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Sign the RS256 assertion for `scope`
fn assertion(key: &ServiceAccountKey, scope: &str, now: i64) -> Result<String> {
    let claims = Claims {
        iss: key.client_email.clone(),
        scope: scope.to_string(),
        aud: key.token_uri.clone(),
        iat: now,
        exp: now + ASSERTION_TTL_SECS,
    };
    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| TwinError::config(format!("Invalid service-account private key: {}", e)))?;
    encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
        .map_err(|e| TwinError::auth(format!("Failed to sign service-account assertion: {}", e)))
}

/// Exchange a signed assertion for an access token
pub async fn fetch_access_token(key: &ServiceAccountKey, scope: &str) -> Result<String> {
    let jwt = assertion(key, scope, Utc::now().timestamp())?;
    debug!("Requesting access token for {}", key.client_email);

    let response = Client::new()
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", jwt.as_str())])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TwinError::auth(format!(
            "Google token endpoint returned {}: {}",
            status, body
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| TwinError::invalid_response(format!("Failed to parse token response: {}", e)))?;
    Ok(token.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY_JSON: &str = include_str!("../../tests/fixtures/service_account.json");

    #[test]
    fn test_debug_hides_private_key() {
        let key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        let shown = format!("{:?}", key);
        assert!(!shown.contains("BEGIN PRIVATE KEY"));
        assert!(shown.contains("loader@twin-test.iam.gserviceaccount.com"));
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = ServiceAccountKey::from_json("{}").unwrap_err();
        assert!(matches!(err, TwinError::Config(_)));
    }

    #[test]
    fn test_assertion_claims() {
        let key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        let jwt = assertion(&key, SHEETS_SCOPE, 1_700_000_000).unwrap();

        let header = jsonwebtoken::decode_header(&jwt).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);

        let payload = jwt.split('.').nth(1).unwrap();
        let claims: Claims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        assert_eq!(claims.aud, "https://oauth2.googleapis.com/token");
        assert_eq!(claims.iss, "loader@twin-test.iam.gserviceaccount.com");
        assert_eq!(claims.scope, SHEETS_SCOPE);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[tokio::test]
    async fn test_fetch_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.test",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        key.token_uri = format!("{}/token", server.uri());

        let token = fetch_access_token(&key, SHEETS_SCOPE).await.unwrap();
        assert_eq!(token, "ya29.test");
    }

    #[tokio::test]
    async fn test_rejected_grant_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
            .mount(&server)
            .await;

        let mut key = ServiceAccountKey::from_json(KEY_JSON).unwrap();
        key.token_uri = format!("{}/token", server.uri());

        let err = fetch_access_token(&key, SHEETS_SCOPE).await.unwrap_err();
        assert!(matches!(err, TwinError::Authentication(_)));
    }
}
