use crate::error::{Result, TwinError};
use std::path::Path;

/// Secrets supplied by the environment (or a `.env` file loaded by [`super::AppConfig::load`])
#[derive(Clone, Default)]
pub struct Secrets {
    pub gemini_api_key: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    /// Inline service-account JSON, takes precedence over the key file
    pub google_credentials: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "***" } else { "-" };
        f.debug_struct("Secrets")
            .field("gemini_api_key", &mask(&self.gemini_api_key))
            .field("telegram_token", &mask(&self.telegram_token))
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("google_credentials", &mask(&self.google_credentials))
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: read_var("GEMINI_API_KEY"),
            telegram_token: read_var("TELEGRAM_TOKEN"),
            telegram_chat_id: read_var("TELEGRAM_CHAT_ID"),
            google_credentials: read_var("GOOGLE_CREDENTIALS"),
        }
    }

    pub fn gemini_api_key(&self) -> Result<&str> {
        require(&self.gemini_api_key, "GEMINI_API_KEY")
    }

    pub fn telegram_token(&self) -> Result<&str> {
        require(&self.telegram_token, "TELEGRAM_TOKEN")
    }

    pub fn telegram_chat_id(&self) -> Result<&str> {
        require(&self.telegram_chat_id, "TELEGRAM_CHAT_ID")
    }

    /// Service-account JSON, from `GOOGLE_CREDENTIALS` or else the key file on disk
    pub fn google_service_account(&self, key_file: &Path) -> Result<String> {
        if let Some(inline) = &self.google_credentials {
            return Ok(inline.clone());
        }
        std::fs::read_to_string(key_file).map_err(|e| {
            TwinError::config(format!(
                "No GOOGLE_CREDENTIALS set and could not read {}: {}",
                key_file.display(),
                e
            ))
        })
    }
}

fn read_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| TwinError::config(format!("{} is not set", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_secret_names_variable() {
        let secrets = Secrets::default();
        let err = secrets.telegram_token().unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_TOKEN"));
    }

    #[test]
    fn test_inline_credentials_win_over_file() {
        let secrets = Secrets {
            google_credentials: Some("{\"inline\":true}".to_string()),
            ..Default::default()
        };
        let json = secrets
            .google_service_account(Path::new("/does/not/exist.json"))
            .unwrap();
        assert_eq!(json, "{\"inline\":true}");
    }

    #[test]
    fn test_credentials_read_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("key.json");
        std::fs::write(&path, "{\"file\":true}").unwrap();

        let json = Secrets::default().google_service_account(&path).unwrap();
        assert_eq!(json, "{\"file\":true}");
    }

    #[test]
    fn test_debug_masks_values() {
        let secrets = Secrets {
            gemini_api_key: Some("super-secret".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", secrets);
        assert!(!rendered.contains("super-secret"));
    }
}
