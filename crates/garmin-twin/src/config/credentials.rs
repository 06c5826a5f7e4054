use crate::client::{OAuth1Token, OAuth2Token};
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

const OAUTH1_FILENAME: &str = "oauth1_token.json";
const OAUTH2_FILENAME: &str = "oauth2_token.json";

/// Reads the Garmin token pair from disk and writes back refreshed bearers.
///
/// The layout matches what `garmin auth login` produces, so an existing
/// login can be reused by pointing `source.token_dir` at its profile directory.
pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load both tokens, returns None if either is missing
    pub fn load(&self) -> Result<Option<(OAuth1Token, OAuth2Token)>> {
        let oauth1 = read_json::<OAuth1Token>(&self.dir.join(OAUTH1_FILENAME))?;
        let oauth2 = read_json::<OAuth2Token>(&self.dir.join(OAUTH2_FILENAME))?;

        Ok(oauth1.zip(oauth2))
    }

    /// Persist a refreshed OAuth2 token next to the OAuth1 one
    pub fn save_oauth2(&self, token: &OAuth2Token) -> Result<()> {
        super::ensure_dir(&self.dir)?;
        let path = self.dir.join(OAUTH2_FILENAME);
        fs::write(&path, serde_json::to_string_pretty(token)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&json)?))
}
