use std::path::Path;

use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use serde::Deserialize;
use serde::Serialize;

use super::NluError;

const TOKEN_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Google service-account key, as downloaded from the cloud console.
///
/// Only the fields needed to obtain an access token are kept.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,

    #[serde(default)]
    pub private_key_id: Option<String>,

    pub private_key: String,

    pub client_email: String,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

impl ServiceAccount {
    /// Load a service-account key file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NluError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| NluError::CredentialsIo(path.to_path_buf(), e))?;
        serde_json::from_str(&contents)
            .map_err(|e| NluError::CredentialsParse(path.to_path_buf(), e))
    }

    /// Build the signed JWT assertion exchanged at `token_uri` for an access token.
    pub fn token_assertion(&self, scope: &str) -> Result<String, NluError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(TOKEN_LIFETIME_SECS);
        let claims = Claims {
            iss: &self.client_email,
            scope,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| NluError::Signing(e.to_string()))?;
        encode(&header, &claims, &key).map_err(|e| NluError::Signing(e.to_string()))
    }
}
