//! Service account credentials and OAuth token exchange

use crate::error::{NotePageError, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The JSON key file downloaded for a service account
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub client_email: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub scope: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| NotePageError::KeyFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut key: ServiceAccountKey =
            serde_json::from_str(&contents).map_err(|e| NotePageError::KeyFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        key.path = path.to_path_buf();
        Ok(key)
    }

    fn invalid(&self, message: &str) -> NotePageError {
        NotePageError::KeyFile {
            path: self.path.clone(),
            message: message.to_string(),
        }
    }

    pub fn claims(&self, issued_at: i64) -> Claims {
        Claims {
            iss: self.client_email.clone(),
            sub: self.client_email.clone(),
            aud: self.token_uri.clone(),
            scope: DATASTORE_SCOPE.to_string(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        }
    }

    /// Signed RS256 JWT used as the bearer grant assertion
    pub fn assertion(&self, issued_at: i64) -> Result<String> {
        if self.client_email.is_empty() {
            return Err(self.invalid("missing client_email"));
        }
        if self.private_key.is_empty() {
            return Err(self.invalid("missing private_key"));
        }

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();
        let signing_key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| self.invalid(&format!("unusable private_key: {}", e)))?;

        jsonwebtoken::encode(&header, &self.claims(issued_at), &signing_key)
            .map_err(|e| NotePageError::Client(format!("failed to sign assertion: {}", e)))
    }

    /// Exchange a fresh assertion for an OAuth access token
    pub fn fetch_access_token(&self, http: &Client) -> Result<String> {
        let assertion = self.assertion(chrono::Utc::now().timestamp())?;
        tracing::debug!(token_uri = %self.token_uri, account = %self.client_email, "requesting access token");

        let response = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(|e| NotePageError::Client(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NotePageError::Client(format!(
                "token exchange failed with HTTP {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| NotePageError::Client(format!("bad token response: {}", e)))?;
        Ok(token.access_token)
    }
}
