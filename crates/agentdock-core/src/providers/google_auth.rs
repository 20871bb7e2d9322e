//! Google OAuth credentials for Vertex AI
//!
//! Credentials come from an explicit JSON blob or from the ambient chain:
//! `GOOGLE_APPLICATION_CREDENTIALS`, then gcloud's
//! `application_default_credentials.json`, then the GCE metadata server.
//! Every token fetch goes through the injected HTTP client.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::auth::AuthLayer;
use super::error::{ProviderError, ProviderResult};
use super::http::read_error_body;

/// OAuth scope for Vertex AI calls
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Tokens are refreshed this long before they expire
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Service account key file contents
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

/// gcloud user credentials (`gcloud auth application-default login`)
#[derive(Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CredentialsFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
}

/// Where Vertex access tokens come from
#[derive(Clone)]
pub enum GoogleCredentials {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
    MetadataServer,
}

impl std::fmt::Debug for GoogleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoogleCredentials::ServiceAccount(key) => f
                .debug_struct("ServiceAccount")
                .field("client_email", &key.client_email)
                .finish_non_exhaustive(),
            GoogleCredentials::AuthorizedUser(user) => f
                .debug_struct("AuthorizedUser")
                .field("client_id", &user.client_id)
                .finish_non_exhaustive(),
            GoogleCredentials::MetadataServer => write!(f, "MetadataServer"),
        }
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Access token with its expiry
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN < self.expires_at
    }
}

impl GoogleCredentials {
    /// Parse a `service_account` or `authorized_user` JSON blob
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json)
            .map_err(|e| ProviderError::Auth(format!("unsupported credentials JSON: {}", e)))?;
        Ok(match file {
            CredentialsFile::ServiceAccount(key) => GoogleCredentials::ServiceAccount(key),
            CredentialsFile::AuthorizedUser(user) => GoogleCredentials::AuthorizedUser(user),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ProviderError::Auth(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// gcloud's application default credentials file
    pub fn well_known_file() -> Option<PathBuf> {
        gcloud_config_dir(std::env::var_os("CLOUDSDK_CONFIG"))
            .map(|dir| dir.join("application_default_credentials.json"))
    }

    /// Ambient discovery; falls back to the metadata server
    pub fn detect_default() -> ProviderResult<Self> {
        if let Ok(path) = std::env::var("GOOGLE_APPLICATION_CREDENTIALS") {
            if !path.trim().is_empty() {
                return Self::from_file(path.trim());
            }
        }
        if let Some(path) = Self::well_known_file().filter(|p| p.exists()) {
            return Self::from_file(&path);
        }
        Ok(GoogleCredentials::MetadataServer)
    }

    /// Short name for logs
    pub fn describe(&self) -> &'static str {
        match self {
            GoogleCredentials::ServiceAccount(_) => "service account",
            GoogleCredentials::AuthorizedUser(_) => "authorized user",
            GoogleCredentials::MetadataServer => "metadata server",
        }
    }

    /// Fetch a new access token
    pub async fn fetch(&self, http: &reqwest::Client) -> ProviderResult<AccessToken> {
        let request = match self {
            GoogleCredentials::ServiceAccount(key) => {
                let token_uri = key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
                let assertion = sign_assertion(key, token_uri)?;
                http.post(token_uri)
                    .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            }
            GoogleCredentials::AuthorizedUser(user) => {
                let token_uri = user.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
                http.post(token_uri).form(&[
                    ("grant_type", "refresh_token"),
                    ("client_id", user.client_id.as_str()),
                    ("client_secret", user.client_secret.as_str()),
                    ("refresh_token", user.refresh_token.as_str()),
                ])
            }
            GoogleCredentials::MetadataServer => http
                .get(METADATA_TOKEN_URL)
                .header("Metadata-Flavor", "Google"),
        };

        let response = request
            .send()
            .await
            .map_err(|e| {
                ProviderError::Auth(format!("{} token request failed: {}", self.describe(), e))
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = read_error_body(response).await;
            return Err(ProviderError::Auth(format!(
                "{} token endpoint returned {}: {}",
                self.describe(),
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(AccessToken {
            token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in.unwrap_or(3600)),
        })
    }
}

/// gcloud keeps its config under `%APPDATA%` on Windows and `~/.config`
/// everywhere else, macOS included
fn gcloud_config_dir(cloudsdk_config: Option<OsString>) -> Option<PathBuf> {
    if let Some(dir) = cloudsdk_config.filter(|dir| !dir.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    if cfg!(windows) {
        dirs::config_dir().map(|dir| dir.join("gcloud"))
    } else {
        dirs::home_dir().map(|home| home.join(".config").join("gcloud"))
    }
}

fn sign_assertion(key: &ServiceAccountKey, token_uri: &str) -> ProviderResult<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let claims = Claims {
        iss: &key.client_email,
        scope: CLOUD_PLATFORM_SCOPE,
        aud: token_uri,
        iat: now,
        exp: now + 3600,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| ProviderError::Auth(format!("invalid service account key: {}", e)))?;
    jsonwebtoken::encode(&header, &claims, &encoding_key)
        .map_err(|e| ProviderError::Auth(format!("cannot sign assertion: {}", e)))
}

/// Caching token source over one set of credentials
pub struct TokenSource {
    credentials: GoogleCredentials,
    http: reqwest::Client,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenSource {
    pub fn new(credentials: GoogleCredentials, http: reqwest::Client) -> Self {
        Self {
            credentials,
            http,
            cached: Mutex::new(None),
        }
    }

    pub fn credentials(&self) -> &GoogleCredentials {
        &self.credentials
    }

    /// Current token, fetched again shortly before expiry
    pub async fn token(&self) -> ProviderResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.token.clone());
        }
        let fresh = self.credentials.fetch(&self.http).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}

#[async_trait]
impl AuthLayer for TokenSource {
    async fn apply(&self, request: RequestBuilder) -> ProviderResult<RequestBuilder> {
        Ok(request.bearer_auth(self.token().await?))
    }
}
