//! Google Drive host implementation.
//!
//! Talks to the Drive v3 REST API with a user OAuth token loaded from a
//! local secrets file. An expired token is refreshed once at connect time
//! and the refreshed token is written back for the next run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fetch::{self, FetchOptions, HostApi};
use crate::node::{Metadata, NodeId, Tree};
use crate::registry::FileHost;
use crate::sink::ApplySink;

/// Hostname this implementation answers for.
pub const DRIVE_HOST: &str = "drive.google.com";

const API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// How long before nominal expiry a token is treated as expired, to cover
/// clock skew and request latency.
const EXPIRY_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_owned()
}

/// OAuth user token as stored in the secrets file (the authorized-user
/// JSON layout).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveToken {
    pub access_token: String,
    pub refresh_token: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl DriveToken {
    /// True when the access token is past (or within the safety margin
    /// of) its recorded expiry. An unknown expiry counts as expired so a
    /// refresh establishes one.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .is_none_or(|e| e - chrono::TimeDelta::seconds(EXPIRY_MARGIN_SECS) <= now)
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// A Drive user credential tied to the secrets file it came from.
#[derive(Debug, Clone)]
pub struct DriveCredentials {
    token: DriveToken,
    path: PathBuf,
}

impl DriveCredentials {
    /// Loads a credential from a JSON secrets file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] when the file is missing or not a
    /// valid token document.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Authentication(format!("cannot read {}: {e}", path.display()))
        })?;
        let token: DriveToken = serde_json::from_str(&contents).map_err(|e| {
            Error::Authentication(format!("cannot parse {}: {e}", path.display()))
        })?;
        Ok(Self {
            token,
            path: path.to_path_buf(),
        })
    }

    /// The current access token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.token.access_token
    }

    /// Refreshes the access token if it is expired, persisting the new
    /// token back to the secrets file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] when the token endpoint rejects
    /// the refresh or cannot be reached.
    pub async fn ensure_fresh(&mut self, http: &reqwest::Client) -> Result<()> {
        if !self.token.is_expired(Utc::now()) {
            return Ok(());
        }

        log::info!("access token expired, refreshing");
        let response = http
            .post(&self.token.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", &self.token.refresh_token),
                ("client_id", &self.token.client_id),
                ("client_secret", &self.token.client_secret),
            ])
            .send()
            .await
            .map_err(|e| Error::Authentication(format!("token refresh request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Authentication(format!(
                "token refresh rejected: {}",
                response.status()
            )));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| Error::Authentication(format!("bad token refresh response: {e}")))?;

        self.token.access_token = refreshed.access_token;
        self.token.expiry = refreshed
            .expires_in
            .map(|secs| Utc::now() + chrono::TimeDelta::seconds(secs));
        self.save()?;
        Ok(())
    }

    /// Writes the token back to the secrets file (write tmp + rename).
    fn save(&self) -> Result<()> {
        let tmp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&self.token)?;
        std::fs::write(&tmp_path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&tmp_path, perms)?;
        }

        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Authenticated Drive v3 REST client answering the [`HostApi`] calls.
pub struct DriveApi {
    http: reqwest::Client,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct DriveListing {
    #[serde(default)]
    files: Vec<DriveFileRef>,
}

#[derive(Debug, Deserialize)]
struct DriveFileRef {
    id: String,
}

#[async_trait]
impl HostApi for DriveApi {
    async fn metadata(&self, id: &str) -> Result<Metadata> {
        let value: serde_json::Value = self
            .http
            .get(format!("{API_BASE}/files/{id}"))
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(Metadata::from_value(value))
    }

    async fn children(&self, folder_id: &str) -> Result<Vec<String>> {
        let listing: DriveListing = self
            .http
            .get(format!("{API_BASE}/files"))
            .query(&[("q", format!("'{folder_id}' in parents"))])
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(listing.files.into_iter().map(|f| f.id).collect())
    }

    async fn content(&self, id: &str) -> Result<Bytes> {
        let response = self
            .http
            .get(format!("{API_BASE}/files/{id}"))
            .query(&[("alt", "media")])
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?;

        let mut stream = response.bytes_stream();
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

/// Builds a configured HTTP client for Drive requests.
fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .pool_max_idle_per_host(8)
        .tcp_keepalive(Duration::from_secs(30))
        .build()
}

/// The `drive.google.com` [`FileHost`].
pub struct GoogleDriveHost {
    api: DriveApi,
}

impl GoogleDriveHost {
    /// Loads credentials from `secrets_path`, refreshing the access token
    /// if needed, and returns a ready host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] when no usable credential can be
    /// established.
    pub async fn connect(secrets_path: &Path) -> Result<Self> {
        let http = build_http_client()?;
        let mut credentials = DriveCredentials::load(secrets_path)?;
        credentials.ensure_fresh(&http).await?;
        Ok(Self {
            api: DriveApi {
                http,
                access_token: credentials.access_token().to_owned(),
            },
        })
    }

    /// Extracts a Drive file identifier from a URL: the longest
    /// slash-delimited segment of the URL path.
    #[must_use]
    pub fn file_id(url: &str) -> String {
        let parsed = reqwest::Url::parse(url).ok();
        let path = parsed.as_ref().map_or(url, reqwest::Url::path);
        path.split('/')
            .max_by_key(|segment| segment.len())
            .unwrap_or_default()
            .to_owned()
    }
}

#[async_trait]
impl FileHost for GoogleDriveHost {
    fn host(&self) -> &'static str {
        DRIVE_HOST
    }

    async fn fetch(
        &self,
        target: &str,
        is_url: bool,
        options: &FetchOptions,
        sink: &dyn ApplySink,
    ) -> Result<(Tree, NodeId)> {
        let id = if is_url {
            Self::file_id(target)
        } else {
            target.to_owned()
        };
        fetch::fetch_tree(&self.api, &id, options, sink).await
    }
}
