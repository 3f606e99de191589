//! Subreddit post listing for the ingestion driver.
//!
//! Posts come from the subreddit search endpoint; a script-app OAuth
//! token (password grant) is obtained once at connect time from a local
//! secrets file.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::url::extract_urls;

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_BASE: &str = "https://oauth.reddit.com";
const DEFAULT_USER_AGENT: &str = concat!("scores-dl/", env!("CARGO_PKG_VERSION"));

/// One candidate post.
#[derive(Debug, Clone)]
pub struct Post {
    /// Host-assigned post identifier.
    pub id: String,
    /// Post title, used as the per-post destination directory name.
    pub title: String,
    /// Canonical link back to the post.
    pub permalink: String,
    /// Self-text body (empty for link posts).
    pub body: String,
    /// Outbound link for link posts.
    pub link_url: Option<String>,
    /// True for self (text) posts.
    pub is_self: bool,
}

impl Post {
    /// URLs worth dispatching for this post: every URL found in the body
    /// for self posts, the outbound link otherwise.
    #[must_use]
    pub fn candidate_urls(&self) -> Vec<String> {
        if self.is_self {
            extract_urls(&self.body)
        } else {
            self.link_url.clone().into_iter().collect()
        }
    }
}

/// Anything that can enumerate candidate posts.
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Lists candidate posts, newest first.
    async fn posts(&self) -> Result<Vec<Post>>;
}

/// Script-app credentials as stored in the secrets file.
#[derive(Debug, Clone, Deserialize)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

// Listing envelope: { data: { children: [ { data: {...} } ] } }
#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: SubmissionData,
}

#[derive(Debug, Deserialize)]
struct SubmissionData {
    id: String,
    title: String,
    permalink: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    is_self: bool,
}

impl From<SubmissionData> for Post {
    fn from(data: SubmissionData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            permalink: data.permalink,
            body: data.selftext,
            link_url: data.url,
            is_self: data.is_self,
        }
    }
}

/// Authenticated subreddit search client.
pub struct RedditClient {
    http: reqwest::Client,
    access_token: String,
    user_agent: String,
    subreddit: String,
    query: String,
    limit: u32,
}

impl RedditClient {
    /// Authenticates a script app from `secrets_path` and returns a client
    /// searching `subreddit` for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] when the secrets file is unusable
    /// or the token endpoint rejects the grant.
    pub async fn connect(
        secrets_path: &Path,
        subreddit: &str,
        query: &str,
        limit: u32,
    ) -> Result<Self> {
        let contents = std::fs::read_to_string(secrets_path).map_err(|e| {
            Error::Authentication(format!("cannot read {}: {e}", secrets_path.display()))
        })?;
        let creds: RedditCredentials = serde_json::from_str(&contents).map_err(|e| {
            Error::Authentication(format!("cannot parse {}: {e}", secrets_path.display()))
        })?;
        let user_agent = creds
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());

        let http = reqwest::Client::new();
        let response = http
            .post(TOKEN_URL)
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .header(reqwest::header::USER_AGENT, &user_agent)
            .form(&[
                ("grant_type", "password"),
                ("username", &creds.username),
                ("password", &creds.password),
            ])
            .send()
            .await
            .map_err(|e| Error::Authentication(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Authentication(format!(
                "token request rejected: {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Authentication(format!("bad token response: {e}")))?;

        Ok(Self {
            http,
            access_token: token.access_token,
            user_agent,
            subreddit: subreddit.to_owned(),
            query: query.to_owned(),
            limit,
        })
    }
}

#[async_trait]
impl PostSource for RedditClient {
    async fn posts(&self) -> Result<Vec<Post>> {
        let listing: Listing = self
            .http
            .get(format!("{OAUTH_BASE}/r/{}/search.json", self.subreddit))
            .query(&[
                ("q", self.query.clone()),
                ("sort", "new".to_owned()),
                ("restrict_sr", "1".to_owned()),
                ("limit", self.limit.to_string()),
            ])
            .bearer_auth(&self.access_token)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| child.data.into())
            .collect())
    }
}
