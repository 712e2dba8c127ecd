//! Reqwest-backed Pixiv app-API client.
//!
//! Speaks the Android-app API with refresh-token OAuth. An expired access
//! token (400 + `invalid_grant`) triggers one re-login and a single replay
//! of the failed request; transient network and server errors go through
//! the shared retry policy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use pixm_runtime::retry::{with_retry, RetryPolicy};

use crate::error::{ApiError, Result};
use crate::gallery::{GalleryApi, ListingSource};
use crate::mapping::map_author_profile;
use crate::models::AuthorProfile;
use crate::types::{AuthorDetailResponse, ListingPage, OauthResponse, RawUgoiraMetadata, UgoiraMetadataResponse};

const APP_API_BASE: &str = "https://app-api.pixiv.net";
const OAUTH_TOKEN_URL: &str = "https://oauth.secure.pixiv.net/auth/token";

// Android app client credentials, required by the OAuth endpoint.
const CLIENT_ID: &str = "MOBrBDS8blbauoSck0ZfDbtuzpyT";
const CLIENT_SECRET: &str = "lsACyCD94FhDUtGTXi3QzcFE2uU1hqtDaKeqrdwj";

/// API request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

struct AuthState {
    access_token: Option<String>,
    refresh_token: String,
}

/// Pixiv app-API client.
pub struct PixivAppApi {
    client: Client,
    base_url: String,
    oauth_url: String,
    auth: RwLock<AuthState>,
    retry: RetryPolicy,
}

impl PixivAppApi {
    /// Create a client with the Android-app header set.
    ///
    /// `language` becomes the `Accept-Language` header and controls
    /// translated tag names in responses.
    pub fn new(refresh_token: impl Into<String>, language: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("App-OS", HeaderValue::from_static("android"));
        headers.insert("App-OS-Version", HeaderValue::from_static("8.1.0"));
        headers.insert("App-Version", HeaderValue::from_static("5.0.132"));
        headers.insert(
            "Referer",
            HeaderValue::from_static("https://app-api.pixiv.net/"),
        );
        if let Ok(value) = HeaderValue::from_str(language) {
            headers.insert("Accept-Language", value);
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("PixivAndroidApp/5.0.132 (Android 8.1.0; Android SDK built for x86)")
            .default_headers(headers)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: APP_API_BASE.to_string(),
            oauth_url: OAUTH_TOKEN_URL.to_string(),
            auth: RwLock::new(AuthState {
                access_token: None,
                refresh_token: refresh_token.into(),
            }),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the API and OAuth endpoints (tests).
    pub fn with_endpoints(mut self, base_url: impl Into<String>, oauth_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self.oauth_url = oauth_url.into();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Log in with the configured refresh token, storing the access token
    /// for subsequent requests.
    #[instrument(skip(self))]
    pub async fn login(&self) -> Result<()> {
        let refresh_token = self.auth.read().await.refresh_token.clone();
        if refresh_token.is_empty() {
            return Err(ApiError::Auth("no refresh token configured".to_string()));
        }

        let params = [
            ("client_id", CLIENT_ID),
            ("client_secret", CLIENT_SECRET),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("device_token", "pixiv"),
            ("get_secure_url", "true"),
        ];

        let response = with_retry(&self.retry, ApiError::is_transient, "OAuth login", || async {
            Ok::<_, ApiError>(self.client.post(&self.oauth_url).form(&params).send().await?)
        })
        .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Auth(format!("login failed with status {status}: {body}")));
        }

        let parsed: OauthResponse = response.json().await?;
        let mut auth = self.auth.write().await;
        auth.access_token = Some(parsed.response.access_token);
        auth.refresh_token = parsed.response.refresh_token;
        info!(user_id = %parsed.response.user.id, "Login successful");
        Ok(())
    }

    async fn authorized_get(&self, url: &str) -> Result<reqwest::Response> {
        let token = self.auth.read().await.access_token.clone();
        let mut request = self.client.get(url);
        match token {
            Some(token) => request = request.bearer_auth(token),
            None => warn!("Empty access token"),
        }
        Ok(request.send().await?)
    }

    async fn get_json_once<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url, "API request");
        let response = self.authorized_get(url).await?;
        let status = response.status().as_u16();
        if status == 200 {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        if status == 400 && body.contains("invalid_grant") {
            warn!("Access token expired, re-login");
            self.login().await?;
            let replay = self.authorized_get(url).await?;
            let status = replay.status().as_u16();
            if status == 200 {
                return Ok(replay.json().await?);
            }
            return Err(ApiError::Status {
                status,
                url: url.to_string(),
            });
        }

        debug!(status, url, body, "API request failed");
        Err(ApiError::Status {
            status,
            url: url.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        with_retry(&self.retry, ApiError::is_transient, "API request", || {
            self.get_json_once(url)
        })
        .await
    }

    fn listing_url(&self, source: ListingSource, author_id: i64) -> String {
        match source {
            ListingSource::Works => {
                format!("{}/v1/user/illusts?user_id={author_id}", self.base_url)
            }
            ListingSource::Bookmarks { private } => {
                let restrict = if private { "private" } else { "public" };
                format!(
                    "{}/v1/user/bookmarks/illust?user_id={author_id}&restrict={restrict}",
                    self.base_url
                )
            }
        }
    }
}

#[async_trait]
impl GalleryApi for PixivAppApi {
    #[instrument(skip(self))]
    async fn fetch_listing_page(
        &self,
        source: ListingSource,
        author_id: i64,
    ) -> Result<ListingPage> {
        self.get_json(&self.listing_url(source, author_id)).await
    }

    async fn fetch_next_page(&self, next_url: &str) -> Result<ListingPage> {
        self.get_json(next_url).await
    }

    #[instrument(skip(self))]
    async fn fetch_animation_metadata(&self, item_id: i64) -> Result<RawUgoiraMetadata> {
        let url = format!("{}/v1/ugoira/metadata?illust_id={item_id}", self.base_url);
        let response: UgoiraMetadataResponse = self.get_json(&url).await?;
        Ok(response.ugoira_metadata)
    }

    #[instrument(skip(self))]
    async fn fetch_author_profile(&self, author_id: i64) -> Result<AuthorProfile> {
        let url = format!("{}/v1/user/detail?user_id={author_id}", self.base_url);
        let response: AuthorDetailResponse = self.get_json(&url).await?;
        Ok(map_author_profile(&response))
    }
}
