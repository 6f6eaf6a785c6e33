use reqwest::Client;
use url::Url;

use crate::auth::Token;
use crate::error::{BuildWatchError, Result};

/// GitLab REST API client.
///
/// Thin wrapper around `reqwest` that knows the v4 API root, attaches the
/// bearer token when one is configured, and turns non-success responses into
/// typed errors.
pub struct GitLabClient {
    client: Client,
    api_url: Url,
    base_url: String,
    token: Option<Token>,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("buildwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BuildWatchError::Config(format!("Failed to create HTTP client: {e}")))?;

        let api_url = Url::parse(base_url)
            .map_err(|e| BuildWatchError::Config(format!("Invalid base URL: {e}")))?
            .join("api/v4/")
            .map_err(|e| BuildWatchError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            api_url,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Instance base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Helper to build authenticated requests
    pub fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    /// Construct project base URL
    pub fn project_url(&self, project_path: &str) -> Result<Url> {
        self.api_url
            .join(&format!("projects/{}/", encode_project_path(project_path)))
            .map_err(|e| BuildWatchError::Config(format!("Invalid project URL: {e}")))
    }

    /// GET a JSON resource, mapping non-success statuses to an API error.
    pub async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.auth_request(self.client.get(url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(BuildWatchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// GET a JSON resource and the value of one response header.
    ///
    /// Used by the pagination canary, which needs `x-total-pages` alongside
    /// the first page body.
    pub async fn get_json_with_header<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        header: &str,
    ) -> Result<(T, Option<String>)> {
        let response = self.auth_request(self.client.get(url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(BuildWatchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let header_value = response
            .headers()
            .get(header)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        Ok((response.json().await?, header_value))
    }
}

// Project paths are used as a single URL segment ('group/project' becomes
// 'group%2Fproject').
fn encode_project_path(project_path: &str) -> String {
    project_path.replace('/', "%2F")
}
