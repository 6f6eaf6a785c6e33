use log::warn;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;

use crate::auth::Token;
use crate::error::{BuildWatchError, Result};

/// GitHub API client for dependency-update tracking.
///
/// Counts open pull requests labelled `dependencies` per repository mirror.
/// Construction requires a token; callers without one skip the capability.
#[derive(Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    organization: String,
}

impl GitHubClient {
    pub fn new(base_url: &str, organization: &str, token: &Token) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("buildwatch/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                .map_err(|e| BuildWatchError::Config(format!("Invalid GitHub token: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| BuildWatchError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            organization: organization.to_string(),
        })
    }

    /// Count of open dependency-update pull requests for one repository.
    ///
    /// Lookups are independent per repository; a failure degrades to `None`
    /// for that repository only.
    pub async fn dependency_pendings(&self, repo: &str) -> Option<u64> {
        match self.search_open_dependency_prs(repo).await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!("Dependency PR lookup failed for {repo}: {e}");
                None
            }
        }
    }

    async fn search_open_dependency_prs(&self, repo: &str) -> Result<u64> {
        let url = format!(
            "{}/search/issues?q=repo:{}/{}+is:pr+is:open+label:dependencies&per_page=1",
            self.base_url, self.organization, repo
        );

        let response = self.client.get(&url).send().await?;
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

        let body: SearchCountResponse = response.json().await?;
        Ok(body.total_count)
    }
}

#[derive(Deserialize)]
struct SearchCountResponse {
    total_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::Server) -> GitHubClient {
        GitHubClient::new(&server.url(), "acme", &Token::from("ghp-test")).unwrap()
    }

    #[tokio::test]
    async fn returns_the_search_total_count() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search/issues")
            .match_query(mockito::Matcher::UrlEncoded(
                "q".to_string(),
                "repo:acme/widget-server is:pr is:open label:dependencies".to_string(),
            ))
            .with_body(r#"{"total_count": 4, "items": []}"#)
            .create_async()
            .await;

        let count = client_for(&server).dependency_pendings("widget-server").await;
        assert_eq!(count, Some(4));
    }

    #[tokio::test]
    async fn lookup_failure_degrades_to_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/search/issues")
            .match_query(mockito::Matcher::Any)
            .with_status(403)
            .with_body("rate limited")
            .create_async()
            .await;

        let count = client_for(&server).dependency_pendings("widget-server").await;
        assert_eq!(count, None);
    }
}
