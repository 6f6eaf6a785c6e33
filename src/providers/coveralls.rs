use log::warn;

use crate::coverage::CoverageValue;
use crate::error::{BuildWatchError, Result};

const BADGE_MARKER: &str = "badges/coveralls_";

/// Coverage badge lookup client.
///
/// The badge endpoint answers with a redirect whose target URL embeds the
/// coverage percentage (or the literal token `unknown`); the reading is
/// parsed out of the final URL after redirects are followed.
pub struct CoverageClient {
    client: reqwest::Client,
    base_url: String,
    organization: String,
    branch: String,
}

impl CoverageClient {
    pub fn new(base_url: &str, organization: &str, branch: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("buildwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BuildWatchError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            organization: organization.to_string(),
            branch: branch.to_string(),
        })
    }

    /// Coverage reading for one repository.
    ///
    /// Failures degrade to `Unknown` for this repository only and never
    /// block sibling lookups.
    pub async fn fetch_coverage(&self, repo: &str) -> CoverageValue {
        let url = format!(
            "{}/repos/github/{}/{repo}/badge.svg?branch={}",
            self.base_url, self.organization, self.branch
        );

        match self.client.get(&url).send().await {
            Ok(response) => parse_badge_url(response.url().as_str()),
            Err(e) => {
                warn!("Coverage lookup failed for {repo}: {e}");
                CoverageValue::Unknown
            }
        }
    }
}

/// Extract the coverage reading embedded in a badge redirect target.
fn parse_badge_url(url: &str) -> CoverageValue {
    let Some(start) = url.find(BADGE_MARKER) else {
        return CoverageValue::Unknown;
    };
    let value = &url[start + BADGE_MARKER.len()..];
    let Some(end) = value.find(".svg") else {
        return CoverageValue::Unknown;
    };

    match &value[..end] {
        "unknown" => CoverageValue::Unknown,
        raw => raw
            .parse::<f64>()
            .ok()
            .map_or(CoverageValue::Unknown, |v| {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                CoverageValue::Known(v.round() as u32)
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(test)]
    mod parse_badge_url {
        use super::*;

        #[test]
        fn extracts_a_numeric_reading() {
            let url = "https://s3.amazonaws.com/assets.coveralls.io/badges/coveralls_87.svg";
            assert_eq!(parse_badge_url(url), CoverageValue::Known(87));
        }

        #[test]
        fn rounds_fractional_readings() {
            let url = "https://s3.amazonaws.com/assets.coveralls.io/badges/coveralls_84.6.svg";
            assert_eq!(parse_badge_url(url), CoverageValue::Known(85));
        }

        #[test]
        fn unknown_token_maps_to_unknown() {
            let url = "https://s3.amazonaws.com/assets.coveralls.io/badges/coveralls_unknown.svg";
            assert_eq!(parse_badge_url(url), CoverageValue::Unknown);
        }

        #[test]
        fn unexpected_url_shape_maps_to_unknown() {
            assert_eq!(
                parse_badge_url("https://coveralls.io/nope"),
                CoverageValue::Unknown
            );
            assert_eq!(
                parse_badge_url("https://coveralls.io/badges/coveralls_42"),
                CoverageValue::Unknown,
                "missing .svg suffix"
            );
        }
    }

    #[tokio::test]
    async fn redirect_target_is_parsed_for_the_reading() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/github/acme/widget-server/badge.svg")
            .match_query(mockito::Matcher::UrlEncoded(
                "branch".to_string(),
                "master".to_string(),
            ))
            .with_status(302)
            .with_header(
                "location",
                &format!("{}/badges/coveralls_91.svg", server.url()),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/badges/coveralls_91.svg")
            .with_body("<svg/>")
            .create_async()
            .await;

        let client = CoverageClient::new(&server.url(), "acme", "master").unwrap();
        assert_eq!(
            client.fetch_coverage("widget-server").await,
            CoverageValue::Known(91)
        );
    }

    #[tokio::test]
    async fn network_failure_degrades_to_unknown() {
        let client = CoverageClient::new("http://127.0.0.1:1", "acme", "master").unwrap();
        assert_eq!(
            client.fetch_coverage("widget-server").await,
            CoverageValue::Unknown
        );
    }
}
