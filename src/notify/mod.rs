mod blocks;
mod compose;
mod webhook;

pub use blocks::{Block, Message, Text};
pub use compose::{analyze_area, area_message, emoji_line, header_message, AreaAnalysis};
pub use webhook::{send_with_retry, RetryPolicy};

use std::time::Duration;

use chrono::{DateTime, Datelike, Timelike, Utc};
use log::info;

use crate::aggregate::Snapshot;
use crate::config::NotifyConfig;
use crate::error::{BuildWatchError, Result};

/// Whether the notification window is open at `now`.
///
/// Open during the configured UTC hour on weekday indices 0-5 counted from
/// Sunday; only Saturday falls outside.
pub fn is_within_notification_window(now: &DateTime<Utc>, hour_utc: u32) -> bool {
    now.hour() == hour_utc && now.weekday().num_days_from_sunday() < 6
}

/// Compose and deliver the whole notification batch.
///
/// Returns `Ok(false)` when the batch was skipped because the window is
/// closed; `manual` bypasses the window check entirely. A missing webhook
/// URL is fatal for this path only.
pub async fn dispatch_snapshots(
    config: &NotifyConfig,
    gitlab_base: &str,
    snapshots: &[Snapshot],
    now: DateTime<Utc>,
    manual: bool,
) -> Result<bool> {
    if !manual && !is_within_notification_window(&now, config.window_hour_utc) {
        info!(
            "Outside notification window (current UTC hour: {}, window hour: {}) => skipping",
            now.hour(),
            config.window_hour_utc
        );
        return Ok(false);
    }

    let webhook_url = config.webhook_url.as_deref().ok_or_else(|| {
        BuildWatchError::Config("Notification webhook URL is not set".to_string())
    })?;

    let http = reqwest::Client::builder()
        .user_agent(concat!("buildwatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| BuildWatchError::Config(format!("Failed to create HTTP client: {e}")))?;

    let policy = RetryPolicy {
        max_attempts: config.max_attempts,
        base_delay: Duration::from_millis(config.base_delay_ms),
    };

    send_with_retry(
        &http,
        webhook_url,
        &header_message(now.date_naive()),
        policy,
    )
    .await?;

    for snapshot in snapshots {
        let areas: Vec<_> = snapshot.areas().collect();
        for (index, (name, aggregate)) in areas.iter().enumerate() {
            info!("Composing summary for area: {name}");
            let analysis = analyze_area(aggregate, gitlab_base);
            let mut message = area_message(name, &analysis);
            if index < areas.len() - 1 {
                message.blocks.push(Block::Divider);
            }
            send_with_retry(&http, webhook_url, &message, policy).await?;
        }
    }

    if config.mood_enhancer {
        if let Some(message) = compose::fetch_mood_message(&http, &config.mood_url).await {
            send_with_retry(&http, webhook_url, &message, policy).await?;
        }
    }

    info!("All notifications sent successfully");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[cfg(test)]
    mod window {
        use super::*;

        fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
        }

        #[test]
        fn open_during_the_configured_hour_on_a_weekday() {
            // 2026-08-07 is a Friday
            assert!(is_within_notification_window(&at(2026, 8, 7, 7), 7));
        }

        #[test]
        fn closed_outside_the_configured_hour() {
            assert!(!is_within_notification_window(&at(2026, 8, 7, 8), 7));
            assert!(!is_within_notification_window(&at(2026, 8, 7, 6), 7));
        }

        #[test]
        fn closed_on_saturday() {
            // 2026-08-08 is a Saturday
            assert!(!is_within_notification_window(&at(2026, 8, 8, 7), 7));
        }

        #[test]
        fn open_on_sunday() {
            // Weekday indices count from Sunday; only index 6 is excluded
            assert!(is_within_notification_window(&at(2026, 8, 9, 7), 7));
        }
    }

    #[cfg(test)]
    mod dispatch {
        use super::*;
        use crate::aggregate::{Area, RepoEntry, Snapshot};
        use crate::providers::gitlab::RepoBuildStatus;
        use crate::status::RunStatus;

        fn snapshot() -> Snapshot {
            Snapshot::build(vec![RepoEntry {
                repo: "widget-server".to_string(),
                branch: "master".to_string(),
                area: Area::Backend,
                build_status: RepoBuildStatus {
                    name: "widget-server".to_string(),
                    full_path: "acme/widget-server".to_string(),
                    status: RunStatus::Success,
                    ..RepoBuildStatus::default()
                },
                coverage: None,
                dependabot_pendings: None,
            }])
        }

        fn config(webhook_url: Option<String>) -> NotifyConfig {
            NotifyConfig {
                webhook_url,
                base_delay_ms: 10,
                ..NotifyConfig::default()
            }
        }

        fn saturday() -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2026, 8, 8, 7, 5, 0).unwrap()
        }

        fn friday_in_window() -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2026, 8, 7, 7, 5, 0).unwrap()
        }

        #[tokio::test]
        async fn sends_header_then_one_message_per_area() {
            let mut server = mockito::Server::new_async().await;
            let mock = server
                .mock("POST", "/hook")
                .with_status(200)
                .expect(2)
                .create_async()
                .await;

            let config = config(Some(format!("{}/hook", server.url())));
            let sent = dispatch_snapshots(
                &config,
                "https://gitlab.com",
                &[snapshot()],
                friday_in_window(),
                false,
            )
            .await
            .unwrap();

            mock.assert_async().await;
            assert!(sent);
        }

        #[tokio::test]
        async fn closed_window_is_a_no_op() {
            let mut server = mockito::Server::new_async().await;
            let mock = server
                .mock("POST", "/hook")
                .expect(0)
                .create_async()
                .await;

            let config = config(Some(format!("{}/hook", server.url())));
            let sent = dispatch_snapshots(
                &config,
                "https://gitlab.com",
                &[snapshot()],
                saturday(),
                false,
            )
            .await
            .unwrap();

            mock.assert_async().await;
            assert!(!sent, "a closed window skips the batch without error");
        }

        #[tokio::test]
        async fn manual_override_bypasses_the_window() {
            let mut server = mockito::Server::new_async().await;
            let mock = server
                .mock("POST", "/hook")
                .with_status(200)
                .expect(2)
                .create_async()
                .await;

            let config = config(Some(format!("{}/hook", server.url())));
            let sent = dispatch_snapshots(
                &config,
                "https://gitlab.com",
                &[snapshot()],
                saturday(),
                true,
            )
            .await
            .unwrap();

            mock.assert_async().await;
            assert!(sent);
        }

        #[tokio::test]
        async fn missing_webhook_url_is_fatal_for_the_dispatch_path() {
            let result = dispatch_snapshots(
                &config(None),
                "https://gitlab.com",
                &[snapshot()],
                friday_in_window(),
                false,
            )
            .await;

            assert!(matches!(result, Err(BuildWatchError::Config(_))));
        }
    }
}
