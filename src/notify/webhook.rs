use std::time::Duration;

use log::{debug, warn};

use super::blocks::Message;
use crate::error::{BuildWatchError, Result};

/// Bounds for the delivery retry loop.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Deliver one message to the webhook.
///
/// Each delivery moves Pending -> Sending and then to Delivered on HTTP
/// success, back through RetryScheduled -> Sending on a server-side error
/// with attempts remaining, or to FatalFailure on a client-side error or
/// once attempts are exhausted. The retry delay is `2^attempt * base_delay`
/// with the attempt counter starting at 1. Fatal failures surface the
/// response body. Delivery is at-least-once; message content is idempotent.
pub async fn send_with_retry(
    client: &reqwest::Client,
    webhook_url: &str,
    message: &Message,
    policy: RetryPolicy,
) -> Result<()> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 1;

    loop {
        let delay = policy.base_delay * 2u32.saturating_pow(attempt);

        let response = match client.post(webhook_url).json(message).send().await {
            Ok(response) => response,
            Err(e) => {
                if attempt >= max_attempts {
                    return Err(e.into());
                }
                warn!(
                    "Webhook delivery error ({e}), retry {attempt}/{max_attempts} after {delay:?}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Message delivered after {attempt} attempt(s)");
            return Ok(());
        }

        if status.is_server_error() && attempt < max_attempts {
            warn!("Webhook responded {status}, retry {attempt}/{max_attempts} after {delay:?}");
            tokio::time::sleep(delay).await;
            attempt += 1;
            continue;
        }

        // Client-side error, or the final allowed attempt
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        return Err(BuildWatchError::Delivery {
            status: status.as_u16(),
            body,
        });
    }
}
