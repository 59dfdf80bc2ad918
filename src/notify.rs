//! Outbound run-status notification
//!
//! One optional webhook POST per run with a plain-text summary, sent only
//! when a destination is configured through the environment. A failed
//! notification is logged and never escalated.

use crate::capture::CaptureResult;
use std::time::Duration;
use tracing::{info, warn};

pub const WEBHOOK_ENV: &str = "CALSHOT_WEBHOOK_URL";

/// Destination from the environment, if any.
pub fn webhook_from_env() -> Option<String> {
    std::env::var(WEBHOOK_ENV).ok().filter(|v| !v.is_empty())
}

/// One line per target plus a header, in the order the targets ran.
pub fn compose_summary(run_id: &str, results: &[CaptureResult]) -> String {
    let ok = results.iter().filter(|r| r.success).count();
    let mut lines = vec![format!(
        "calshot run {}: {}/{} captures succeeded",
        run_id,
        ok,
        results.len()
    )];

    for result in results {
        let line = match (&result.rung, result.success) {
            (Some(rung), true) => {
                format!("- {}: ok ({})", result.target, rung.describe())
            }
            (Some(rung), false) => format!(
                "- {}: failed at {} ({})",
                result.target,
                rung.describe(),
                result
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            ),
            (None, _) => format!(
                "- {}: no capture ({})",
                result.target,
                result
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            ),
        };
        lines.push(line);
    }

    lines.join("\n")
}

/// POST the summary. Returns whether the call was accepted; both transport
/// errors and non-success statuses are contained here.
pub async fn send_status(url: &str, body: String) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            warn!(%err, "webhook client build failed");
            return false;
        }
    };

    match client
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(body)
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => {
            info!(status = %response.status(), "webhook delivered");
            true
        }
        Ok(response) => {
            warn!(status = %response.status(), "webhook rejected");
            false
        }
        Err(err) => {
            warn!(%err, "webhook send failed");
            false
        }
    }
}
