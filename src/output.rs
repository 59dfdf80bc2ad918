//! Output-path naming and artifact bookkeeping
//!
//! Two naming schemes: a stable filename overwritten each run (keeps the
//! downstream link constant) and a date-stamped filename (append-only
//! history), optionally copied onto a stable `<prefix>_latest.png` after a
//! successful capture. A sidecar JSON record holds the error when the
//! structured-events fetch fails, so sibling targets stay unaffected.

use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// How a target's artifact is named under the output directory.
#[derive(Debug, Clone)]
pub enum OutputName {
    /// Same filename every run; downstream links never change.
    Stable(String),
    /// `<prefix>_YYYY-MM-DD.png`; optionally also copied to
    /// `<prefix>_latest.png`.
    Dated { prefix: String, latest: bool },
}

impl OutputName {
    pub fn stable(name: impl Into<String>) -> Self {
        OutputName::Stable(name.into())
    }

    pub fn dated(prefix: impl Into<String>, latest: bool) -> Self {
        OutputName::Dated {
            prefix: prefix.into(),
            latest,
        }
    }

    /// Primary artifact path for the given date.
    pub fn path_for(&self, output_dir: &Path, date: NaiveDate) -> PathBuf {
        match self {
            OutputName::Stable(name) => output_dir.join(name),
            OutputName::Dated { prefix, .. } => {
                output_dir.join(format!("{}_{}.png", prefix, date.format("%Y-%m-%d")))
            }
        }
    }

    /// Stable alias to refresh after a successful dated capture, if any.
    pub fn latest_path(&self, output_dir: &Path) -> Option<PathBuf> {
        match self {
            OutputName::Dated { prefix, latest } if *latest => {
                Some(output_dir.join(format!("{prefix}_latest.png")))
            }
            _ => None,
        }
    }
}

/// Today's artifact path, creating the output directory on first use.
pub async fn prepare_dest(
    name: &OutputName,
    output_dir: &Path,
) -> Result<PathBuf, crate::CaptureError> {
    tokio::fs::create_dir_all(output_dir).await?;
    Ok(name.path_for(output_dir, chrono::Local::now().date_naive()))
}

/// Refresh the stable alias from the dated artifact. Best-effort.
pub async fn refresh_latest(name: &OutputName, output_dir: &Path, dated: &Path) {
    if let Some(latest) = name.latest_path(output_dir) {
        match tokio::fs::copy(dated, &latest).await {
            Ok(_) => info!(path = %latest.display(), "latest alias refreshed"),
            Err(err) => warn!(%err, path = %latest.display(), "latest alias refresh failed"),
        }
    }
}

#[derive(Debug, Serialize)]
struct SidecarRecord<'a> {
    target: &'a str,
    error: String,
    recorded_at: chrono::DateTime<chrono::Local>,
}

/// Write the sidecar error record for a failed data fetch. Its own failure
/// is only logged; nothing downstream depends on it.
pub async fn write_sidecar_error(output_dir: &Path, target: &str, error: &crate::CaptureError) {
    let record = SidecarRecord {
        target,
        error: error.to_string(),
        recorded_at: chrono::Local::now(),
    };
    let path = output_dir.join(format!("{target}_error.json"));

    let payload = match serde_json::to_vec_pretty(&record) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(%err, "sidecar record serialization failed");
            return;
        }
    };
    if let Err(err) = tokio::fs::create_dir_all(output_dir).await {
        warn!(%err, "sidecar output directory unavailable");
        return;
    }
    match tokio::fs::write(&path, payload).await {
        Ok(()) => info!(path = %path.display(), "sidecar error record written"),
        Err(err) => warn!(%err, path = %path.display(), "sidecar record write failed"),
    }
}
