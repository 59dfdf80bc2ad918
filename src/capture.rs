//! Capture-region resolution: the three-rung fallback ladder
//!
//! Exactly one raster image is produced for the current page state. A named
//! content container is preferred, captured at its own rendered bounds; if
//! its capture is unusable the container's bounding box becomes a
//! height-capped page clip; if nothing resolves the whole page is captured,
//! scrolled state included. The last rung needs no element resolution, so
//! with a live page the operation is total.

use crate::config::Timing;
use crate::driver::{PageDriver, Rect};
use crate::locator::{resolve_first, Locator};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Which rung of the fallback ladder produced the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureRung {
    /// Named container captured at its own rendered bounds.
    Element,
    /// Rectangular page clip derived from the container's bounding box.
    BoundingClip,
    /// Entire page content.
    FullPage,
}

impl CaptureRung {
    pub fn describe(&self) -> &'static str {
        match self {
            CaptureRung::Element => "element",
            CaptureRung::BoundingClip => "bounding-clip",
            CaptureRung::FullPage => "full-page",
        }
    }
}

/// Final record of one target's capture.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub target: String,
    pub path: Option<PathBuf>,
    pub rung: Option<CaptureRung>,
    pub success: bool,
    pub error: Option<crate::CaptureError>,
}

impl CaptureResult {
    pub fn failed(target: impl Into<String>, error: crate::CaptureError) -> Self {
        Self {
            target: target.into(),
            path: None,
            rung: None,
            success: false,
            error: Some(error),
        }
    }
}

/// Clip rectangle for a resolved container: same origin and width, height
/// capped. Pure, so repeated invocation on an unchanged layout yields
/// identical coordinates.
pub fn clip_for(bounds: Rect, height_cap: u32) -> Rect {
    Rect {
        x: bounds.x,
        y: bounds.y,
        width: bounds.width,
        height: bounds.height.min(height_cap as f64),
    }
}

/// Decode probe: log raster dimensions, flag bytes that are not a decodable
/// image. Never gates success.
fn probe_image(target: &str, bytes: &[u8]) {
    match image::load_from_memory(bytes) {
        Ok(img) => info!(
            target = target,
            width = img.width(),
            height = img.height(),
            bytes = bytes.len(),
            "capture decoded"
        ),
        Err(err) => debug!(target = target, %err, "capture bytes did not decode as an image"),
    }
}

async fn write_artifact(
    target: &str,
    dest: &Path,
    rung: CaptureRung,
    bytes: Vec<u8>,
) -> CaptureResult {
    probe_image(target, &bytes);
    match tokio::fs::write(dest, &bytes).await {
        Ok(()) => {
            info!(target = target, rung = rung.describe(), path = %dest.display(), "capture written");
            CaptureResult {
                target: target.to_string(),
                path: Some(dest.to_path_buf()),
                rung: Some(rung),
                success: true,
                error: None,
            }
        }
        Err(err) => {
            warn!(target = target, %err, path = %dest.display(), "capture write failed");
            CaptureResult {
                target: target.to_string(),
                path: Some(dest.to_path_buf()),
                rung: Some(rung),
                success: false,
                error: Some(err.into()),
            }
        }
    }
}

/// Produce the image for the current page state via the fallback ladder.
///
/// Rung order: named container at its rendered bounds, then a height-capped
/// bounding-box clip, then the full page. Each rung is attempted only when
/// the previous one is unavailable.
pub async fn capture_region<D: PageDriver>(
    page: &D,
    target: &str,
    candidates: &[Locator],
    timing: &Timing,
    height_cap: u32,
    dest: &Path,
) -> CaptureResult {
    if let Some(element) =
        resolve_first(page, "capture container", candidates, timing.locator_timeout).await
    {
        match page.screenshot_element(&element).await {
            Ok(bytes) if !bytes.is_empty() => {
                return write_artifact(target, dest, CaptureRung::Element, bytes).await;
            }
            Ok(_) => {
                debug!(target = target, "element capture produced no bytes, trying clip");
            }
            Err(err) => {
                debug!(target = target, %err, "element capture unavailable, trying clip");
            }
        }

        match page.bounding_box(&element).await {
            Some(bounds) if bounds.is_usable() => {
                let clip = clip_for(bounds, height_cap);
                match page.screenshot_clip(clip).await {
                    Ok(bytes) if !bytes.is_empty() => {
                        return write_artifact(target, dest, CaptureRung::BoundingClip, bytes)
                            .await;
                    }
                    Ok(_) => debug!(target = target, "clip capture produced no bytes"),
                    Err(err) => debug!(target = target, %err, "clip capture unavailable"),
                }
            }
            Some(_) => debug!(target = target, "container bounds unusable"),
            None => debug!(target = target, "container has no bounding box"),
        }
    } else {
        debug!(target = target, "no capture container resolved, falling back to full page");
    }

    match page.screenshot_full().await {
        Ok(bytes) => write_artifact(target, dest, CaptureRung::FullPage, bytes).await,
        Err(err) => {
            warn!(target = target, %err, "full-page capture failed");
            CaptureResult::failed(target, err)
        }
    }
}
