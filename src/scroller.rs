//! Lazy-load-aware scrolling
//!
//! Calendar sites materialize their tail rows only as the viewport reaches
//! them. The scroller advances a resolved scrollable surface one viewport at
//! a time, pausing after each advance, until a completion marker shows up in
//! the serialized page or the step budget runs out. Whatever happens, the
//! scroll offset is restored to zero before capture.

use crate::config::Timing;
use crate::driver::PageDriver;
use crate::locator::{resolve_first, Locator};
use tracing::{debug, info, warn};

/// Static description of one target's scroll behaviour.
#[derive(Debug, Clone)]
pub struct ScrollPlan {
    /// Candidates for the scrollable container; exhaustion falls back to the
    /// document-level scrolling surface.
    pub surface: Vec<Locator>,
    /// Textual signals that the tail of the bounded range has loaded, e.g.
    /// abbreviated late-week day names.
    pub markers: Vec<String>,
    /// Maximum viewport advances before giving up.
    pub budget: usize,
    /// Bytes of serialized content scanned per probe.
    pub probe_bytes: usize,
    /// Per-target override of the shared scroll pause; slow-rendering sites
    /// need the longer end of the 0.5-1.2s range.
    pub pause: Option<std::time::Duration>,
}

impl ScrollPlan {
    pub fn new(markers: Vec<String>, budget: usize, probe_bytes: usize) -> Self {
        Self {
            surface: Vec::new(),
            markers,
            budget,
            probe_bytes,
            pause: None,
        }
    }

    pub fn with_surface(mut self, surface: Vec<Locator>) -> Self {
        self.surface = surface;
        self
    }

    pub fn with_pause(mut self, pause: std::time::Duration) -> Self {
        self.pause = Some(pause);
        self
    }
}

/// What one scroll pass observed. `marker_seen` is informational only and
/// never changes whether capture proceeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollOutcome {
    pub steps_taken: usize,
    pub marker_seen: bool,
    pub reset_ok: bool,
}

fn contains_marker(content: &str, markers: &[String]) -> bool {
    markers.iter().any(|marker| content.contains(marker.as_str()))
}

/// Drive one lazy-load pass. The surface is resolved once and cached for the
/// pass; the reset to offset zero is attempted even after scroll failures
/// and its own failure is non-fatal.
pub async fn run_scroll<D: PageDriver>(
    page: &D,
    plan: &ScrollPlan,
    timing: &Timing,
) -> ScrollOutcome {
    let surface = if plan.surface.is_empty() {
        None
    } else {
        resolve_first(page, "scroll surface", &plan.surface, timing.locator_timeout).await
    };
    if surface.is_none() && !plan.surface.is_empty() {
        debug!("no scroll container matched, using document surface");
    }

    let pause = plan.pause.unwrap_or(timing.scroll_pause);
    let mut steps_taken = 0;
    let mut marker_seen = false;

    while steps_taken < plan.budget {
        if let Err(err) = page.scroll_by_viewport(surface.as_ref()).await {
            warn!(%err, step = steps_taken, "scroll advance failed, stopping pass");
            break;
        }
        steps_taken += 1;
        page.pause(pause).await;

        match page.content_prefix(plan.probe_bytes).await {
            Ok(content) => {
                if contains_marker(&content, &plan.markers) {
                    marker_seen = true;
                    debug!(step = steps_taken, "late-content marker observed");
                    break;
                }
            }
            Err(err) => {
                debug!(%err, step = steps_taken, "content probe failed");
            }
        }
    }

    let reset_ok = match page.scroll_to_top(surface.as_ref()).await {
        Ok(()) => true,
        Err(err) => {
            warn!(%err, "scroll reset failed, capturing from current offset");
            false
        }
    };
    page.pause(timing.reset_settle).await;

    info!(steps_taken, marker_seen, reset_ok, "scroll pass finished");

    ScrollOutcome {
        steps_taken,
        marker_seen,
        reset_ok,
    }
}
