//! Per-target page lifecycle sequencing
//!
//! Opens a page from the shared browsing context, navigates, waits the
//! settle delay, makes one best-effort attempt at dismissing a cookie or
//! consent prompt, then hands the page to target-specific capture logic.
//! Pure sequencing; all algorithmic behaviour lives in the components the
//! target logic composes.

use crate::actions::{self, Action};
use crate::config::Timing;
use crate::driver::{Browsing, PageDriver};
use crate::locator::{resolve_first, Locator};
use crate::CaptureError;
use tracing::{debug, info};

/// One open page, valid for a single target visit.
pub struct PageSession<P: PageDriver> {
    page: P,
}

impl<P: PageDriver> PageSession<P> {
    /// Acquire a page, navigate, settle, and best-effort dismiss a consent
    /// prompt. Only acquisition and navigation can fail; the consent step is
    /// a one-shot, single-list action whose failure is logged and ignored.
    pub async fn open<B: Browsing<Page = P>>(
        browser: &B,
        url: &str,
        consent: &[Locator],
        timing: &Timing,
    ) -> Result<Self, CaptureError> {
        let page = browser.open_page().await?;
        info!(url, "navigating");
        page.goto(url).await?;
        page.pause(timing.navigate_settle).await;

        if !consent.is_empty() {
            match resolve_first(&page, "consent prompt", consent, timing.consent_timeout).await {
                Some(element) => {
                    let dismissed = actions::perform(&page, &element, Action::Activate).await;
                    info!(dismissed, "consent prompt handled");
                    page.pause(timing.post_action_pause).await;
                }
                None => debug!("no consent prompt"),
            }
        }

        Ok(Self { page })
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// Release the page handle.
    pub async fn close(self) {
        self.page.close().await;
    }
}
