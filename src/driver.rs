//! Minimal page/browser capability surface
//!
//! Every component in the interaction engine is generic over [`PageDriver`]
//! rather than talking to Chrome directly. The production implementation
//! lives in [`crate::browser`]; tests inject an in-memory fake with the same
//! surface and a no-op `pause`, which makes the whole pipeline deterministic
//! without a browser process.

use crate::CaptureError;
use async_trait::async_trait;
use std::time::Duration;

/// An axis-aligned rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A box with non-positive or non-finite dimensions cannot be clipped.
    pub fn is_usable(&self) -> bool {
        self.width.is_finite()
            && self.height.is_finite()
            && self.x.is_finite()
            && self.y.is_finite()
            && self.width >= 1.0
            && self.height >= 1.0
    }
}

/// Outcome of probing an element for checkbox-like semantics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToggleProbe {
    /// The element was a toggle control and is now on.
    Applied,
    /// The element was a toggle control and was already on.
    AlreadyOn,
    /// The element carries no toggle semantics; callers fall back to a
    /// plain activation.
    NotAToggle,
}

/// One open page inside the shared browsing context.
///
/// Lookup methods carry their own timeout and report misses as `None`;
/// mutation and capture methods return `Result` and the calling component
/// decides how far the failure is allowed to travel (for the interaction
/// engine: not past itself).
#[async_trait]
pub trait PageDriver: Send + Sync {
    type Element: Clone + Send + Sync;

    async fn goto(&self, url: &str) -> Result<(), CaptureError>;

    /// Structural match against a CSS selector.
    async fn find_css(&self, selector: &str, timeout: Duration) -> Option<Self::Element>;

    /// Accessibility match: ARIA role (explicit or implicit) plus
    /// accessible-name containment.
    async fn find_role(&self, role: &str, name: &str, timeout: Duration)
        -> Option<Self::Element>;

    /// Free-text containment match anywhere in the document.
    async fn find_text(&self, needle: &str, timeout: Duration) -> Option<Self::Element>;

    /// Click-equivalent on a resolved element.
    async fn activate(&self, element: &Self::Element) -> Result<(), CaptureError>;

    /// Attempt checkbox-like semantics on a resolved element.
    async fn toggle_on(&self, element: &Self::Element) -> Result<ToggleProbe, CaptureError>;

    /// Advance the scrollable surface by one viewport height. `None` means
    /// the document-level scrolling surface.
    async fn scroll_by_viewport(&self, surface: Option<&Self::Element>)
        -> Result<(), CaptureError>;

    /// Restore the scrollable surface to offset zero.
    async fn scroll_to_top(&self, surface: Option<&Self::Element>) -> Result<(), CaptureError>;

    /// A bounded prefix of the serialized page, used for completion-marker
    /// probing during lazy-load scrolling.
    async fn content_prefix(&self, max_bytes: usize) -> Result<String, CaptureError>;

    /// Rendered bounds of an element, if the engine can report them.
    async fn bounding_box(&self, element: &Self::Element) -> Option<Rect>;

    async fn screenshot_element(&self, element: &Self::Element) -> Result<Vec<u8>, CaptureError>;

    async fn screenshot_clip(&self, clip: Rect) -> Result<Vec<u8>, CaptureError>;

    /// Capture the entire page, scrolled state included. Requires no element
    /// resolution, which is what makes the capture ladder total.
    async fn screenshot_full(&self) -> Result<Vec<u8>, CaptureError>;

    /// Replace the document with self-authored markup.
    async fn set_content(&self, html: &str) -> Result<(), CaptureError>;

    async fn close(&self);

    /// Suspension point between interactions. Fakes override this to return
    /// immediately, which removes every real wait from the test suite.
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A shared browsing context from which independent page handles open.
#[async_trait]
pub trait Browsing: Send + Sync {
    type Page: PageDriver;

    async fn open_page(&self) -> Result<Self::Page, CaptureError>;
}
