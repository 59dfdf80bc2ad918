//! # calshot
//!
//! Resilient snapshot capture for dynamic third-party calendar pages. One
//! headless Chrome process hosts a shared browsing context; each registered
//! target opens its own page, best-effort configures the visible state,
//! scrolls lazily-loaded content into existence, and resolves a capture
//! region through a fallback ladder that always ends in a full-page image.
//!
//! The interaction engine is built to survive markup it does not control:
//!
//! - **Ordered locator strategies** — every targeting goal is a priority
//!   list of CSS, role+name, and text-containment candidates; first hit
//!   wins, exhaustion is a value, never an exception.
//! - **Best-effort filter sequencing** — a broken filter UI degrades the
//!   capture to unfiltered, it never blocks the artifact.
//! - **Lazy-load scrolling** — viewport-sized advances until a completion
//!   marker appears or the step budget runs out, then an unconditional
//!   reset to the top.
//! - **Total capture ladder** — named container, bounding-box clip,
//!   full page; the last rung needs no element resolution.
//!
//! Every component is generic over the [`driver::PageDriver`] capability
//! surface, so the whole pipeline runs against an in-memory fake in tests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use calshot::{run_all, CdpBrowser, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let browser = CdpBrowser::launch(&config).await?;
//!     let results = run_all(&browser, &config).await;
//!     browser.shutdown().await;
//!
//!     for result in results {
//!         println!("{}: success={}", result.target, result.success);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # capture every registered target into ./site
//! calshot
//!
//! # one target, custom output directory
//! calshot --target fx_week --output-dir /srv/captures
//! ```

/// Configuration and the shared timing table
pub mod config;

/// Error taxonomy for the capture pipeline
pub mod error;

/// Minimal page/browser capability surface
pub mod driver;

/// chromiumoxide implementation of the driver traits
pub mod browser;

/// Target resolution over ordered strategy lists
pub mod locator;

/// Click-equivalent and toggle-equivalent operations
pub mod actions;

/// Best-effort filter sequencing
pub mod filters;

/// Lazy-load-aware scrolling
pub mod scroller;

/// Capture-region resolution and the fallback ladder
pub mod capture;

/// Per-target page lifecycle sequencing
pub mod session;

/// Output-path naming and artifact bookkeeping
pub mod output;

/// Outbound run-status notification
pub mod notify;

/// Structured-events variant
pub mod events;

/// Built-in targets and the sequential runner
pub mod targets;

/// Command-line interface
pub mod cli;

/// Utility functions and helpers
pub mod utils;

#[cfg(test)]
mod tests;

pub use actions::*;
pub use browser::*;
pub use capture::*;
pub use cli::*;
pub use config::*;
pub use driver::*;
pub use error::*;
pub use events::*;
pub use filters::*;
pub use locator::*;
pub use notify::*;
pub use output::*;
pub use scroller::*;
pub use session::*;
pub use targets::*;
pub use utils::*;
