//! Click-equivalent and toggle-equivalent operations
//!
//! The executor mutates visible page state and reports plain success or
//! failure; it never raises past its caller. What changed on the page is
//! deliberately not part of the contract — callers infer progress only from
//! subsequent resolution of dependent state.

use crate::driver::{PageDriver, ToggleProbe};
use tracing::{debug, warn};

/// Operation kinds the executor understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Click-equivalent.
    Activate,
    /// Checkbox-like "ensure on"; falls back to a plain activation when the
    /// target is not a true toggle control.
    ToggleOn,
}

/// Perform an operation on a resolved element. All failures come back as
/// `false` with a log line.
pub async fn perform<D: PageDriver>(page: &D, element: &D::Element, action: Action) -> bool {
    match action {
        Action::Activate => match page.activate(element).await {
            Ok(()) => {
                debug!("activate succeeded");
                true
            }
            Err(err) => {
                warn!(%err, "activate failed");
                false
            }
        },
        Action::ToggleOn => match page.toggle_on(element).await {
            Ok(ToggleProbe::Applied) => {
                debug!("toggle applied");
                true
            }
            Ok(ToggleProbe::AlreadyOn) => {
                debug!("toggle already on");
                true
            }
            Ok(ToggleProbe::NotAToggle) => {
                debug!("not a toggle control, falling back to activate");
                match page.activate(element).await {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(%err, "toggle fallback activate failed");
                        false
                    }
                }
            }
            Err(err) => {
                warn!(%err, "toggle probe failed");
                false
            }
        },
    }
}
