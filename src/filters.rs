//! Best-effort filter sequencing against unreliable layouts
//!
//! A [`FilterStep`] names one configuration goal (say, restricting a
//! calendar to its high-impact rows) and carries locator lists for each
//! sub-step: open the filter panel, clear the current selection, untick
//! pre-selected values, tick wanted values, apply. Any sub-step may be
//! absent on a given page and any sub-step may fail; a broken third-party
//! UI degrades the quality of the resulting capture, never its existence.

use crate::actions::{self, Action};
use crate::config::Timing;
use crate::driver::PageDriver;
use crate::locator::{resolve_first, Locator};
use tracing::{info, warn};

/// One value to untick or tick, with its own candidate list.
#[derive(Debug, Clone)]
pub struct FilterValue {
    pub label: String,
    pub locators: Vec<Locator>,
}

impl FilterValue {
    pub fn new(label: impl Into<String>, locators: Vec<Locator>) -> Self {
        Self {
            label: label.into(),
            locators,
        }
    }
}

/// A named filter-configuration goal. Empty locator lists mean the page has
/// no such control (some sites show their filters inline, with no panel or
/// apply button).
#[derive(Debug, Clone, Default)]
pub struct FilterStep {
    pub name: String,
    pub open_panel: Vec<Locator>,
    pub clear_all: Vec<Locator>,
    pub exclude: Vec<FilterValue>,
    pub include: Vec<FilterValue>,
    pub apply: Vec<Locator>,
}

/// Per-sub-step record of how far the sequence got.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// `None` when the step had no control to drive.
    pub panel_opened: Option<bool>,
    pub cleared: Option<bool>,
    pub excluded: Vec<(String, bool)>,
    pub included: Vec<(String, bool)>,
    pub applied: Option<bool>,
}

impl FilterOutcome {
    /// True when every present sub-step succeeded.
    pub fn fully_applied(&self) -> bool {
        self.panel_opened.unwrap_or(true)
            && self.cleared.unwrap_or(true)
            && self.excluded.iter().all(|(_, ok)| *ok)
            && self.included.iter().all(|(_, ok)| *ok)
            && self.applied.unwrap_or(true)
    }
}

/// Resolve-and-act on one optional control list; `None` when absent.
async fn drive_control<D: PageDriver>(
    page: &D,
    goal: &str,
    candidates: &[Locator],
    action: Action,
    timing: &Timing,
) -> Option<bool> {
    if candidates.is_empty() {
        return None;
    }

    let ok = match resolve_first(page, goal, candidates, timing.locator_timeout).await {
        Some(element) => {
            let ok = actions::perform(page, &element, action).await;
            page.pause(timing.post_action_pause).await;
            ok
        }
        None => false,
    };

    if !ok {
        warn!(goal, "filter control unavailable, continuing unfiltered");
    }
    Some(ok)
}

/// Apply one filter goal end-to-end. Each sub-step's failure is recorded
/// and the sequence keeps going; the function itself cannot fail.
pub async fn apply_filter<D: PageDriver>(
    page: &D,
    step: &FilterStep,
    timing: &Timing,
) -> FilterOutcome {
    let panel_opened =
        drive_control(page, "filter panel", &step.open_panel, Action::Activate, timing).await;

    let cleared =
        drive_control(page, "clear all", &step.clear_all, Action::Activate, timing).await;

    let mut excluded = Vec::with_capacity(step.exclude.len());
    for value in &step.exclude {
        let goal = format!("exclude {}", value.label);
        let ok = drive_control(page, &goal, &value.locators, Action::Activate, timing)
            .await
            .unwrap_or(false);
        excluded.push((value.label.clone(), ok));
    }

    let mut included = Vec::with_capacity(step.include.len());
    for value in &step.include {
        let goal = format!("include {}", value.label);
        let ok = drive_control(page, &goal, &value.locators, Action::ToggleOn, timing)
            .await
            .unwrap_or(false);
        included.push((value.label.clone(), ok));
    }

    let applied =
        drive_control(page, "apply filters", &step.apply, Action::Activate, timing).await;

    let outcome = FilterOutcome {
        panel_opened,
        cleared,
        excluded,
        included,
        applied,
    };

    info!(
        filter = %step.name,
        fully_applied = outcome.fully_applied(),
        included_ok = outcome.included.iter().filter(|(_, ok)| *ok).count(),
        included_total = outcome.included.len(),
        "filter sequence finished"
    );

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;

    #[test]
    fn test_empty_step_is_fully_applied() {
        let outcome = FilterOutcome::default();
        assert!(outcome.fully_applied());
    }

    #[test]
    fn test_failed_include_degrades_outcome() {
        let outcome = FilterOutcome {
            included: vec![("USD".to_string(), true), ("CAD".to_string(), false)],
            ..Default::default()
        };
        assert!(!outcome.fully_applied());
    }

    #[test]
    fn test_absent_substeps_do_not_degrade() {
        let outcome = FilterOutcome {
            panel_opened: None,
            cleared: None,
            applied: Some(true),
            ..Default::default()
        };
        assert!(outcome.fully_applied());
    }

    #[test]
    fn test_filter_step_default_is_all_absent() {
        let step = FilterStep {
            name: "impact".to_string(),
            ..Default::default()
        };
        assert!(step.open_panel.is_empty());
        assert!(step.include.is_empty());
    }

    #[test]
    fn test_filter_value_construction() {
        let value = FilterValue::new("High", vec![Locator::role("checkbox", "High")]);
        assert_eq!(value.label, "High");
        assert_eq!(value.locators.len(), 1);
    }
}
