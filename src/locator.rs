//! Target resolution over ordered strategy lists
//!
//! Third-party markup drifts, so no single selector is trusted. Each
//! targeting goal is an ordered list of [`Locator`] candidates; resolution
//! walks the list and the first hit wins. Order is significant and never
//! changed at runtime.

use crate::driver::PageDriver;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// One strategy for finding a page element.
#[derive(Debug, Clone, PartialEq)]
pub enum Locator {
    /// Structural match against a CSS selector.
    Css(String),
    /// Accessibility match: role plus accessible-name containment.
    Role { role: String, name: String },
    /// Free-text containment anywhere in the document.
    Text(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Locator::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    pub fn text(needle: impl Into<String>) -> Self {
        Locator::Text(needle.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "css:{selector}"),
            Locator::Role { role, name } => write!(f, "role:{role}[name~={name}]"),
            Locator::Text(needle) => write!(f, "text:{needle}"),
        }
    }
}

/// Resolve the first candidate that matches within its timeout slice.
///
/// Candidates are tried strictly in declared order; each kind dispatches to
/// its own query mechanism and strategies are never mixed mid-candidate.
/// Exhaustion is reported as `None`, never as an error — worst case the call
/// takes the sum of per-candidate timeouts.
pub async fn resolve_first<D: PageDriver>(
    page: &D,
    goal: &str,
    candidates: &[Locator],
    per_candidate_timeout: Duration,
) -> Option<D::Element> {
    for (index, candidate) in candidates.iter().enumerate() {
        let hit = match candidate {
            Locator::Css(selector) => page.find_css(selector, per_candidate_timeout).await,
            Locator::Role { role, name } => {
                page.find_role(role, name, per_candidate_timeout).await
            }
            Locator::Text(needle) => page.find_text(needle, per_candidate_timeout).await,
        };

        if hit.is_some() {
            debug!(goal, candidate = %candidate, index, "locator resolved");
            return hit;
        }
    }

    debug!(goal, tried = candidates.len(), "locator exhausted, not found");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::css("article").to_string(), "css:article");
        assert_eq!(
            Locator::role("button", "Apply").to_string(),
            "role:button[name~=Apply]"
        );
        assert_eq!(Locator::text("Filter").to_string(), "text:Filter");
    }

    #[test]
    fn test_locator_constructors() {
        assert_eq!(Locator::css("div.a"), Locator::Css("div.a".to_string()));
        assert_eq!(
            Locator::role("checkbox", "High"),
            Locator::Role {
                role: "checkbox".to_string(),
                name: "High".to_string()
            }
        );
    }
}
