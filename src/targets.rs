//! Built-in capture targets and the sequential runner
//!
//! Each target is an independent instantiation of the same generic routine:
//! open a session, best-effort filter, lazy-load scroll, resolve the capture
//! region. Markup guesses live here as ordered locator lists, so a target
//! survives a site redesign by gaining or losing candidates without any
//! change to the components that consume them.

use crate::capture::{capture_region, CaptureResult};
use crate::config::Config;
use crate::driver::Browsing;
use crate::events;
use crate::filters::{apply_filter, FilterStep, FilterValue};
use crate::locator::Locator;
use crate::output::{self, OutputName};
use crate::scroller::{run_scroll, ScrollPlan};
use crate::session::PageSession;
use tracing::{info, info_span, warn, Instrument};

/// Static description of one scraped target.
#[derive(Debug, Clone)]
pub struct TargetSpec {
    pub name: &'static str,
    pub url: &'static str,
    pub consent: Vec<Locator>,
    pub filter: Option<FilterStep>,
    pub scroll: Option<ScrollPlan>,
    pub region: Vec<Locator>,
    pub output: OutputName,
}

/// The registered scraped targets, in run order.
pub fn builtin_targets(config: &Config) -> Vec<TargetSpec> {
    vec![
        pinned_post(),
        fx_week(config),
        econ_week(config),
    ]
}

/// Pinned earnings post on a social profile. No filters, no lazy loading;
/// the first article on the profile is the pinned one.
fn pinned_post() -> TargetSpec {
    TargetSpec {
        name: "pinned_post",
        url: "https://x.com/eWhispers",
        consent: vec![
            Locator::text("Accept all cookies"),
            Locator::role("button", "Accept all cookies"),
        ],
        filter: None,
        scroll: None,
        region: vec![
            Locator::css("article[data-testid=\"tweet\"]"),
            Locator::css("article"),
            Locator::role("article", "Pinned"),
        ],
        output: OutputName::stable("earnings_calendar.png"),
    }
}

/// Week-range economic calendar, restricted to high-impact rows for a
/// small currency set. The site pre-selects every impact level, so lower
/// levels are unticked before the wanted ones are ensured on.
fn fx_week(config: &Config) -> TargetSpec {
    TargetSpec {
        name: "fx_week",
        url: "https://www.forexfactory.com/calendar?week=this",
        consent: vec![
            Locator::text("Accept all"),
            Locator::role("button", "AGREE"),
        ],
        filter: Some(FilterStep {
            name: "high impact, USD/CAD".to_string(),
            open_panel: vec![
                Locator::css(".calendar__options a.highlight"),
                Locator::role("link", "Filter"),
                Locator::text("Filter"),
            ],
            clear_all: vec![
                Locator::role("button", "Deselect All"),
                Locator::text("Deselect All"),
            ],
            exclude: vec![
                FilterValue::new(
                    "low impact",
                    vec![
                        Locator::css("input[name=\"impacts[]\"][value=\"1\"]"),
                        Locator::role("checkbox", "Low Impact Expected"),
                    ],
                ),
                FilterValue::new(
                    "medium impact",
                    vec![
                        Locator::css("input[name=\"impacts[]\"][value=\"2\"]"),
                        Locator::role("checkbox", "Medium Impact Expected"),
                    ],
                ),
            ],
            include: vec![
                FilterValue::new(
                    "high impact",
                    vec![
                        Locator::css("input[name=\"impacts[]\"][value=\"3\"]"),
                        Locator::role("checkbox", "High Impact Expected"),
                    ],
                ),
                FilterValue::new(
                    "USD",
                    vec![
                        Locator::css("input[name=\"currencies[]\"][value=\"9\"]"),
                        Locator::role("checkbox", "USD"),
                    ],
                ),
                FilterValue::new(
                    "CAD",
                    vec![
                        Locator::css("input[name=\"currencies[]\"][value=\"5\"]"),
                        Locator::role("checkbox", "CAD"),
                    ],
                ),
            ],
            apply: vec![
                Locator::role("button", "Apply Filter"),
                Locator::text("Apply Filter"),
            ],
        }),
        scroll: Some(
            ScrollPlan::new(
                vec!["Fri".to_string(), "Sat".to_string()],
                config.scroll_budget,
                config.content_probe_bytes,
            )
            .with_surface(vec![Locator::css(".calendar__scroll")])
            .with_pause(std::time::Duration::from_millis(1200)),
        ),
        region: vec![
            Locator::css(".calendar__table"),
            Locator::css("table.calendar"),
        ],
        output: OutputName::stable("forexfactory_high_impact.png"),
    }
}

/// Second calendar-site instantiation of the same routine: different
/// markup guesses, dated output with a refreshed latest alias.
fn econ_week(config: &Config) -> TargetSpec {
    TargetSpec {
        name: "econ_week",
        url: "https://www.investing.com/economic-calendar/",
        consent: vec![
            Locator::css("#onetrust-accept-btn-handler"),
            Locator::role("button", "I Accept"),
            Locator::text("I Accept"),
        ],
        filter: Some(FilterStep {
            name: "three-star importance".to_string(),
            open_panel: vec![
                Locator::css("#filterStateAnchor"),
                Locator::role("link", "Filters"),
                Locator::text("Filters"),
            ],
            clear_all: vec![Locator::text("Clear")],
            exclude: Vec::new(),
            include: vec![FilterValue::new(
                "3 stars",
                vec![
                    Locator::css("input#importance3"),
                    Locator::role("checkbox", "3 stars"),
                ],
            )],
            apply: vec![
                Locator::css("#ecSubmitButton"),
                Locator::role("button", "Apply"),
            ],
        }),
        scroll: Some(
            ScrollPlan::new(
                vec!["Friday".to_string(), "Saturday".to_string()],
                config.scroll_budget,
                config.content_probe_bytes,
            ),
        ),
        region: vec![
            Locator::css("#economicCalendarData"),
            Locator::css("table.genTbl"),
        ],
        output: OutputName::dated("econ_week", true),
    }
}

/// Run one scraped target end-to-end. Session acquisition and navigation
/// are the only failures that reach the result directly; everything past
/// them degrades instead of aborting.
pub async fn run_target<B: Browsing>(
    browser: &B,
    spec: &TargetSpec,
    config: &Config,
) -> CaptureResult {
    let dest = match output::prepare_dest(&spec.output, &config.output_dir).await {
        Ok(dest) => dest,
        Err(err) => return CaptureResult::failed(spec.name, err),
    };

    let session = match PageSession::open(browser, spec.url, &spec.consent, &config.timing).await
    {
        Ok(session) => session,
        Err(err) => {
            warn!(target = spec.name, %err, "session could not be opened");
            return CaptureResult::failed(spec.name, err);
        }
    };

    if let Some(filter) = &spec.filter {
        apply_filter(session.page(), filter, &config.timing).await;
    }

    if let Some(plan) = &spec.scroll {
        run_scroll(session.page(), plan, &config.timing).await;
    }

    let result = capture_region(
        session.page(),
        spec.name,
        &spec.region,
        &config.timing,
        config.clip_height_cap,
        &dest,
    )
    .await;
    session.close().await;

    if result.success {
        output::refresh_latest(&spec.output, &config.output_dir, &dest).await;
    }
    result
}

fn is_enabled(config: &Config, name: &str) -> bool {
    match &config.enabled_targets {
        Some(names) => names.iter().any(|n| n == name),
        None => true,
    }
}

/// Run every enabled target, one after another on the shared context, then
/// the structured-events variant when its endpoint is configured. One
/// target's outcome never affects a sibling's.
pub async fn run_all<B: Browsing>(browser: &B, config: &Config) -> Vec<CaptureResult> {
    let mut results = Vec::new();

    for spec in builtin_targets(config) {
        if !is_enabled(config, spec.name) {
            info!(target = spec.name, "target disabled, skipping");
            continue;
        }
        let result = run_target(browser, &spec, config)
            .instrument(info_span!("target", name = spec.name))
            .await;
        results.push(result);
    }

    if config.events_api_url.is_some() && is_enabled(config, events::EVENTS_TARGET) {
        let result = events::capture_events(browser, config)
            .instrument(info_span!("target", name = events::EVENTS_TARGET))
            .await;
        results.push(result);
    }

    results
}
