#[cfg(test)]
mod pipeline_tests {
    use crate::actions::{self, Action};
    use crate::capture::{capture_region, CaptureRung};
    use crate::config::{Config, Timing};
    use crate::driver::{Browsing, PageDriver, Rect, ToggleProbe};
    use crate::filters::{apply_filter, FilterStep, FilterValue};
    use crate::locator::{resolve_first, Locator};
    use crate::output::OutputName;
    use crate::scroller::{run_scroll, ScrollPlan};
    use crate::session::PageSession;
    use crate::targets::{run_all, run_target, TargetSpec};
    use crate::CaptureError;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone)]
    struct FakeElement {
        id: String,
        bounds: Option<Rect>,
        shot_fails: bool,
    }

    fn el(id: &str) -> FakeElement {
        FakeElement {
            id: id.to_string(),
            bounds: Some(Rect::new(0.0, 0.0, 800.0, 600.0)),
            shot_fails: false,
        }
    }

    /// In-memory page: same capability surface as the Chrome driver, no
    /// waits, everything observable.
    #[derive(Default)]
    struct FakePage {
        css: HashMap<String, FakeElement>,
        roles: HashMap<(String, String), FakeElement>,
        texts: HashMap<String, FakeElement>,
        toggles: Mutex<HashMap<String, bool>>,
        failing_actions: HashSet<String>,
        base_content: String,
        marker_after: Option<(usize, String)>,
        scroll_fails_after: Option<usize>,
        scroll_steps: AtomicUsize,
        reset_calls: AtomicUsize,
        activations: Mutex<Vec<String>>,
        clips: Mutex<Vec<Rect>>,
        full_captures: AtomicUsize,
        visited: Mutex<Vec<String>>,
        set_html: Mutex<Option<String>>,
    }

    impl FakePage {
        fn new() -> Self {
            Self::default()
        }

        fn with_css(mut self, selector: &str, element: FakeElement) -> Self {
            self.css.insert(selector.to_string(), element);
            self
        }

        fn with_role(mut self, role: &str, name: &str, element: FakeElement) -> Self {
            self.roles
                .insert((role.to_string(), name.to_string()), element);
            self
        }

        fn with_text(mut self, needle: &str, element: FakeElement) -> Self {
            self.texts.insert(needle.to_string(), element);
            self
        }

        fn with_toggle(self, id: &str, on: bool) -> Self {
            self.toggles.lock().unwrap().insert(id.to_string(), on);
            self
        }

        fn with_failing_action(mut self, id: &str) -> Self {
            self.failing_actions.insert(id.to_string());
            self
        }

        fn with_content(mut self, content: &str) -> Self {
            self.base_content = content.to_string();
            self
        }

        fn with_marker_after(mut self, step: usize, marker: &str) -> Self {
            self.marker_after = Some((step, marker.to_string()));
            self
        }

        fn with_scroll_failure_after(mut self, step: usize) -> Self {
            self.scroll_fails_after = Some(step);
            self
        }

        fn shared(self) -> Arc<Self> {
            Arc::new(self)
        }

        fn activations(&self) -> Vec<String> {
            self.activations.lock().unwrap().clone()
        }

        fn clips(&self) -> Vec<Rect> {
            self.clips.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageDriver for Arc<FakePage> {
        type Element = FakeElement;

        async fn goto(&self, url: &str) -> Result<(), CaptureError> {
            self.visited.lock().unwrap().push(url.to_string());
            Ok(())
        }

        async fn find_css(&self, selector: &str, _timeout: Duration) -> Option<FakeElement> {
            self.css.get(selector).cloned()
        }

        async fn find_role(
            &self,
            role: &str,
            name: &str,
            _timeout: Duration,
        ) -> Option<FakeElement> {
            self.roles.get(&(role.to_string(), name.to_string())).cloned()
        }

        async fn find_text(&self, needle: &str, _timeout: Duration) -> Option<FakeElement> {
            self.texts.get(needle).cloned()
        }

        async fn activate(&self, element: &FakeElement) -> Result<(), CaptureError> {
            if self.failing_actions.contains(&element.id) {
                return Err(CaptureError::CaptureFailed("activation refused".to_string()));
            }
            self.activations.lock().unwrap().push(element.id.clone());
            Ok(())
        }

        async fn toggle_on(&self, element: &FakeElement) -> Result<ToggleProbe, CaptureError> {
            let mut toggles = self.toggles.lock().unwrap();
            match toggles.get(&element.id).copied() {
                None => Ok(ToggleProbe::NotAToggle),
                Some(true) => Ok(ToggleProbe::AlreadyOn),
                Some(false) => {
                    toggles.insert(element.id.clone(), true);
                    Ok(ToggleProbe::Applied)
                }
            }
        }

        async fn scroll_by_viewport(
            &self,
            _surface: Option<&FakeElement>,
        ) -> Result<(), CaptureError> {
            let step = self.scroll_steps.load(Ordering::SeqCst);
            if let Some(limit) = self.scroll_fails_after {
                if step >= limit {
                    return Err(CaptureError::CaptureFailed("surface detached".to_string()));
                }
            }
            self.scroll_steps.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn scroll_to_top(&self, _surface: Option<&FakeElement>) -> Result<(), CaptureError> {
            self.reset_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn content_prefix(&self, max_bytes: usize) -> Result<String, CaptureError> {
            let mut content = self.base_content.clone();
            if let Some((step, marker)) = &self.marker_after {
                if self.scroll_steps.load(Ordering::SeqCst) >= *step {
                    content.push_str(marker);
                }
            }
            content.truncate(content.len().min(max_bytes));
            Ok(content)
        }

        async fn bounding_box(&self, element: &FakeElement) -> Option<Rect> {
            element.bounds
        }

        async fn screenshot_element(&self, element: &FakeElement) -> Result<Vec<u8>, CaptureError> {
            if element.shot_fails {
                return Err(CaptureError::CaptureFailed("element capture lost".to_string()));
            }
            Ok(b"element-bytes".to_vec())
        }

        async fn screenshot_clip(&self, clip: Rect) -> Result<Vec<u8>, CaptureError> {
            self.clips.lock().unwrap().push(clip);
            Ok(b"clip-bytes".to_vec())
        }

        async fn screenshot_full(&self) -> Result<Vec<u8>, CaptureError> {
            self.full_captures.fetch_add(1, Ordering::SeqCst);
            Ok(b"full-page-bytes".to_vec())
        }

        async fn set_content(&self, html: &str) -> Result<(), CaptureError> {
            *self.set_html.lock().unwrap() = Some(html.to_string());
            Ok(())
        }

        async fn close(&self) {}

        async fn pause(&self, _duration: Duration) {}
    }

    struct FakeBrowser {
        page: Arc<FakePage>,
    }

    #[async_trait]
    impl Browsing for FakeBrowser {
        type Page = Arc<FakePage>;

        async fn open_page(&self) -> Result<Arc<FakePage>, CaptureError> {
            Ok(self.page.clone())
        }
    }

    fn timing() -> Timing {
        Timing::default()
    }

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("calshot-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    // Resolution is order-deterministic: the earliest matching candidate
    // wins even when later candidates also match.
    #[tokio::test]
    async fn resolver_prefers_earliest_matching_candidate() {
        let page = FakePage::new()
            .with_css("#second", el("second"))
            .with_css("#fourth", el("fourth"))
            .shared();

        let candidates = vec![
            Locator::css("#first"),
            Locator::css("#second"),
            Locator::css("#third"),
            Locator::css("#fourth"),
        ];

        let hit = resolve_first(&page, "goal", &candidates, timing().locator_timeout).await;
        assert_eq!(hit.unwrap().id, "second");
    }

    #[tokio::test]
    async fn resolver_reports_not_found_without_error() {
        let page = FakePage::new().shared();
        let candidates = vec![Locator::css("#missing"), Locator::text("nope")];
        assert!(
            resolve_first(&page, "goal", &candidates, timing().locator_timeout)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn resolver_dispatches_each_strategy_kind() {
        let page = FakePage::new()
            .with_role("button", "Apply", el("role-hit"))
            .shared();

        let candidates = vec![
            Locator::css("#missing"),
            Locator::role("button", "Apply"),
            Locator::text("Apply"),
        ];
        let hit = resolve_first(&page, "goal", &candidates, timing().locator_timeout).await;
        assert_eq!(hit.unwrap().id, "role-hit");
    }

    #[tokio::test]
    async fn executor_reports_failure_as_false() {
        let page = FakePage::new().with_failing_action("stubborn").shared();
        assert!(!actions::perform(&page, &el("stubborn"), Action::Activate).await);
        assert!(actions::perform(&page, &el("fine"), Action::Activate).await);
    }

    #[tokio::test]
    async fn executor_toggle_falls_back_to_activate() {
        let page = FakePage::new().with_toggle("real-toggle", false).shared();

        // True toggle control: applied without a click.
        assert!(actions::perform(&page, &el("real-toggle"), Action::ToggleOn).await);
        assert!(page.activations().is_empty());

        // Already-on toggle is success, still no click.
        assert!(actions::perform(&page, &el("real-toggle"), Action::ToggleOn).await);
        assert!(page.activations().is_empty());

        // Not a toggle control: falls back to a plain activation.
        assert!(actions::perform(&page, &el("plain-button"), Action::ToggleOn).await);
        assert_eq!(page.activations(), vec!["plain-button".to_string()]);
    }

    fn impact_filter() -> FilterStep {
        FilterStep {
            name: "impact".to_string(),
            open_panel: vec![Locator::text("Filter")],
            clear_all: vec![Locator::text("Clear")],
            exclude: vec![FilterValue::new("low", vec![Locator::css("#low")])],
            include: vec![
                FilterValue::new("high", vec![Locator::css("#high")]),
                FilterValue::new("usd", vec![Locator::css("#usd")]),
            ],
            apply: vec![Locator::text("Apply")],
        }
    }

    #[tokio::test]
    async fn filter_sequence_runs_in_declared_order() {
        let page = FakePage::new()
            .with_text("Filter", el("open"))
            .with_text("Clear", el("clear"))
            .with_css("#low", el("low"))
            .with_css("#high", el("high"))
            .with_css("#usd", el("usd"))
            .with_text("Apply", el("apply"))
            .with_toggle("high", false)
            .with_toggle("usd", false)
            .shared();

        let outcome = apply_filter(&page, &impact_filter(), &timing()).await;

        assert!(outcome.fully_applied());
        assert_eq!(outcome.panel_opened, Some(true));
        assert_eq!(outcome.cleared, Some(true));
        assert_eq!(outcome.excluded, vec![("low".to_string(), true)]);
        assert_eq!(
            outcome.included,
            vec![("high".to_string(), true), ("usd".to_string(), true)]
        );
        assert_eq!(outcome.applied, Some(true));
        // Toggles are driven through toggle semantics, everything else is a
        // click; the clicks happen in sequence order.
        assert_eq!(
            page.activations(),
            vec!["open".to_string(), "clear".to_string(), "low".to_string(), "apply".to_string()]
        );
        assert!(*page.toggles.lock().unwrap().get("high").unwrap());
    }

    #[tokio::test]
    async fn filter_sequence_survives_missing_controls() {
        // Nothing the filter wants exists on this page.
        let page = FakePage::new().shared();
        let outcome = apply_filter(&page, &impact_filter(), &timing()).await;

        assert!(!outcome.fully_applied());
        assert_eq!(outcome.panel_opened, Some(false));
        assert_eq!(outcome.included.len(), 2);
        assert!(outcome.included.iter().all(|(_, ok)| !ok));
    }

    #[tokio::test]
    async fn filter_records_per_value_success_independently() {
        let page = FakePage::new()
            .with_css("#high", el("high"))
            .with_toggle("high", false)
            .shared();

        let outcome = apply_filter(&page, &impact_filter(), &timing()).await;
        assert_eq!(
            outcome.included,
            vec![("high".to_string(), true), ("usd".to_string(), false)]
        );
    }

    fn week_plan(budget: usize, probe: usize) -> ScrollPlan {
        ScrollPlan::new(vec!["Fri".to_string(), "Sat".to_string()], budget, probe)
    }

    // A marker appearing after the 5th advance stops the scroller at or
    // before step 6.
    #[tokio::test]
    async fn scroller_stops_on_late_marker() {
        let page = FakePage::new()
            .with_content("Mon Tue Wed ")
            .with_marker_after(5, "Fri")
            .shared();

        let outcome = run_scroll(&page, &week_plan(16, 4096), &timing()).await;

        assert!(outcome.marker_seen);
        assert!(outcome.steps_taken <= 6);
        assert!(outcome.reset_ok);
        assert_eq!(page.reset_calls.load(Ordering::SeqCst), 1);
    }

    // Without a marker the scroller stops exactly at the budget.
    #[tokio::test]
    async fn scroller_exhausts_budget_without_marker() {
        let page = FakePage::new().with_content("Mon Tue Wed ").shared();

        let outcome = run_scroll(&page, &week_plan(16, 4096), &timing()).await;

        assert!(!outcome.marker_seen);
        assert_eq!(outcome.steps_taken, 16);
        assert_eq!(page.scroll_steps.load(Ordering::SeqCst), 16);
        assert!(outcome.reset_ok);
    }

    #[tokio::test]
    async fn scroller_probe_is_bounded() {
        // The marker sits past the probe window, so it is never observed.
        let page = FakePage::new()
            .with_content(&"x".repeat(8192))
            .with_marker_after(1, "Fri")
            .shared();

        let outcome = run_scroll(&page, &week_plan(12, 512), &timing()).await;
        assert!(!outcome.marker_seen);
        assert_eq!(outcome.steps_taken, 12);
    }

    #[tokio::test]
    async fn scroller_resets_even_after_scroll_failure() {
        let page = FakePage::new()
            .with_content("Mon")
            .with_scroll_failure_after(3)
            .shared();

        let outcome = run_scroll(&page, &week_plan(16, 4096), &timing()).await;

        assert_eq!(outcome.steps_taken, 3);
        assert!(!outcome.marker_seen);
        assert_eq!(page.reset_calls.load(Ordering::SeqCst), 1);
    }

    // Fallback totality: every container outcome still produces a
    // non-empty artifact.
    #[tokio::test]
    async fn capture_ladder_rung_one_element() {
        let dir = scratch_dir();
        let dest = dir.join("one.png");
        let page = FakePage::new().with_css(".content", el("content")).shared();

        let result = capture_region(
            &page,
            "t",
            &[Locator::css(".content")],
            &timing(),
            4000,
            &dest,
        )
        .await;

        assert!(result.success);
        assert_eq!(result.rung, Some(CaptureRung::Element));
        assert!(std::fs::metadata(&dest).unwrap().len() > 0);
    }

    #[tokio::test]
    async fn capture_ladder_rung_two_bounding_clip() {
        let dir = scratch_dir();
        let dest = dir.join("two.png");
        let mut container = el("content");
        container.shot_fails = true;
        container.bounds = Some(Rect::new(5.0, 10.0, 700.0, 9000.0));
        let page = FakePage::new().with_css(".content", container).shared();

        let result = capture_region(
            &page,
            "t",
            &[Locator::css(".content")],
            &timing(),
            4000,
            &dest,
        )
        .await;

        assert!(result.success);
        assert_eq!(result.rung, Some(CaptureRung::BoundingClip));
        assert_eq!(page.clips(), vec![Rect::new(5.0, 10.0, 700.0, 4000.0)]);
        assert!(std::fs::metadata(&dest).unwrap().len() > 0);
    }

    #[tokio::test]
    async fn capture_ladder_rung_three_boundless_container() {
        let dir = scratch_dir();
        let dest = dir.join("three.png");
        let mut container = el("content");
        container.shot_fails = true;
        container.bounds = None;
        let page = FakePage::new().with_css(".content", container).shared();

        let result = capture_region(
            &page,
            "t",
            &[Locator::css(".content")],
            &timing(),
            4000,
            &dest,
        )
        .await;

        assert!(result.success);
        assert_eq!(result.rung, Some(CaptureRung::FullPage));
        assert!(std::fs::metadata(&dest).unwrap().len() > 0);
    }

    #[tokio::test]
    async fn capture_ladder_rung_three_no_container() {
        let dir = scratch_dir();
        let dest = dir.join("none.png");
        let page = FakePage::new().shared();

        let result = capture_region(
            &page,
            "t",
            &[Locator::css(".content"), Locator::text("Calendar")],
            &timing(),
            4000,
            &dest,
        )
        .await;

        assert!(result.success);
        assert_eq!(result.rung, Some(CaptureRung::FullPage));
        assert!(std::fs::metadata(&dest).unwrap().len() > 0);
    }

    // Unchanged layout, repeated invocation, identical clip coordinates.
    #[tokio::test]
    async fn capture_clip_is_idempotent() {
        let dir = scratch_dir();
        let mut container = el("content");
        container.shot_fails = true;
        container.bounds = Some(Rect::new(3.0, 7.0, 640.0, 5200.0));
        let page = FakePage::new().with_css(".content", container).shared();

        for name in ["a.png", "b.png"] {
            capture_region(
                &page,
                "t",
                &[Locator::css(".content")],
                &timing(),
                4000,
                &dir.join(name),
            )
            .await;
        }

        let clips = page.clips();
        assert_eq!(clips.len(), 2);
        assert_eq!(clips[0], clips[1]);
    }

    fn spec_with(region: Vec<Locator>, filter: Option<FilterStep>, dir: &std::path::Path) -> (TargetSpec, Config) {
        let spec = TargetSpec {
            name: "probe",
            url: "https://example.com/calendar",
            consent: vec![Locator::text("Accept all cookies")],
            filter,
            scroll: None,
            region,
            output: OutputName::stable("probe.png"),
        };
        let config = Config {
            output_dir: dir.to_path_buf(),
            ..Default::default()
        };
        (spec, config)
    }

    // A filter whose open control never resolves still ends with an
    // artifact on disk.
    #[tokio::test]
    async fn broken_filter_never_blocks_capture() {
        let dir = scratch_dir();
        let page = FakePage::new().with_css(".content", el("content")).shared();
        let browser = FakeBrowser { page: page.clone() };

        let (spec, config) = spec_with(
            vec![Locator::css(".content")],
            Some(impact_filter()),
            &dir,
        );
        let result = run_target(&browser, &spec, &config).await;

        assert!(result.success);
        assert_eq!(result.rung, Some(CaptureRung::Element));
        assert!(dir.join("probe.png").exists());
        assert_eq!(
            page.visited.lock().unwrap().clone(),
            vec!["https://example.com/calendar".to_string()]
        );
    }

    // A page that never renders a recognizable content element still
    // produces a full-page image.
    #[tokio::test]
    async fn unrecognizable_page_degrades_to_full_page() {
        let dir = scratch_dir();
        let page = FakePage::new().shared();
        let browser = FakeBrowser { page: page.clone() };

        let (spec, config) = spec_with(vec![Locator::css(".content")], None, &dir);
        let result = run_target(&browser, &spec, &config).await;

        assert!(result.success);
        assert_eq!(result.rung, Some(CaptureRung::FullPage));
        assert!(dir.join("probe.png").exists());
        assert_eq!(page.full_captures.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn session_dismisses_consent_when_present() {
        let page = FakePage::new()
            .with_text("Accept all cookies", el("consent"))
            .shared();
        let browser = FakeBrowser { page: page.clone() };

        let session = PageSession::open(
            &browser,
            "https://example.com",
            &[Locator::text("Accept all cookies")],
            &timing(),
        )
        .await
        .unwrap();
        session.close().await;

        assert_eq!(page.activations(), vec!["consent".to_string()]);
    }

    #[tokio::test]
    async fn session_tolerates_missing_consent_prompt() {
        let page = FakePage::new().shared();
        let browser = FakeBrowser { page: page.clone() };

        let session = PageSession::open(
            &browser,
            "https://example.com",
            &[Locator::text("Accept all cookies")],
            &timing(),
        )
        .await;
        assert!(session.is_ok());
    }

    #[tokio::test]
    async fn self_authored_document_uses_full_page_path() {
        let dir = scratch_dir();
        let dest = dir.join("events.png");
        let page = FakePage::new().shared();

        page.set_content("<html><body><table></table></body></html>")
            .await
            .unwrap();
        let result = capture_region(&page, "events", &[], &timing(), 4000, &dest).await;

        assert!(result.success);
        assert_eq!(result.rung, Some(CaptureRung::FullPage));
        assert!(page.set_html.lock().unwrap().is_some());
    }

    // The registered targets all complete against a blank page; one
    // degraded sibling never suppresses another's artifact.
    #[tokio::test]
    async fn run_all_produces_one_result_per_enabled_target() {
        let dir = scratch_dir();
        let page = FakePage::new().shared();
        let browser = FakeBrowser { page: page.clone() };
        let config = Config {
            output_dir: dir.clone(),
            ..Default::default()
        };

        let results = run_all(&browser, &config).await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.success));
        assert!(dir.join("earnings_calendar.png").exists());
        assert!(dir.join("forexfactory_high_impact.png").exists());
    }

    #[tokio::test]
    async fn run_all_honours_enabled_target_filter() {
        let dir = scratch_dir();
        let page = FakePage::new().shared();
        let browser = FakeBrowser { page };
        let config = Config {
            output_dir: dir.clone(),
            enabled_targets: Some(vec!["pinned_post".to_string()]),
            ..Default::default()
        };

        let results = run_all(&browser, &config).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].target, "pinned_post");
        assert!(dir.join("earnings_calendar.png").exists());
        assert!(!dir.join("forexfactory_high_impact.png").exists());
    }
}
