//! chromiumoxide-backed implementation of the driver traits
//!
//! One headless Chrome process hosts one shared browsing context; page
//! handles are opened from it per target. The CDP handler stream must be
//! polled for the lifetime of the browser, so it is drained in a spawned
//! task.

use crate::config::{create_browser_config, Config, Viewport};
use crate::driver::{Browsing, PageDriver, Rect, ToggleProbe};
use crate::CaptureError;
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, Viewport as ClipViewport,
};
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The shared browser process and its handler task.
pub struct CdpBrowser {
    browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
    viewport: Viewport,
}

impl CdpBrowser {
    /// Launch headless Chrome. This is the one fatal failure point of a
    /// run; everything after launch degrades per target instead.
    pub async fn launch(config: &Config) -> Result<Self, CaptureError> {
        let browser_config = create_browser_config(config)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CaptureError::BrowserLaunchFailed(e.to_string()))?;

        // The handler implements Stream and must be polled in a loop for
        // CDP communication to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    error!(%err, "browser handler error");
                    break;
                }
            }
            info!("browser handler stream ended");
        });

        Ok(Self {
            browser,
            handler_task,
            viewport: config.viewport.clone(),
        })
    }

    pub async fn shutdown(mut self) {
        info!("shutting down browser");
        let _ = self.browser.close().await;
        self.handler_task.abort();
    }
}

#[async_trait]
impl Browsing for CdpBrowser {
    type Page = CdpPage;

    async fn open_page(&self) -> Result<CdpPage, CaptureError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::PageUnavailable(e.to_string()))?;

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(self.viewport.width)
            .height(self.viewport.height)
            .device_scale_factor(self.viewport.device_scale_factor)
            .mobile(self.viewport.mobile)
            .build()
            .map_err(|e| CaptureError::PageUnavailable(e.to_string()))?;
        page.execute(metrics)
            .await
            .map_err(|e| CaptureError::PageUnavailable(e.to_string()))?;

        Ok(CdpPage { page })
    }
}

/// Element handle; cheap to clone, valid for the lifetime of its page.
#[derive(Clone)]
pub struct CdpElement(Arc<Element>);

impl CdpElement {
    fn new(element: Element) -> Self {
        Self(Arc::new(element))
    }
}

/// One page handle inside the shared context.
pub struct CdpPage {
    page: Page,
}

#[derive(Debug, Deserialize)]
struct JsRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// CSS selectors that cover an ARIA role's explicit and common implicit
/// forms.
fn role_selector(role: &str) -> String {
    match role {
        "button" => "button, [role=\"button\"], input[type=\"submit\"]".to_string(),
        "link" => "a, [role=\"link\"]".to_string(),
        "checkbox" => "input[type=\"checkbox\"], [role=\"checkbox\"]".to_string(),
        "article" => "article, [role=\"article\"]".to_string(),
        other => format!("[role=\"{other}\"]"),
    }
}

/// XPath string literal, quoting-safe.
fn xpath_literal(raw: &str) -> String {
    if !raw.contains('"') {
        format!("\"{raw}\"")
    } else if !raw.contains('\'') {
        format!("'{raw}'")
    } else {
        let parts: Vec<String> = raw.split('"').map(|p| format!("\"{p}\"")).collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

impl CdpPage {
    /// Accessible-name approximation: aria-label or rendered text,
    /// containment, case-insensitive.
    async fn name_matches(&self, element: &Element, name: &str) -> bool {
        let wanted = name.to_lowercase();

        if let Ok(Some(label)) = element.attribute("aria-label").await {
            if label.to_lowercase().contains(&wanted) {
                return true;
            }
        }
        if let Ok(Some(text)) = element.inner_text().await {
            if text.to_lowercase().contains(&wanted) {
                return true;
            }
        }
        false
    }

    async fn find_role_once(&self, role: &str, name: &str) -> Option<CdpElement> {
        let candidates = self.page.find_elements(role_selector(role)).await.ok()?;
        for candidate in candidates {
            if self.name_matches(&candidate, name).await {
                return Some(CdpElement::new(candidate));
            }
        }
        None
    }

    async fn element_js_rect(&self, element: &Element) -> Option<JsRect> {
        let returned = element
            .call_js_fn(
                "function() { \
                   const r = this.getBoundingClientRect(); \
                   return JSON.stringify({ \
                     x: r.x + window.scrollX, y: r.y + window.scrollY, \
                     width: r.width, height: r.height }); \
                 }",
                false,
            )
            .await
            .ok()?;

        let value = returned.result.value?;
        let json = value.as_str()?;
        serde_json::from_str(json).ok()
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    type Element = CdpElement;

    async fn goto(&self, url: &str) -> Result<(), CaptureError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| CaptureError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn find_css(&self, selector: &str, timeout: Duration) -> Option<CdpElement> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(element) = self.page.find_element(selector).await {
                return Some(CdpElement::new(element));
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn find_role(&self, role: &str, name: &str, timeout: Duration) -> Option<CdpElement> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(hit) = self.find_role_once(role, name).await {
                return Some(hit);
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn find_text(&self, needle: &str, timeout: Duration) -> Option<CdpElement> {
        let xpath = format!("//*[contains(text(), {})]", xpath_literal(needle));
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(element) = self.page.find_xpath(xpath.as_str()).await {
                return Some(CdpElement::new(element));
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn activate(&self, element: &CdpElement) -> Result<(), CaptureError> {
        element
            .0
            .scroll_into_view()
            .await
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        element
            .0
            .click()
            .await
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        Ok(())
    }

    async fn toggle_on(&self, element: &CdpElement) -> Result<ToggleProbe, CaptureError> {
        let kind = element
            .0
            .attribute("type")
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        let role = element
            .0
            .attribute("role")
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        let aria_checked = element.0.attribute("aria-checked").await.ok().flatten();

        let is_toggle = kind == "checkbox" || role == "checkbox" || aria_checked.is_some();
        if !is_toggle {
            return Ok(ToggleProbe::NotAToggle);
        }

        let already_on = match aria_checked.as_deref() {
            Some("true") => true,
            Some(_) => false,
            None => element
                .0
                .call_js_fn("function() { return !!this.checked; }", false)
                .await
                .ok()
                .and_then(|ret| ret.result.value)
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        };

        if already_on {
            return Ok(ToggleProbe::AlreadyOn);
        }

        self.activate(element).await?;
        Ok(ToggleProbe::Applied)
    }

    async fn scroll_by_viewport(&self, surface: Option<&CdpElement>) -> Result<(), CaptureError> {
        match surface {
            Some(element) => {
                element
                    .0
                    .call_js_fn(
                        "function() { this.scrollBy(0, this.clientHeight); }",
                        false,
                    )
                    .await
                    .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
            }
            None => {
                self.page
                    .evaluate("window.scrollBy(0, window.innerHeight)")
                    .await
                    .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
            }
        }
        Ok(())
    }

    async fn scroll_to_top(&self, surface: Option<&CdpElement>) -> Result<(), CaptureError> {
        match surface {
            Some(element) => {
                element
                    .0
                    .call_js_fn("function() { this.scrollTo(0, 0); }", false)
                    .await
                    .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
            }
            None => {
                self.page
                    .evaluate("window.scrollTo(0, 0)")
                    .await
                    .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
            }
        }
        Ok(())
    }

    async fn content_prefix(&self, max_bytes: usize) -> Result<String, CaptureError> {
        let mut content = self
            .page
            .content()
            .await
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        if content.len() > max_bytes {
            let mut cut = max_bytes;
            while cut > 0 && !content.is_char_boundary(cut) {
                cut -= 1;
            }
            content.truncate(cut);
        }
        Ok(content)
    }

    async fn bounding_box(&self, element: &CdpElement) -> Option<Rect> {
        let rect = self.element_js_rect(&element.0).await?;
        Some(Rect::new(rect.x, rect.y, rect.width, rect.height))
    }

    async fn screenshot_element(&self, element: &CdpElement) -> Result<Vec<u8>, CaptureError> {
        element
            .0
            .screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))
    }

    async fn screenshot_clip(&self, clip: Rect) -> Result<Vec<u8>, CaptureError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .clip(
                ClipViewport::builder()
                    .x(clip.x)
                    .y(clip.y)
                    .width(clip.width)
                    .height(clip.height)
                    .scale(1.0)
                    .build()
                    .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?,
            )
            .build();

        self.page
            .screenshot(params)
            .await
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))
    }

    async fn screenshot_full(&self) -> Result<Vec<u8>, CaptureError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        self.page
            .screenshot(params)
            .await
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))
    }

    async fn set_content(&self, html: &str) -> Result<(), CaptureError> {
        self.page
            .set_content(html)
            .await
            .map_err(|e| CaptureError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) {
        if let Err(err) = self.page.clone().close().await {
            debug!(%err, "page close failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_selector_covers_implicit_forms() {
        assert!(role_selector("button").contains("button,"));
        assert!(role_selector("link").starts_with("a,"));
        assert!(role_selector("checkbox").contains("input[type=\"checkbox\"]"));
        assert_eq!(role_selector("tab"), "[role=\"tab\"]");
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("Accept all"), "\"Accept all\"");
        assert_eq!(xpath_literal("it\"s"), "'it\"s'");
        assert_eq!(
            xpath_literal("a\"b'c"),
            "concat(\"a\", '\"', \"b'c\")"
        );
    }
}
