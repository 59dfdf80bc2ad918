//! Configuration management with serde serialization/deserialization
//!
//! All tunables for the capture run live here: browser settings, the timing
//! table shared by every component, output location, and the optional
//! structured-events endpoint. Keeping every delay and timeout in one place
//! lets tests substitute a no-wait page driver without touching call sites.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the capture run
///
/// # Examples
///
/// ```rust
/// use calshot::Config;
///
/// // Use default configuration
/// let config = Config::default();
///
/// // Create custom configuration
/// let config = Config {
///     clip_height_cap: 3000,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Directory PNG artifacts are written to (default: `site`)
    pub output_dir: PathBuf,

    /// Browser viewport used for every page in the shared context
    pub viewport: Viewport,

    /// Custom User-Agent string for the shared browsing context
    ///
    /// Several calendar sites serve a degraded layout to headless UAs, so
    /// the default is a desktop Chrome string.
    pub user_agent: Option<String>,

    /// Path to Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,

    /// Delay and timeout table shared by every component
    pub timing: Timing,

    /// Maximum scroll steps before a lazy-load pass gives up (default: 15)
    ///
    /// Week-range calendars typically materialize fully within 12-18
    /// viewport advances.
    pub scroll_budget: usize,

    /// How much of the serialized page is scanned for completion markers
    /// after each scroll step, in bytes (default: 64 KiB)
    pub content_probe_bytes: usize,

    /// Upper bound on the height of a bounding-box clip, in pixels
    /// (default: 4000)
    pub clip_height_cap: u32,

    /// Endpoint for the structured-events variant; the variant is skipped
    /// entirely when unset
    pub events_api_url: Option<String>,

    /// Restrict the run to these target names (default: all registered)
    pub enabled_targets: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("site"),
            viewport: Viewport::default(),
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                 AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
            chrome_path: None,
            timing: Timing::default(),
            scroll_budget: 15,
            content_probe_bytes: 64 * 1024,
            clip_height_cap: 4000,
            events_api_url: None,
            enabled_targets: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), crate::CaptureError> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(crate::CaptureError::ConfigurationError(
                "Viewport dimensions must be greater than 0".to_string(),
            ));
        }
        if self.scroll_budget == 0 {
            return Err(crate::CaptureError::ConfigurationError(
                "Scroll budget must be greater than 0".to_string(),
            ));
        }
        if self.clip_height_cap == 0 {
            return Err(crate::CaptureError::ConfigurationError(
                "Clip height cap must be greater than 0".to_string(),
            ));
        }
        if self.content_probe_bytes == 0 {
            return Err(crate::CaptureError::ConfigurationError(
                "Content probe length must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Browser viewport configuration
///
/// The calendar layouts render a full week without horizontal clipping at
/// 1600x1600, which is why the default is square rather than a desktop
/// aspect ratio.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Viewport {
    /// Viewport width in pixels (default: 1600)
    pub width: u32,

    /// Viewport height in pixels (default: 1600)
    pub height: u32,

    /// Device pixel ratio for high-DPI displays (default: 1.0)
    pub device_scale_factor: f64,

    /// Whether to emulate a mobile device (default: false)
    pub mobile: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 1600,
            device_scale_factor: 1.0,
            mobile: false,
        }
    }
}

/// Every delay and timeout used by the interaction engine
///
/// Third-party pages update asynchronously after navigation and after each
/// interaction, so each wait is a tunable rather than a scattered constant.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Timing {
    /// Fixed pause after navigation before any interaction (default: 6s)
    pub navigate_settle: Duration,

    /// Budget for one locator candidate; a list of N candidates may take up
    /// to N times this before reporting not-found (default: 3s)
    pub locator_timeout: Duration,

    /// Budget for the one-shot consent dismissal lookup (default: 2s)
    pub consent_timeout: Duration,

    /// Pause after a click or toggle so dependent state can render
    /// (default: 500ms)
    pub post_action_pause: Duration,

    /// Pause after each viewport advance during lazy-load scrolling
    /// (default: 1s; fast-rendering targets can drop to 500ms)
    pub scroll_pause: Duration,

    /// Pause after restoring scroll position before capture (default: 1s)
    pub reset_settle: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            navigate_settle: Duration::from_secs(6),
            locator_timeout: Duration::from_secs(3),
            consent_timeout: Duration::from_secs(2),
            post_action_pause: Duration::from_millis(500),
            scroll_pause: Duration::from_secs(1),
            reset_settle: Duration::from_secs(1),
        }
    }
}

/// Generate Chrome command-line arguments based on configuration
///
/// # Examples
///
/// ```rust
/// use calshot::{Config, get_chrome_args};
///
/// let config = Config::default();
/// let args = get_chrome_args(&config);
/// assert!(args.iter().any(|a| a == "--headless"));
/// ```
pub fn get_chrome_args(config: &Config) -> Vec<String> {
    let mut args = vec![
        "--headless".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--disable-background-timer-throttling".to_string(),
        "--disable-backgrounding-occluded-windows".to_string(),
        "--disable-renderer-backgrounding".to_string(),
        "--disable-features=TranslateUI".to_string(),
        "--disable-extensions".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-sync".to_string(),
        "--no-first-run".to_string(),
        "--hide-scrollbars".to_string(),
        format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        ),
    ];

    if let Some(user_agent) = &config.user_agent {
        args.push(format!("--user-agent={user_agent}"));
    }

    args
}

pub fn create_browser_config(
    config: &Config,
) -> Result<chromiumoxide::browser::BrowserConfig, crate::CaptureError> {
    use chromiumoxide::browser::BrowserConfig;

    let mut builder = BrowserConfig::builder()
        .window_size(config.viewport.width, config.viewport.height)
        .args(get_chrome_args(config));

    if let Some(chrome_path) = &config.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder
        .build()
        .map_err(crate::CaptureError::BrowserLaunchFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.output_dir, PathBuf::from("site"));
        assert_eq!(config.scroll_budget, 15);
        assert_eq!(config.clip_height_cap, 4000);
        assert!(config.events_api_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_viewport_default() {
        let viewport = Viewport::default();
        assert_eq!(viewport.width, 1600);
        assert_eq!(viewport.height, 1600);
        assert_eq!(viewport.device_scale_factor, 1.0);
        assert!(!viewport.mobile);
    }

    #[test]
    fn test_timing_default() {
        let timing = Timing::default();
        assert_eq!(timing.navigate_settle, Duration::from_secs(6));
        assert_eq!(timing.locator_timeout, Duration::from_secs(3));
        assert_eq!(timing.scroll_pause, Duration::from_secs(1));
    }

    #[test]
    fn test_validate_rejects_zero_viewport() {
        let config = Config {
            viewport: Viewport {
                width: 0,
                ..Viewport::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_chrome_args_generation() {
        let config = Config::default();
        let args = get_chrome_args(&config);

        assert!(args.contains(&"--headless".to_string()));
        assert!(args.contains(&"--no-sandbox".to_string()));
        assert!(args.contains(&format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        )));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=")));
    }

    #[test]
    fn test_config_roundtrip_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.scroll_budget, config.scroll_budget);
        assert_eq!(back.timing.navigate_settle, config.timing.navigate_settle);
    }
}
