//! Structured-events variant
//!
//! Instead of scraping a rendered third-party page, this variant fetches
//! event rows from a request/response API, lays them out as a self-authored
//! HTML table, and renders that document through the same full-page capture
//! path every scraped target uses. A failed fetch is terminal for this
//! variant only: the error lands in a sidecar record and sibling targets
//! are unaffected.

use crate::capture::{capture_region, CaptureResult};
use crate::config::Config;
use crate::driver::{Browsing, PageDriver};
use crate::output::{self, OutputName};
use crate::session::PageSession;
use crate::CaptureError;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

pub const EVENTS_TOKEN_ENV: &str = "CALSHOT_EVENTS_TOKEN";

pub const EVENTS_TARGET: &str = "events_api";

/// One event row as the API reports it. Fields beyond these are ignored;
/// nothing here is validated semantically.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRow {
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
    pub title: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub importance: Option<String>,
}

/// Credential from the environment, if any.
pub fn token_from_env() -> Option<String> {
    std::env::var(EVENTS_TOKEN_ENV).ok().filter(|v| !v.is_empty())
}

/// Fetch the event listing. Transport errors, non-success statuses, and
/// undecodable payloads all surface as [`CaptureError::DataFetch`].
pub async fn fetch_events(url: &str, token: Option<&str>) -> Result<Vec<EventRow>, CaptureError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(20))
        .build()?;

    let mut request = client.get(url);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    if !response.status().is_success() {
        return Err(CaptureError::DataFetch(format!(
            "endpoint returned {}",
            response.status()
        )));
    }

    let rows: Vec<EventRow> = response.json().await?;
    info!(rows = rows.len(), "event listing fetched");
    Ok(rows)
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Lay the rows out as a standalone HTML document.
pub fn build_events_html(rows: &[EventRow]) -> String {
    let mut body = String::new();
    for row in rows {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&row.date),
            escape_html(row.time.as_deref().unwrap_or("-")),
            escape_html(row.symbol.as_deref().unwrap_or("")),
            escape_html(&row.title),
            escape_html(row.importance.as_deref().unwrap_or("")),
        ));
    }
    if rows.is_empty() {
        body.push_str("<tr><td colspan=\"5\" class=\"empty\">No events reported</td></tr>\n");
    }

    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\n<style>\n\
         body {{ font-family: Arial, Helvetica, sans-serif; margin: 24px; background: #fff; }}\n\
         h1 {{ font-size: 20px; }}\n\
         table {{ border-collapse: collapse; width: 100%; }}\n\
         th, td {{ border: 1px solid #ccc; padding: 6px 10px; font-size: 14px; text-align: left; }}\n\
         th {{ background: #f0f0f0; }}\n\
         tr:nth-child(even) {{ background: #fafafa; }}\n\
         .empty {{ color: #888; text-align: center; }}\n\
         </style></head>\n<body>\n<h1>Upcoming events</h1>\n\
         <table>\n<tr><th>Date</th><th>Time</th><th>Symbol</th><th>Event</th><th>Importance</th></tr>\n\
         {body}</table>\n</body></html>\n"
    )
}

/// Run the variant end-to-end: fetch, render, capture. Skipped by the
/// runner when no endpoint is configured.
pub async fn capture_events<B: Browsing>(browser: &B, config: &Config) -> CaptureResult {
    let url = match &config.events_api_url {
        Some(url) => url,
        None => {
            return CaptureResult::failed(
                EVENTS_TARGET,
                CaptureError::ConfigurationError("events_api_url not configured".to_string()),
            )
        }
    };

    let token = token_from_env();
    let rows = match fetch_events(url, token.as_deref()).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(%err, "event fetch failed, recording sidecar");
            output::write_sidecar_error(&config.output_dir, EVENTS_TARGET, &err).await;
            return CaptureResult::failed(EVENTS_TARGET, err);
        }
    };

    let name = OutputName::dated("events", true);
    let dest = match output::prepare_dest(&name, &config.output_dir).await {
        Ok(dest) => dest,
        Err(err) => return CaptureResult::failed(EVENTS_TARGET, err),
    };

    let session = match PageSession::open(browser, "about:blank", &[], &config.timing).await {
        Ok(session) => session,
        Err(err) => return CaptureResult::failed(EVENTS_TARGET, err),
    };

    let html = build_events_html(&rows);
    let result = match session.page().set_content(&html).await {
        Ok(()) => {
            session
                .page()
                .pause(config.timing.post_action_pause)
                .await;
            // Empty candidate list: straight to the full-page rung.
            capture_region(
                session.page(),
                EVENTS_TARGET,
                &[],
                &config.timing,
                config.clip_height_cap,
                &dest,
            )
            .await
        }
        Err(err) => CaptureResult::failed(EVENTS_TARGET, err),
    };
    session.close().await;

    if result.success {
        output::refresh_latest(&name, &config.output_dir, &dest).await;
    }
    result
}
