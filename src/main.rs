use anyhow::Context;
use calshot::{
    builtin_targets, compose_summary, run_all, setup_logging, webhook_from_env, CdpBrowser, Cli,
    Config,
};
use clap::Parser;
use std::time::Instant;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    setup_logging(args.verbose)?;

    info!("Starting calshot v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args).await?;

    if args.list_targets {
        for spec in builtin_targets(&config) {
            println!("{}  {}", spec.name, spec.url);
        }
        return Ok(());
    }

    for spec in builtin_targets(&config) {
        calshot::validate_url(spec.url)
            .map_err(|e| calshot::CaptureError::InvalidUrl(format!("{}: {e}", spec.url)))
            .with_context(|| format!("target {}", spec.name))?;
    }

    let run_id = uuid::Uuid::new_v4().to_string();
    let started = Instant::now();
    info!(run_id = %run_id, "capture run starting");

    // The only fatal failure of a run: no browser, no captures.
    let browser = CdpBrowser::launch(&config)
        .await
        .context("failed to launch the shared browser")?;

    let results = run_all(&browser, &config).await;
    browser.shutdown().await;

    let succeeded = results.iter().filter(|r| r.success).count();
    for result in &results {
        match (&result.path, result.success) {
            (Some(path), true) => info!(target = %result.target, path = %path.display(), "ok"),
            _ => warn!(
                target = %result.target,
                error = %result.error.as_ref().map(|e| e.to_string()).unwrap_or_default(),
                "capture degraded or missing"
            ),
        }
    }
    info!(
        run_id = %run_id,
        succeeded,
        total = results.len(),
        elapsed = %calshot::format_duration(started.elapsed()),
        "capture run finished"
    );

    if let Some(webhook) = webhook_from_env() {
        let delivered = calshot::send_status(&webhook, compose_summary(&run_id, &results)).await;
        if !delivered {
            error!("status notification was not delivered");
        }
    }

    Ok(())
}

async fn load_config(args: &Cli) -> anyhow::Result<Config> {
    let mut config = if let Some(config_path) = &args.config {
        let config_content = tokio::fs::read_to_string(config_path)
            .await
            .with_context(|| format!("reading {}", config_path.display()))?;
        serde_json::from_str(&config_content).context("parsing configuration")?
    } else {
        Config::default()
    };

    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(chrome_path) = &args.chrome_path {
        config.chrome_path = Some(chrome_path.clone());
    }
    if !args.target.is_empty() {
        config.enabled_targets = Some(args.target.clone());
    }

    config.validate().context("invalid configuration")?;

    info!(output_dir = %config.output_dir.display(), "configuration loaded");

    Ok(config)
}
