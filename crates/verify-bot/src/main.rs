//! Phone verification bot - Main entry point.

use anyhow::Context;
use notify_client::{Notifier, WebhookNotifier};
use phone_verifier::{parse_phone_list, HttpVerifier};
use proxy_pool::ProxyPool;
use session_store::SessionRegistry;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use verify_bot::config::Config;
use verify_bot::{
    AppResult, BatchDispatcher, DispatchError, OutputQueue, ResultExporter, RetryingChecker,
    RunContext,
};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.bot.log_level);

    info!("Starting phone verification bot...");

    // Proxy pool
    let proxy_text = tokio::fs::read_to_string(&config.proxy.file)
        .await
        .with_context(|| format!("Failed to read proxy file {}", config.proxy.file.display()))?;
    let (pool, load) = ProxyPool::from_lines(&proxy_text, config.proxy.uses_per_proxy);
    if !load.rejected.is_empty() {
        warn!("Skipped {} malformed proxy lines", load.rejected.len());
    }
    if pool.is_empty().await {
        error!("No usable proxies in {}", config.proxy.file.display());
        return Err(DispatchError::PoolEmpty.into());
    }
    info!(
        "Loaded {} proxies ({} uses each before rotating)",
        load.loaded(),
        config.proxy.uses_per_proxy
    );

    // Phone numbers
    let phone_text = tokio::fs::read_to_string(&config.bot.phones_file)
        .await
        .with_context(|| format!("Failed to read phone file {}", config.bot.phones_file.display()))?;
    let phones = parse_phone_list(&phone_text);
    if phones.is_empty() {
        warn!("No valid phone numbers in {}", config.bot.phones_file.display());
        return Ok(());
    }
    info!("Loaded {} unique phone numbers", phones.len());

    // Initialize clients
    let verifier = Arc::new(
        HttpVerifier::new(config.verifier.settings()).context("Failed to create verifier")?,
    );

    let webhook = WebhookNotifier::new(&config.notifier.url, config.notifier.timeout)
        .context("Failed to create notifier")?;
    if webhook.health_check().await {
        info!("Notifier healthy at {}", config.notifier.url);
    } else {
        warn!("Notifier health check failed - deliveries may be lost");
    }
    let notifier: Arc<dyn Notifier> = Arc::new(webhook);

    let sessions = SessionRegistry::new();
    let (output, queue) = OutputQueue::spawn(notifier.clone(), config.output.spacing);

    let checker = RetryingChecker::new(
        pool.clone(),
        verifier,
        sessions.clone(),
        output,
        config.dispatch.max_retries,
    );
    let dispatcher = BatchDispatcher::new(
        checker,
        sessions,
        pool,
        notifier.clone(),
        config.dispatch.settings(),
    );

    let ctx = RunContext::new(
        config.notifier.destination.clone(),
        config.notifier.destination.clone(),
    );

    // Stop on Ctrl+C; in-flight requests are allowed to finish
    let stop = ctx.stop.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Stop signal received, finishing in-flight checks");
            stop.raise();
        }
    });

    let report = dispatcher.run(&ctx, phones).await?;

    let exporter = ResultExporter::new(config.output.export_settings());
    match exporter.export(&report).await {
        Ok(export) => {
            let delivered = exporter
                .deliver(notifier.as_ref(), &ctx.destination, &export)
                .await;
            info!("Delivered {}/{} result files", delivered, export.files.len());
        }
        Err(e) => error!("Failed to export results: {}", e),
    }

    // Dropping the dispatcher releases the last output sender
    drop(dispatcher);
    let sent = queue.shutdown().await;

    info!("Shutting down ({} notifications sent)", sent);
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
