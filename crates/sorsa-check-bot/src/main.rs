//! Sorsa Check bot.
//!
//! Long-polls Telegram for messages, hands every text to the dispatcher, and shuts down
//! on SIGINT/SIGTERM after giving in-flight jobs a moment to finish.

use std::sync::Arc;
use std::time::Duration;

use sorsa_check_core::{
    BotConfig, DispatchSettings, Dispatcher, TelegramClient, TweetScoutClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long shutdown waits for open jobs.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after a failed poll before trying again; doubles up to the max.
const POLL_BACKOFF_START: Duration = Duration::from_secs(1);
const POLL_BACKOFF_MAX: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[sorsa-check] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match BotConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "[SYSTEM] Invalid configuration; exiting");
            std::process::exit(1);
        }
    };

    let telegram = match TelegramClient::from_config(&config) {
        Ok(t) => Arc::new(t),
        Err(e) => {
            tracing::error!(error = %e, "[SYSTEM] Could not build Telegram client");
            std::process::exit(1);
        }
    };
    let tweetscout = match TweetScoutClient::from_config(&config) {
        Ok(t) => Arc::new(t),
        Err(e) => {
            tracing::error!(error = %e, "[SYSTEM] Could not build TweetScout client");
            std::process::exit(1);
        }
    };

    match telegram.get_me().await {
        Ok(me) => tracing::info!(
            bot_id = me.id,
            username = me.username.as_deref().unwrap_or("?"),
            "[SYSTEM] Connected to Telegram"
        ),
        Err(e) => {
            tracing::error!(error = %e, "[SYSTEM] getMe failed; check BOTKEY");
            std::process::exit(1);
        }
    }

    let dispatcher = Arc::new(Dispatcher::new(
        telegram.clone(),
        tweetscout,
        DispatchSettings::from(&config),
    ));

    tracing::info!(
        version = sorsa_check_core::version(),
        max_concurrent_jobs = dispatcher.admission().ceiling(),
        cache_ttl_secs = dispatcher.cache().ttl().as_secs(),
        poll_timeout_secs = telegram.poll_timeout().as_secs(),
        "[SYSTEM] Sorsa Check bot started"
    );

    let mut next_offset: Option<i64> = None;
    let mut backoff = POLL_BACKOFF_START;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            polled = telegram.get_updates(next_offset) => match polled {
                Ok(updates) => {
                    backoff = POLL_BACKOFF_START;
                    for update in updates {
                        next_offset = Some(update.update_id + 1);
                        if let Some(message) = update.into_inbound() {
                            // Admitted jobs run detached; the join handle is not needed here.
                            let _ = dispatcher.handle(message).await;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        retry_in_secs = backoff.as_secs(),
                        "[SYSTEM] getUpdates failed"
                    );
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(POLL_BACKOFF_MAX);
                }
            },
        }
    }

    tracing::info!("[SYSTEM] Shutdown signal received; draining jobs");
    if !dispatcher.drain(DRAIN_TIMEOUT).await {
        tracing::warn!(
            open_jobs = dispatcher.admission().open_jobs(),
            "[SYSTEM] Shutting down with jobs still open"
        );
    }

    if let Some(offset) = next_offset {
        match telegram.confirm_offset(offset).await {
            Ok(()) => tracing::info!(offset, "[SYSTEM] Update offset confirmed"),
            Err(e) => tracing::warn!(error = %e, offset, "[SYSTEM] Could not confirm update offset"),
        }
    }
    tracing::info!("[SYSTEM] Sorsa Check bot stopped");
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "[SYSTEM] Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "[SYSTEM] SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
