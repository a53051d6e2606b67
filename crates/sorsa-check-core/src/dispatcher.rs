//! Message dispatch: extraction -> cache -> admission -> aggregation -> delivery.
//!
//! The dispatcher owns the report cache and the admission counter, so every bot instance
//! (and every test) gets its own. Cache hits are answered inline and never take a job
//! slot. Admitted jobs run as detached tokio tasks; the caller keeps polling.
//!
//! Job lifecycle: `admitted -> fetching -> {not_found | rendered | errored} -> released`.
//! Release happens through [`JobPermit`]'s `Drop`, so it also covers panics.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::admission::{AdmissionController, JobPermit};
use crate::aggregator::{Aggregation, ReportAggregator};
use crate::cache::ReportCache;
use crate::config::BotConfig;
use crate::handle::{extract_handle, Handle};
use crate::report::{
    busy_message, error_message, not_found_message, status_message, welcome_message, Report,
    PROFILE_BUTTON_LABEL,
};
use crate::transport::{
    ChatTransport, EditMessage, InboundMessage, OutgoingMessage, SentMessage, UrlButton,
};
use crate::tweetscout::MetricsSource;

/// Limits the dispatcher enforces.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub max_concurrent_jobs: usize,
    pub cache_ttl: Duration,
    pub cache_sweep_threshold: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 100,
            cache_ttl: Duration::from_secs(180),
            cache_sweep_threshold: 200,
        }
    }
}

impl From<&BotConfig> for DispatchSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            max_concurrent_jobs: config.max_concurrent_jobs,
            cache_ttl: config.cache_ttl,
            cache_sweep_threshold: config.cache_sweep_threshold,
        }
    }
}

/// What happened to an inbound message before any job ran.
#[derive(Debug)]
pub enum Triage {
    /// No profile link (or a reserved route): nothing sent.
    Ignored,
    /// `/start` answered with the welcome text.
    Welcomed,
    /// Answered from cache without admission or upstream calls.
    ServedFromCache(Handle),
    /// Admission ceiling reached; busy reply sent.
    Busy(Handle),
    Admitted(AdmittedJob),
}

/// A job that holds an admission slot and has not started yet.
#[derive(Debug)]
pub struct AdmittedJob {
    pub handle: Handle,
    pub origin: InboundMessage,
    permit: JobPermit,
}

/// Terminal state of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    NotFound,
    Rendered(Report),
    Errored,
}

pub struct Dispatcher {
    transport: Arc<dyn ChatTransport>,
    aggregator: ReportAggregator,
    cache: ReportCache,
    admission: AdmissionController,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        source: Arc<dyn MetricsSource>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            transport,
            aggregator: ReportAggregator::new(source),
            cache: ReportCache::new(settings.cache_ttl, settings.cache_sweep_threshold),
            admission: AdmissionController::new(settings.max_concurrent_jobs),
        }
    }

    pub fn cache(&self) -> &ReportCache {
        &self.cache
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// Handle one inbound message. Returns the spawned job, if one was admitted.
    pub async fn handle(self: &Arc<Self>, message: InboundMessage) -> Option<JoinHandle<JobOutcome>> {
        match self.triage(&message).await {
            Triage::Admitted(job) => {
                let this = Arc::clone(self);
                Some(tokio::spawn(async move { this.run_job(job).await }))
            }
            Triage::Ignored | Triage::Welcomed | Triage::ServedFromCache(_) | Triage::Busy(_) => None,
        }
    }

    /// Everything that happens synchronously with the poll loop: extraction, cache,
    /// admission. Replies for cache hits and rejections are sent here.
    pub async fn triage(&self, message: &InboundMessage) -> Triage {
        if is_start_command(&message.text) {
            self.deliver(OutgoingMessage::reply(message, welcome_message()).html())
                .await;
            return Triage::Welcomed;
        }

        let Some(handle) = extract_handle(&message.text) else {
            return Triage::Ignored;
        };

        if let Some(report) = self.cache.get(&handle) {
            tracing::info!(handle = %handle, "[Bot] Serving cached report");
            self.deliver(
                OutgoingMessage::reply(message, report.text.clone())
                    .html()
                    .with_button(profile_button(&report)),
            )
            .await;
            return Triage::ServedFromCache(handle);
        }

        let Some(permit) = self.admission.try_admit() else {
            tracing::warn!(
                handle = %handle,
                open_jobs = self.admission.open_jobs(),
                ceiling = self.admission.ceiling(),
                "[Bot] Admission ceiling reached; rejecting"
            );
            self.deliver(OutgoingMessage::reply(message, busy_message()))
                .await;
            return Triage::Busy(handle);
        };

        tracing::info!(
            handle = %handle,
            open_jobs = self.admission.open_jobs(),
            "[Bot] Processing request"
        );
        Triage::Admitted(AdmittedJob {
            handle,
            origin: message.clone(),
            permit,
        })
    }

    /// Run an admitted job to its terminal state, release the slot, then sweep the cache.
    pub async fn run_job(&self, job: AdmittedJob) -> JobOutcome {
        let AdmittedJob {
            handle,
            origin,
            permit,
        } = job;
        let outcome = self.execute(&handle, &origin).await;
        drop(permit);
        let swept = self.cache.sweep();
        tracing::debug!(
            handle = %handle,
            outcome = outcome_label(&outcome),
            swept,
            open_jobs = self.admission.open_jobs(),
            "[Bot] Job released"
        );
        outcome
    }

    async fn execute(&self, handle: &Handle, origin: &InboundMessage) -> JobOutcome {
        let status = match self
            .transport
            .send_message(OutgoingMessage::reply(origin, status_message(handle)))
            .await
        {
            Ok(sent) => sent,
            Err(e) => {
                tracing::error!(handle = %handle, error = %e, "[Bot] Could not send status message");
                self.deliver(OutgoingMessage::reply(origin, error_message(handle)).html())
                    .await;
                return JobOutcome::Errored;
            }
        };

        match self.aggregator.aggregate(handle).await {
            Ok(Aggregation::NotFound) => {
                tracing::info!(handle = %handle, "[Bot] Account not found");
                self.edit(&status, EditMessage::html(status.chat_id, status.message_id, not_found_message(handle)))
                    .await;
                JobOutcome::NotFound
            }
            Ok(Aggregation::Rendered(report)) => {
                self.cache.insert(handle.clone(), report.clone());
                self.edit(
                    &status,
                    EditMessage::html(status.chat_id, status.message_id, report.text.clone())
                        .with_button(profile_button(&report)),
                )
                .await;
                tracing::info!(handle = %handle, "[Bot] Report delivered");
                JobOutcome::Rendered(report)
            }
            Err(e) => {
                tracing::error!(handle = %handle, error = %e, "[Bot] Error processing request");
                self.edit(&status, EditMessage::html(status.chat_id, status.message_id, error_message(handle)))
                    .await;
                JobOutcome::Errored
            }
        }
    }

    /// Best-effort send: failures are logged and dropped.
    async fn deliver(&self, message: OutgoingMessage) {
        let chat_id = message.chat_id;
        if let Err(e) = self.transport.send_message(message).await {
            tracing::warn!(chat_id, error = %e, "[Bot] Reply not delivered");
        }
    }

    /// Best-effort edit of the status message.
    async fn edit(&self, status: &SentMessage, edit: EditMessage) {
        if let Err(e) = self.transport.edit_message(edit).await {
            tracing::warn!(
                chat_id = status.chat_id,
                message_id = status.message_id,
                error = %e,
                "[Bot] Status message not updated"
            );
        }
    }

    /// Wait until no jobs are open or `timeout` passes. Returns true when idle.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.admission.open_jobs() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        true
    }
}

fn profile_button(report: &Report) -> UrlButton {
    UrlButton {
        label: PROFILE_BUTTON_LABEL.to_string(),
        url: report.profile_url.clone(),
    }
}

fn is_start_command(text: &str) -> bool {
    text.split_whitespace()
        .next()
        .map(|cmd| cmd == "/start" || cmd.starts_with("/start@"))
        .unwrap_or(false)
}

fn outcome_label(outcome: &JobOutcome) -> &'static str {
    match outcome {
        JobOutcome::NotFound => "not_found",
        JobOutcome::Rendered(_) => "rendered",
        JobOutcome::Errored => "errored",
    }
}
