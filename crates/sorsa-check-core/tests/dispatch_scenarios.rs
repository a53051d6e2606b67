//! End-to-end dispatch scenarios against in-memory transport and metrics fakes.
//!
//! Verifies:
//! 1. A fresh link produces one status reply, one edit with the full report, and a cache entry.
//! 2. A repeat within the TTL is answered from cache with zero upstream calls.
//! 3. Reserved routes produce no reply and no job.
//! 4. Not-found is never cached.
//! 5. The open-job counter returns to its prior value in every terminal state.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sorsa_check_core::{
    AboutInfo, AccountInfo, BotError, BotResult, ChatTransport, DispatchSettings, Dispatcher,
    EditMessage, Fetch, FollowerStats, Handle, InboundMessage, JobOutcome, MetricsSource,
    OutgoingMessage, ScoreResult, SentMessage, TopFollower, Triage,
};

#[derive(Debug, Clone)]
enum Sent {
    Message(OutgoingMessage),
    Edit(EditMessage),
}

#[derive(Default)]
struct RecordingTransport {
    log: Mutex<Vec<Sent>>,
    next_id: AtomicI64,
    fail_sends: AtomicBool,
}

impl RecordingTransport {
    fn sent(&self) -> Vec<Sent> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_message(&self, message: OutgoingMessage) -> BotResult<SentMessage> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BotError::Telegram("sendMessage failed (403): bot was kicked".into()));
        }
        let chat_id = message.chat_id;
        self.log.lock().unwrap().push(Sent::Message(message));
        Ok(SentMessage {
            chat_id,
            message_id: 1000 + self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn edit_message(&self, edit: EditMessage) -> BotResult<()> {
        self.log.lock().unwrap().push(Sent::Edit(edit));
        Ok(())
    }
}

struct FakeTweetScout {
    account_exists: AtomicBool,
    /// Return an account payload with no fields at all.
    malformed_account: AtomicBool,
    calls: AtomicUsize,
}

impl FakeTweetScout {
    fn new(account_exists: bool) -> Self {
        Self {
            account_exists: AtomicBool::new(account_exists),
            malformed_account: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsSource for FakeTweetScout {
    async fn account_info(&self, _: &Handle) -> Fetch<AccountInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.account_exists.load(Ordering::SeqCst) {
            return Fetch::Absent;
        }
        if self.malformed_account.load(Ordering::SeqCst) {
            return Fetch::Found(AccountInfo::default());
        }
        Fetch::Found(AccountInfo {
            name: Some("Acme Inc".into()),
            screen_name: Some("acme".into()),
            description: Some("Anvils since 1949".into()),
            followers_count: Some(48_210),
            tweets_count: Some(3_112),
            register_date: Some("2012-04-17T09:30:00Z".into()),
        })
    }

    async fn score(&self, _: &Handle) -> Fetch<ScoreResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Fetch::Found(ScoreResult { score: 321.4 })
    }

    async fn follower_stats(&self, _: &Handle) -> Fetch<FollowerStats> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Fetch::Found(FollowerStats {
            influencers_count: Some(14),
            venture_capitals_count: Some(2),
            projects_count: Some(31),
        })
    }

    async fn about(&self, _: &Handle) -> Fetch<AboutInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Fetch::Found(AboutInfo {
            country: Some("Portugal".into()),
            username_change_count: Some(1),
            last_username_change_at: Some("2021-11-03T00:00:00Z".into()),
        })
    }

    async fn top_followers(&self, _: &Handle) -> Fetch<Vec<TopFollower>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Fetch::Found(vec![TopFollower {
            screen_name: "roadrunner".into(),
            score: Some(880.2),
        }])
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn setup(account_exists: bool, settings: DispatchSettings) -> (Arc<Dispatcher>, Arc<RecordingTransport>, Arc<FakeTweetScout>) {
    init_tracing();
    let transport = Arc::new(RecordingTransport::default());
    let source = Arc::new(FakeTweetScout::new(account_exists));
    let dispatcher = Arc::new(Dispatcher::new(transport.clone(), source.clone(), settings));
    (dispatcher, transport, source)
}

fn inbound(message_id: i64, text: &str) -> InboundMessage {
    InboundMessage {
        chat_id: 42,
        message_id,
        text: text.to_string(),
    }
}

fn handle(s: &str) -> Handle {
    Handle::parse(s).unwrap()
}

#[tokio::test]
async fn fresh_link_gets_status_then_full_report() {
    let (dispatcher, transport, source) = setup(true, DispatchSettings::default());

    let job = dispatcher
        .handle(inbound(7, "check https://x.com/Acme please"))
        .await
        .expect("job should be admitted");
    let outcome = job.await.unwrap();
    assert!(matches!(outcome, JobOutcome::Rendered(_)));
    assert_eq!(source.calls(), 5);

    let sent = transport.sent();
    assert_eq!(sent.len(), 2, "one status reply, one edit: {:?}", sent);
    let Sent::Message(status) = &sent[0] else { panic!("first action must be the status reply") };
    assert_eq!(status.text, "🔍 Gathering information for @acme...");
    assert_eq!(status.reply_to, Some(7));

    let Sent::Edit(edit) = &sent[1] else { panic!("second action must be the edit") };
    assert_eq!(edit.message_id, 1000);
    assert!(edit.html);
    assert!(edit.text.starts_with("<b>Acme Inc (<a href=\"https://x.com/acme\">@acme</a>)</b>"));
    assert!(edit.text.contains("• <b>Score:</b> 321\n"));
    assert!(edit.text.contains("• <b>Followers:</b> 48,210\n"));
    assert!(edit.text.contains("• <b>Registered:</b> Apr 2012\n"));
    assert!(edit.text.contains("• <b>KOLs:</b> 14\n"));
    assert!(edit.text.contains("• <b>Country:</b> Portugal 🇵🇹\n"));
    assert!(edit.text.contains("• <b>Last Change:</b> 03 Nov 2021\n"));
    assert!(edit.text.contains("1. <a href=\"https://x.com/roadrunner\">@roadrunner</a> (Score: 880)"));
    let button = edit.button.as_ref().expect("report carries the profile button");
    assert_eq!(button.url, "https://app.sorsa.io/profile/acme?utm_source=botchecker");

    let cached = dispatcher.cache().get(&handle("acme")).expect("report cached");
    assert_eq!(cached.text, edit.text);
    assert_eq!(dispatcher.admission().open_jobs(), 0);
}

#[tokio::test]
async fn repeat_within_ttl_is_served_from_cache() {
    let (dispatcher, transport, source) = setup(true, DispatchSettings::default());

    let first = dispatcher
        .handle(inbound(1, "check https://x.com/Acme please"))
        .await
        .unwrap();
    first.await.unwrap();
    assert_eq!(source.calls(), 5);

    let second = dispatcher
        .triage(&inbound(2, "check https://x.com/Acme please"))
        .await;
    assert!(matches!(second, Triage::ServedFromCache(ref h) if h.as_str() == "acme"));
    assert_eq!(source.calls(), 5, "cache hit must not touch the upstream");

    let sent = transport.sent();
    assert_eq!(sent.len(), 3);
    let Sent::Message(reply) = &sent[2] else { panic!("cached report is a fresh reply") };
    assert_eq!(reply.reply_to, Some(2));
    assert!(reply.html);
    assert!(reply.button.is_some());
    let Sent::Edit(original) = &sent[1] else { panic!() };
    assert_eq!(reply.text, original.text);
}

#[tokio::test]
async fn reserved_route_is_ignored() {
    let (dispatcher, transport, source) = setup(true, DispatchSettings::default());

    assert!(dispatcher.handle(inbound(1, "x.com/home")).await.is_none());
    assert!(matches!(dispatcher.triage(&inbound(2, "no links here")).await, Triage::Ignored));
    assert!(transport.sent().is_empty());
    assert_eq!(source.calls(), 0);
    assert_eq!(dispatcher.admission().open_jobs(), 0);
}

#[tokio::test]
async fn not_found_is_never_cached() {
    let (dispatcher, transport, source) = setup(false, DispatchSettings::default());

    for (i, expected_calls) in [(1, 5), (2, 10)] {
        let job = dispatcher.handle(inbound(i, "https://twitter.com/acme")).await.unwrap();
        assert_eq!(job.await.unwrap(), JobOutcome::NotFound);
        assert_eq!(source.calls(), expected_calls);
    }
    assert!(dispatcher.cache().is_empty());
    assert_eq!(dispatcher.admission().open_jobs(), 0);

    let edits: Vec<EditMessage> = transport
        .sent()
        .into_iter()
        .filter_map(|s| match s {
            Sent::Edit(e) => Some(e),
            Sent::Message(_) => None,
        })
        .collect();
    assert_eq!(edits.len(), 2);
    assert!(edits[0].text.starts_with("Could not find information for handle: @acme"));
    assert!(edits[0].button.is_none());
}

#[tokio::test]
async fn ceiling_rejects_without_side_effects() {
    let settings = DispatchSettings {
        max_concurrent_jobs: 1,
        ..DispatchSettings::default()
    };
    let (dispatcher, transport, source) = setup(true, settings);
    assert_eq!(dispatcher.admission().ceiling(), 1);

    let held = match dispatcher.triage(&inbound(1, "x.com/acme")).await {
        Triage::Admitted(job) => job,
        other => panic!("expected admission, got {:?}", other),
    };
    assert_eq!(dispatcher.admission().open_jobs(), 1);

    let rejected = dispatcher.triage(&inbound(2, "x.com/other_account")).await;
    assert!(matches!(rejected, Triage::Busy(_)));
    assert_eq!(dispatcher.admission().open_jobs(), 1);
    assert_eq!(source.calls(), 0);

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let Sent::Message(busy) = &sent[0] else { panic!() };
    assert!(busy.text.contains("busy"));
    assert_eq!(busy.reply_to, Some(2));

    dispatcher.run_job(held).await;
    assert_eq!(dispatcher.admission().open_jobs(), 0);
}

#[tokio::test]
async fn cache_hit_bypasses_full_ceiling() {
    let settings = DispatchSettings {
        max_concurrent_jobs: 1,
        ..DispatchSettings::default()
    };
    let (dispatcher, _transport, source) = setup(true, settings);

    let job = dispatcher.handle(inbound(1, "x.com/acme")).await.unwrap();
    job.await.unwrap();

    let _held = match dispatcher.triage(&inbound(2, "x.com/someone_else")).await {
        Triage::Admitted(job) => job,
        other => panic!("expected admission, got {:?}", other),
    };
    assert_eq!(dispatcher.admission().open_jobs(), 1);

    let hit = dispatcher.triage(&inbound(3, "x.com/ACME")).await;
    assert!(matches!(hit, Triage::ServedFromCache(_)));
    assert_eq!(dispatcher.admission().open_jobs(), 1);
    assert_eq!(source.calls(), 5);
}

#[tokio::test]
async fn status_delivery_failure_is_errored_and_released() {
    let (dispatcher, transport, source) = setup(true, DispatchSettings::default());
    transport.fail_sends.store(true, Ordering::SeqCst);

    let before = dispatcher.admission().open_jobs();
    let job = dispatcher.handle(inbound(1, "x.com/acme")).await.unwrap();
    assert_eq!(job.await.unwrap(), JobOutcome::Errored);
    assert_eq!(dispatcher.admission().open_jobs(), before);
    assert_eq!(source.calls(), 0, "no fetch before the status message is out");
    assert!(dispatcher.cache().is_empty());
}

#[tokio::test]
async fn malformed_account_edits_to_error_and_releases() {
    let (dispatcher, transport, source) = setup(true, DispatchSettings::default());
    source.malformed_account.store(true, Ordering::SeqCst);

    let job = dispatcher.handle(inbound(1, "x.com/acme")).await.unwrap();
    assert_eq!(job.await.unwrap(), JobOutcome::Errored);
    assert_eq!(source.calls(), 5);
    assert_eq!(dispatcher.admission().open_jobs(), 0);
    assert!(dispatcher.cache().is_empty());

    let sent = transport.sent();
    assert_eq!(sent.len(), 2);
    let Sent::Edit(edit) = &sent[1] else { panic!("status message must be edited") };
    assert_eq!(edit.message_id, 1000);
    assert!(edit.text.starts_with("Sorry, an error occurred while fetching account details for @acme."));
    assert!(edit.button.is_none());
}

#[tokio::test]
async fn counter_balances_across_concurrent_jobs() {
    let (dispatcher, _transport, _source) = setup(true, DispatchSettings::default());

    let mut jobs = Vec::new();
    for i in 0..20 {
        let text = format!("https://x.com/acct_{}", i);
        jobs.push(dispatcher.handle(inbound(i, &text)).await.unwrap());
    }
    for job in jobs {
        assert!(matches!(job.await.unwrap(), JobOutcome::Rendered(_)));
    }
    assert_eq!(dispatcher.admission().open_jobs(), 0);
    assert!(dispatcher.drain(Duration::from_millis(10)).await);
    assert_eq!(dispatcher.cache().len(), 20);
}

#[tokio::test]
async fn start_command_gets_welcome() {
    let (dispatcher, transport, source) = setup(true, DispatchSettings::default());
    assert!(matches!(dispatcher.triage(&inbound(1, "/start")).await, Triage::Welcomed));
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    let Sent::Message(welcome) = &sent[0] else { panic!() };
    assert!(welcome.text.starts_with("Welcome!"));
    assert!(welcome.html);
    assert_eq!(source.calls(), 0);
}
