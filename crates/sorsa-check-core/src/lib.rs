//! Sorsa Check core library.
//! Turns x.com / twitter.com links posted to the bot into TweetScout account reports.

pub mod admission;
pub mod aggregator;
pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod flags;
pub mod handle;
pub mod report;
pub mod telegram;
pub mod transport;
pub mod tweetscout;

pub use admission::{AdmissionController, JobPermit};
pub use aggregator::{Aggregation, ReportAggregator};
pub use cache::ReportCache;
pub use config::BotConfig;
pub use dispatcher::{AdmittedJob, DispatchSettings, Dispatcher, JobOutcome, Triage};
pub use error::{BotError, BotResult};
pub use handle::{extract_handle, Handle};
pub use report::{render_report, Report, ReportInput};
pub use telegram::{TelegramClient, Update};
pub use transport::{
    ChatTransport, EditMessage, InboundMessage, OutgoingMessage, SentMessage, UrlButton,
};
pub use tweetscout::{
    AboutInfo, AccountInfo, Fetch, FollowerStats, MetricsSource, ScoreResult, TopFollower, Tweet,
    TweetScoutClient,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
