//! Report aggregation: fan out the five metric reads, then render.

use std::sync::Arc;

use crate::error::BotResult;
use crate::handle::Handle;
use crate::report::{render_report, Report, ReportInput};
use crate::tweetscout::{Fetch, MetricsSource};

/// Result of a finished aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregation {
    /// The account lookup itself came back empty.
    NotFound,
    Rendered(Report),
}

/// Fetches all metrics for a handle concurrently and renders whatever arrived.
#[derive(Clone)]
pub struct ReportAggregator {
    source: Arc<dyn MetricsSource>,
}

impl ReportAggregator {
    pub fn new(source: Arc<dyn MetricsSource>) -> Self {
        Self { source }
    }

    /// Run the five reads concurrently and wait for all of them. Each read already
    /// resolves to a [`Fetch`], so one slow or failing endpoint never cancels the others.
    pub async fn fetch(&self, handle: &Handle) -> Option<ReportInput> {
        let (info, score, follower_stats, about, top_followers) = tokio::join!(
            self.source.account_info(handle),
            self.source.score(handle),
            self.source.follower_stats(handle),
            self.source.about(handle),
            self.source.top_followers(handle),
        );

        let info = match info {
            Fetch::Found(info) => info,
            Fetch::Absent | Fetch::Failed(_) => return None,
        };
        tracing::debug!(
            handle = %handle,
            score = score.is_found(),
            follower_stats = follower_stats.is_found(),
            about = about.is_found(),
            top_followers = top_followers.is_found(),
            "[Aggregator] Metrics settled"
        );
        Some(ReportInput {
            info,
            score,
            follower_stats,
            about,
            top_followers,
        })
    }

    /// Fetch and render. Only a render failure is an error; missing metrics are not.
    pub async fn aggregate(&self, handle: &Handle) -> BotResult<Aggregation> {
        match self.fetch(handle).await {
            None => Ok(Aggregation::NotFound),
            Some(input) => render_report(handle, &input).map(Aggregation::Rendered),
        }
    }
}
