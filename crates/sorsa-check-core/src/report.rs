//! Report rendering (Telegram HTML) and the bot's fixed reply texts.
//!
//! Rendering is deterministic: the same fetched metrics always yield the same text. Every
//! optional metric that did not arrive is shown as [`UNKNOWN`].

use chrono::{DateTime, Utc};

use crate::error::{BotError, BotResult};
use crate::flags::flag_for;
use crate::handle::{is_handle_text, Handle};
use crate::tweetscout::{
    parse_timestamp, AboutInfo, AccountInfo, Fetch, FollowerStats, ScoreResult, TopFollower,
};

/// Placeholder for a metric the upstream did not deliver.
pub const UNKNOWN: &str = "N/A";

/// Label of the inline URL button attached to every report.
pub const PROFILE_BUTTON_LABEL: &str = "View Sorsa Profile";

const TOP_FOLLOWERS_SHOWN: usize = 3;

const FOOTER_LINKS: &str = concat!(
    r#"<a href="https://sorsa.io/api-about?utm_source=botchecker">API</a> | "#,
    r#"<a href="https://x.com/SorsaApp">X</a> | "#,
    r#"<a href="https://sorsa.io/?utm_source=botchecker">Web</a>"#
);

/// A rendered report: HTML body plus the profile link for the inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub text: String,
    pub profile_url: String,
}

impl Report {
    pub fn new(text: String, profile_url: String) -> Self {
        Self { text, profile_url }
    }
}

/// Everything the five metric reads returned for one handle.
#[derive(Debug, Clone)]
pub struct ReportInput {
    pub info: AccountInfo,
    pub score: Fetch<ScoreResult>,
    pub follower_stats: Fetch<FollowerStats>,
    pub about: Fetch<AboutInfo>,
    pub top_followers: Fetch<Vec<TopFollower>>,
}

pub fn profile_url(handle: &Handle) -> String {
    format!(
        "https://app.sorsa.io/profile/{}?utm_source=botchecker",
        handle
    )
}

/// Compose the full report.
///
/// Fails when the account payload has no `screen_name`, or one that is not a plain handle,
/// since it becomes the header link target.
pub fn render_report(handle: &Handle, input: &ReportInput) -> BotResult<Report> {
    let info = &input.info;
    let screen_name = info
        .screen_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| BotError::Render(format!("account payload for @{} has no screen_name", handle)))?;
    if !is_handle_text(screen_name) {
        return Err(BotError::Render(format!(
            "account payload for @{} has a malformed screen_name",
            handle
        )));
    }
    let name = info
        .name
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(screen_name);
    let description = info
        .description
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(html_escape)
        .unwrap_or_else(|| "No description".to_string());

    let score = match &input.score {
        Fetch::Found(s) => format!("{}", s.score.round() as i64),
        Fetch::Absent | Fetch::Failed(_) => UNKNOWN.to_string(),
    };
    let followers = group_thousands(info.followers_count.unwrap_or(0));
    let tweets = group_thousands(info.tweets_count.unwrap_or(0));
    let registered = format_date(info.register_date.as_deref(), "%b %Y");

    let (kols, vcs, projects) = match &input.follower_stats {
        Fetch::Found(stats) => (
            group_thousands(stats.influencers_count.unwrap_or(0)),
            group_thousands(stats.venture_capitals_count.unwrap_or(0)),
            group_thousands(stats.projects_count.unwrap_or(0)),
        ),
        Fetch::Absent | Fetch::Failed(_) => (
            UNKNOWN.to_string(),
            UNKNOWN.to_string(),
            UNKNOWN.to_string(),
        ),
    };

    let (country, name_changes, last_change) = match &input.about {
        Fetch::Found(about) => (
            country_display(about.country.as_deref()),
            about.username_change_count.unwrap_or(0).to_string(),
            format_date(about.last_username_change_at.as_deref(), "%d %b %Y"),
        ),
        Fetch::Absent | Fetch::Failed(_) => (
            UNKNOWN.to_string(),
            UNKNOWN.to_string(),
            UNKNOWN.to_string(),
        ),
    };

    let mut message = format!(
        "<b>{} (<a href=\"https://x.com/{sn}\">@{sn}</a>)</b>\n\n",
        html_escape(name),
        sn = screen_name
    );
    message.push_str(&format!("📝 <b>Description:</b> {}\n\n", description));

    message.push_str("📊 <b>Main Stats:</b>\n");
    message.push_str(&format!("• <b>Score:</b> {}\n", score));
    message.push_str(&format!("• <b>Followers:</b> {}\n", followers));
    message.push_str(&format!("• <b>Tweets:</b> {}\n", tweets));
    message.push_str(&format!("• <b>Registered:</b> {}\n\n", registered));

    message.push_str("👥 <b>Followers Stats:</b>\n");
    message.push_str(&format!("• <b>KOLs:</b> {}\n", kols));
    message.push_str(&format!("• <b>VCs:</b> {}\n", vcs));
    message.push_str(&format!("• <b>Projects:</b> {}\n\n", projects));

    message.push_str("ℹ️ <b>Additional Info:</b>\n");
    message.push_str(&format!("• <b>Country:</b> {}\n", country));
    message.push_str(&format!("• <b>Username Changes:</b> {}\n", name_changes));
    message.push_str(&format!("• <b>Last Change:</b> {}\n\n", last_change));

    if let Fetch::Found(top) = &input.top_followers {
        let shown: Vec<&TopFollower> = top
            .iter()
            .filter(|f| is_handle_text(f.screen_name.trim()))
            .take(TOP_FOLLOWERS_SHOWN)
            .collect();
        if !shown.is_empty() {
            message.push_str("🔝 <b>Top Followers:</b>\n");
            for (idx, f) in shown.iter().enumerate() {
                message.push_str(&format!(
                    "{}. <a href=\"https://x.com/{h}\">@{h}</a> (Score: {})\n",
                    idx + 1,
                    f.score.unwrap_or(0.0).round() as i64,
                    h = f.screen_name.trim()
                ));
            }
            message.push('\n');
        }
    }

    message.push_str("🔗");
    message.push_str(FOOTER_LINKS);

    Ok(Report::new(message, profile_url(handle)))
}

pub fn status_message(handle: &Handle) -> String {
    format!("🔍 Gathering information for @{}...", handle)
}

pub fn busy_message() -> String {
    "⚠️ The bot is currently busy processing too many requests. Please try again in a few seconds."
        .to_string()
}

pub fn not_found_message(handle: &Handle) -> String {
    format!(
        "Could not find information for handle: @{}\n\n🔗 {}",
        handle, FOOTER_LINKS
    )
}

pub fn error_message(handle: &Handle) -> String {
    format!(
        "Sorry, an error occurred while fetching account details for @{}.\n\n____________________________\n🔗 {}",
        handle, FOOTER_LINKS
    )
}

/// Reply to `/start`.
pub fn welcome_message() -> String {
    format!(
        "Welcome! Just send me a Twitter or X.com link and I will gather all the stats for you 🔍\n\n\
         <b>How to add the bot to a group:</b>\n\n\
         • Open this bot’s profile.\n\
         • Tap \"Add to Group\".\n\
         • Choose the group you want.\n\n\
         🔗 {}",
        FOOTER_LINKS
    )
}

fn country_display(country: Option<&str>) -> String {
    match country.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => match flag_for(c) {
            Some(flag) => format!("{} {}", html_escape(c), flag),
            None => html_escape(c),
        },
        None => UNKNOWN.to_string(),
    }
}

fn format_date(raw: Option<&str>, fmt: &str) -> String {
    raw.and_then(parse_timestamp)
        .map(|dt: DateTime<Utc>| dt.format(fmt).to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// `1234567` -> `"1,234,567"`.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
