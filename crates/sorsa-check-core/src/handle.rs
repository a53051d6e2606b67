//! Account handle extraction from free-form chat text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Matches x.com / twitter.com profile links, with or without scheme and `www.`.
static PROFILE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?(?:x\.com|twitter\.com)/([a-z0-9_]+)")
        .expect("profile link pattern is valid")
});

/// Platform routes that look like handles but are not accounts.
const RESERVED_PATHS: &[&str] = &[
    "home",
    "explore",
    "notifications",
    "messages",
    "search",
    "settings",
    "i",
];

/// Lower-cased account handle, `[a-z0-9_]+`, never a reserved route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(String);

impl Handle {
    /// Validate and normalize a bare handle (no URL). Returns `None` for empty input,
    /// non-word characters or reserved routes.
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.trim().trim_start_matches('@').to_ascii_lowercase();
        if !is_handle_text(&lower) {
            return None;
        }
        if RESERVED_PATHS.contains(&lower.as_str()) {
            return None;
        }
        Some(Self(lower))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Handle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// True when `s` is a non-empty run of ASCII letters, digits and `_`, case preserved.
/// Screen names coming back from the metrics API are checked with this before they go
/// into report markup.
pub fn is_handle_text(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Extract the handle from the first profile link in `text`.
///
/// Only the first link counts: if it points at a reserved route the message is ignored
/// even when a later link would be valid.
pub fn extract_handle(text: &str) -> Option<Handle> {
    let caps = PROFILE_LINK.captures(text)?;
    Handle::parse(caps.get(1)?.as_str())
}
