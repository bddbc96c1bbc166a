//! Outbound text formatting: HTML escaping and mention encoding.
//!
//! Humans (and plugins) write `@alice` and `#general`; Slack expects
//! `<@U123>` and `<#C456>`. Escaping runs first so that angle brackets typed
//! by a user can never be read as Slack's own mention syntax, and so that
//! the brackets introduced by the rewrite are never escaped.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::cache::EntityCache;

/// Mentions that notify a whole audience rather than one user.
const BROADCASTS: [&str; 4] = ["channel", "everyone", "group", "here"];

/// A sigil followed by one or more non-whitespace, non-colon characters.
static MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([@#])([^\s:]+)").expect("mention pattern is valid"));

/// Escape the three characters Slack treats as control syntax.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Encode `text` for the wire.
///
/// Unresolvable mentions pass through unchanged.
pub fn encode(text: &str, cache: &EntityCache) -> String {
    let escaped = escape(text);
    MENTION
        .replace_all(&escaped, |caps: &Captures<'_>| {
            let (sigil, token) = (&caps[1], &caps[2]);
            resolve(sigil, token, cache).unwrap_or_else(|| caps[0].to_owned())
        })
        .into_owned()
}

fn resolve(sigil: &str, token: &str, cache: &EntityCache) -> Option<String> {
    match sigil {
        "@" if BROADCASTS.contains(&token) => Some(format!("<!{token}>")),
        "@" => cache.user_by_name(token).map(|u| format!("<@{}>", u.id)),
        "#" => cache.channel_by_name(token).map(|c| format!("<#{}>", c.id)),
        _ => None,
    }
}
