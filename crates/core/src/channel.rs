use url::Url;

/// Extracts a channel name from a Telegram-style URL: the first path
/// segment after trimming slashes. `https://t.me/<name>/<post_id>` and
/// `https://t.me/<name>` both yield `<name>`.
pub fn extract_channel_name(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let first = parsed.path().trim_matches('/').split('/').next()?;
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}
