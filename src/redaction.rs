use once_cell::sync::Lazy;
use regex::Regex;

static DISCORD_WEBHOOK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)(https?://[^/\s]+/api/webhooks/[0-9]+/)[A-Za-z0-9_\-\.]+(.*)$").expect("valid regex")
});

static GENERIC_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+\.\-]*://[^/\s?#]+)(.*)$").expect("valid regex"));

pub fn mask_webhook_url(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }

    if let Some(caps) = DISCORD_WEBHOOK.captures(url) {
        let suffix = if caps[2].is_empty() { "" } else { "…" };
        return format!("{}[REDACTED]{}", &caps[1], suffix);
    }

    match GENERIC_URL.captures(url) {
        Some(caps) if caps[2].is_empty() => caps[1].to_string(),
        Some(caps) => format!("{}/[REDACTED]", &caps[1]),
        None => "[REDACTED]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::mask_webhook_url;

    #[test]
    fn masks_discord_token_but_keeps_webhook_id() {
        assert_eq!(
            mask_webhook_url("https://discord.com/api/webhooks/123456/abcDEF-123_xyz"),
            "https://discord.com/api/webhooks/123456/[REDACTED]"
        );
    }

    #[test]
    fn masks_path_of_other_urls() {
        assert_eq!(
            mask_webhook_url("https://hooks.example.net/services/T000/B000/secret"),
            "https://hooks.example.net/[REDACTED]"
        );
        assert_eq!(mask_webhook_url("https://example.net"), "https://example.net");
    }

    #[test]
    fn masks_non_urls_entirely_and_keeps_empty() {
        assert_eq!(mask_webhook_url("not a url at all"), "[REDACTED]");
        assert_eq!(mask_webhook_url(""), "");
    }
}
