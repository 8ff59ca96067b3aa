//! Email extraction from page text.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email regex")
});

/// Free consumer webmail providers — addresses on these domains are not
/// business-identifying and are discarded.
const FREE_MAIL_DOMAINS: [&str; 6] = [
    "example.com",
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "protonmail.com",
];

/// Extract business email addresses from visible page text.
///
/// Order-preserving dedup; free-webmail addresses are filtered out.
pub fn extract_emails(text: &str) -> Vec<String> {
    let mut unique = Vec::new();
    for found in EMAIL_RE.find_iter(text) {
        let email = found.as_str();
        let Some((_, domain_part)) = email.rsplit_once('@') else {
            continue;
        };
        if FREE_MAIL_DOMAINS.contains(&domain_part.to_ascii_lowercase().as_str()) {
            continue;
        }
        if !unique.iter().any(|e| e == email) {
            unique.push(email.to_string());
        }
    }
    unique
}
