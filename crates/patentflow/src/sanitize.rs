//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Provider URLs can carry credentials in userinfo or the query string;
//! these functions keep them out of spans and log lines.

/// Query parameters whose values are masked.
const SECRET_PARAMS: &[&str] = &["api_key", "apikey", "key", "token", "access_token"];

/// Strips userinfo and credential query parameters from a URL.
///
/// - `https://user:pw@host/path` → `https://****@host/path`
/// - `https://host/p?q=1&api_key=abc` → `https://host/p?q=1&api_key=****`
/// - `https://host/p` → `https://host/p` (no change)
pub fn redact_url(url: &str) -> String {
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (url, None),
    };

    let mut redacted = redact_userinfo(base);

    if let Some(query) = query {
        let params: Vec<String> = query
            .split('&')
            .map(|pair| match pair.split_once('=') {
                Some((name, _)) if is_secret_param(name) => format!("{}=****", name),
                _ => pair.to_string(),
            })
            .collect();
        redacted.push('?');
        redacted.push_str(&params.join("&"));
    }

    redacted
}

fn redact_userinfo(base: &str) -> String {
    if let Some(scheme_end) = base.find("://") {
        let after_scheme = &base[scheme_end + 3..];
        let authority_end = after_scheme.find('/').unwrap_or(after_scheme.len());
        if let Some(at_pos) = after_scheme[..authority_end].rfind('@') {
            let scheme = &base[..scheme_end + 3];
            let after_at = &after_scheme[at_pos + 1..];
            return format!("{}****@{}", scheme, after_at);
        }
    }
    base.to_string()
}

fn is_secret_param(name: &str) -> bool {
    SECRET_PARAMS
        .iter()
        .any(|secret| secret.eq_ignore_ascii_case(name))
}
