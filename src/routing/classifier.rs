//! Client device classification.
//!
//! A client is mobile when its User-Agent contains one of a fixed list of
//! platform tokens anywhere in the string. Matching is case-sensitive.

/// Platform tokens checked in order; the first hit wins.
pub const MOBILE_TOKENS: [&str; 6] = [
    "Android",
    "iPhone",
    "SymbianOS",
    "Windows Phone",
    "iPad",
    "iPod",
];

/// Return the first mobile token found in `user_agent`, if any.
pub fn matched_token(user_agent: &str) -> Option<&'static str> {
    if user_agent.is_empty() {
        return None;
    }
    MOBILE_TOKENS
        .iter()
        .copied()
        .find(|token| user_agent.contains(token))
}

/// Whether `user_agent` identifies a mobile device.
pub fn is_mobile(user_agent: &str) -> bool {
    match matched_token(user_agent) {
        Some(token) => {
            tracing::trace!(token, "Mobile user agent");
            true
        }
        None => false,
    }
}
