//! Upstream endpoint derivation.

use crate::error::CoreError;

/// Fixed resource path of the upstream position stream.
pub const POSITION_STREAM_PATH: &str = "/ws/position";

/// Derive the streaming URL from a configured base endpoint.
///
/// `http://host:port` becomes `ws://host:port/ws/position`, `https` becomes
/// `wss`. A bare `host:port` is treated as `http`. Any path, query or
/// fragment on the base is replaced.
pub fn position_stream_url(base: &str) -> Result<String, CoreError> {
    let base = base.trim();
    let (scheme, rest) = match base.split_once("://") {
        Some((scheme, rest)) if is_scheme(scheme) => (scheme.to_ascii_lowercase(), rest),
        _ => ("http".to_string(), base),
    };

    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    if authority.is_empty() {
        return Err(CoreError::InvalidEndpoint(base.to_string()));
    }

    let ws_scheme = match scheme.as_str() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    Ok(format!("{ws_scheme}://{authority}{POSITION_STREAM_PATH}"))
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
