/// Credential extraction from request headers
use axum::http::HeaderMap;

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Extract a web token from `Authorization: Token <key>` or `Bearer <key>`
pub fn extract_web_token(headers: &HeaderMap) -> Option<String> {
    authorization(headers).and_then(|s| {
        s.strip_prefix("Token ")
            .or_else(|| s.strip_prefix("Bearer "))
            .map(|key| key.trim().to_string())
    })
}

/// Extract a mobile app token
///
/// The app sends the bare token as the whole header value; a `Bearer` or
/// `Token` prefix is tolerated.
pub fn extract_app_token(headers: &HeaderMap) -> Option<String> {
    authorization(headers).map(|s| {
        s.strip_prefix("Token ")
            .or_else(|| s.strip_prefix("Bearer "))
            .unwrap_or(s)
            .trim()
            .to_string()
    })
}
