//! Token and script-path extraction from portal content

use regex::Regex;

const API_TOKEN_PATTERN: &str = r#"E="([A-Za-z0-9]{32})""#;
const APP_SCRIPT_PATTERN: &str = r#"(?:src|href)=["'](/js/app\.(?:[^"'\s]*\.)?js)["']"#;
const ANY_SCRIPT_PATTERN: &str = r#"(?:src|href)=["'](/js/[^"'\s]*\.js)["']"#;

/// First capture group of `pattern` in `text`
fn capture_first(pattern: &str, text: &str) -> Option<String> {
    Regex::new(pattern)
        .ok()?
        .captures(text)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

/// Extract the API token embedded as `E="<32 alphanumerics>"`.
///
/// Returns an empty string when no token is present.
pub fn extract_api_token(body: &str) -> String {
    capture_first(API_TOKEN_PATTERN, body).unwrap_or_default()
}

/// Find the bundled `/js/app.<hash>.js` script referenced by the splash page.
///
/// Falls back to the first `/js/*.js` reference; returns an empty string
/// when the page references no script under `/js/`.
pub fn extract_script_path(html: &str) -> String {
    capture_first(APP_SCRIPT_PATTERN, html)
        .or_else(|| capture_first(ANY_SCRIPT_PATTERN, html))
        .unwrap_or_default()
}
