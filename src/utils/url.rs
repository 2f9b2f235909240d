//! Endpoint URL helpers.
//!
//! Base URLs come from flags, the environment and the config file, so they
//! arrive with or without trailing slashes. Everything that builds an
//! endpoint goes through here.

use std::fmt;

/// Strip trailing slashes from a base URL.
///
/// # Examples
///
/// ```
/// use varys::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000"), "http://localhost:8000");
/// assert_eq!(normalize_base_url("http://localhost:8000/"), "http://localhost:8000");
/// assert_eq!(normalize_base_url("http://varys.lan/api///"), "http://varys.lan/api");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path with exactly one slash between them.
///
/// # Examples
///
/// ```
/// use varys::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000", "chat"),
///     "http://localhost:8000/chat"
/// );
/// assert_eq!(
///     construct_api_url("http://localhost:8000/", "/health"),
///     "http://localhost:8000/health"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim().trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidBaseUrl {
    Malformed { input: String, reason: String },
    UnsupportedScheme { input: String, scheme: String },
}

impl fmt::Display for InvalidBaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidBaseUrl::Malformed { input, reason } => {
                write!(f, "'{input}' is not a valid URL: {reason}")
            }
            InvalidBaseUrl::UnsupportedScheme { input, scheme } => {
                write!(f, "'{input}' uses unsupported scheme '{scheme}' (expected http or https)")
            }
        }
    }
}

impl std::error::Error for InvalidBaseUrl {}

/// Check that `input` is an absolute http(s) URL and return it normalized.
pub fn validate_base_url(input: &str) -> Result<String, InvalidBaseUrl> {
    let normalized = normalize_base_url(input);
    let parsed = reqwest::Url::parse(&normalized).map_err(|err| InvalidBaseUrl::Malformed {
        input: input.to_string(),
        reason: err.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(normalized),
        other => Err(InvalidBaseUrl::UnsupportedScheme {
            input: input.to_string(),
            scheme: other.to_string(),
        }),
    }
}
