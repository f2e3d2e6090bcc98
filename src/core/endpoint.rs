use crate::domain::model::{EndpointMap, Environment};
use crate::utils::error::{BuildError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Origin used when the app has no fixed backend.
pub const ANY_ORIGIN: &str = "*";

static ORIGIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:[A-Za-z][A-Za-z0-9+.\-]*:)?//[^/?#]+)").expect("origin pattern compiles")
});

/// Scheme, host and port of `url`, without path, query, fragment or
/// trailing slash. Strings that do not look like URLs are returned trimmed
/// of a trailing slash.
pub fn origin(url: &str) -> String {
    let url = url.trim();
    match ORIGIN_PATTERN.captures(url) {
        Some(caps) => caps[1].to_string(),
        None => url.trim_end_matches('/').to_string(),
    }
}

pub fn endpoint_for<'a>(env: Environment, endpoints: &'a EndpointMap) -> Result<&'a str> {
    endpoints
        .get(env.as_str())
        .map(String::as_str)
        .ok_or_else(|| BuildError::MissingConfigError {
            field: format!("endpoints.{}", env),
        })
}

/// `*` for local environments, otherwise the origin of the environment's
/// endpoint.
pub fn endpoint_origin(env: Environment, endpoints: &EndpointMap) -> Result<String> {
    if env.is_local() {
        return Ok(ANY_ORIGIN.to_string());
    }
    endpoint_for(env, endpoints).map(origin)
}
