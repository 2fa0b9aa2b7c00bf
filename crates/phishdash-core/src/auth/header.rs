use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue, AUTHORIZATION};

/// Build an `Authorization` value of the form `Bearer <token>`.
/// The value is marked sensitive so it is redacted from `Debug` output.
pub fn bearer_header(token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Token carried by a `Bearer` `Authorization` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Copy every header from `defaults` whose name is not already present in
/// `target`. Headers set by the caller always win.
pub fn merge_missing(target: &mut HeaderMap, defaults: &HeaderMap) {
    for (name, value) in defaults {
        if !target.contains_key(name) {
            target.insert(name.clone(), value.clone());
        }
    }
}
