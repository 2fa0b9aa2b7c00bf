use chrono::{DateTime, Utc};

/// Number of leading token characters kept when masking for logs
const TOKEN_MASK_PREFIX: usize = 10;

/// Mask a bearer token for logging: keep a short prefix, hide the rest
pub fn mask_token(token: &str) -> String {
    if token.chars().count() > TOKEN_MASK_PREFIX {
        let prefix: String = token.chars().take(TOKEN_MASK_PREFIX).collect();
        format!("{}...", prefix)
    } else {
        "***".to_string()
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a timestamp for table display
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: Option<&str>, default: &str) -> String {
    value.unwrap_or(default).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("eyJhbGciOiJIUzI1NiJ9.payload"), "eyJhbGciOi...");
        // Short tokens are hidden entirely
        assert_eq!(mask_token("abc123"), "***");
        assert_eq!(mask_token(""), "***");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 5, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2025-03-01 12:05");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some("x"), "-"), "x");
        assert_eq!(format_optional(None, "-"), "-");
    }
}
