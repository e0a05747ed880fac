use subtle::ConstantTimeEq;

/// Header carrying the admin API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Constant-time string comparison for secrets
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Whether a request presenting `provided` may use an endpoint guarded by
/// `expected`. No configured key means the endpoint is open.
pub fn is_authorized(expected: Option<&str>, provided: Option<&str>) -> bool {
    match (expected, provided) {
        (None, _) => true,
        (Some(expected), Some(provided)) => constant_time_compare(expected, provided.trim()),
        (Some(_), None) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("secret123", "secret123"));
        assert!(!constant_time_compare("secret123", "secret124"));
        assert!(!constant_time_compare("secret123", "secret12"));
        assert!(!constant_time_compare("", "secret"));
    }

    #[test]
    fn test_is_authorized() {
        assert!(is_authorized(None, None));
        assert!(is_authorized(None, Some("anything")));
        assert!(is_authorized(Some("k3y"), Some("k3y")));
        assert!(is_authorized(Some("k3y"), Some(" k3y ")));
        assert!(!is_authorized(Some("k3y"), Some("key")));
        assert!(!is_authorized(Some("k3y"), None));
    }
}
