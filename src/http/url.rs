//! Base URL normalization and request path resolution.

use anyhow::Result;
use reqwest::Url;

use crate::error::ClientError;

/// Path prefix every REST endpoint lives under.
pub const API_PREFIX: &str = "api/v1/";

/// Parses `raw` and makes its path end with `/api/v1/`.
///
/// Idempotent: a URL that already ends with the prefix is returned unchanged.
pub fn normalize_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ClientError::Config("base URL is required".to_string()).into());
    }

    let mut url = Url::parse(raw)
        .map_err(|e| ClientError::Config(format!("invalid base URL {:?}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::Config(format!("base URL {:?} cannot be used as a base", raw)).into());
    }

    let mut path = url.path().to_string();
    if !path.ends_with('/') {
        path.push('/');
    }
    if !path.ends_with(&format!("/{}", API_PREFIX)) {
        path.push_str(API_PREFIX);
    }
    url.set_path(&path);

    Ok(url)
}

/// Resolves `path` against the normalized base URL.
///
/// The part before the first `?` is appended to the base path and
/// percent-encoded where needed; the rest is kept verbatim as the query
/// string. The result always stays on the base host under the API prefix,
/// even when `path` looks like an absolute URL. A leading `/` is ignored so
/// that both `workflows` and `/workflows` land under the prefix.
pub fn resolve(base: &Url, path: &str) -> Result<Url> {
    let relative = path.trim_start_matches('/');
    let (relative, query) = match relative.split_once('?') {
        Some((relative, query)) => (relative, Some(query)),
        None => (relative, None),
    };

    let mut url = base.clone();
    url.set_path(&format!("{}{}", base.path(), relative));
    url.set_query(query);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::client_error;

    #[test]
    fn test_normalize_appends_prefix() {
        let url = normalize_base_url("https://n8n.example.com").unwrap();
        assert_eq!(url.as_str(), "https://n8n.example.com/api/v1/");
    }

    #[test]
    fn test_normalize_adds_trailing_slash() {
        let url = normalize_base_url("https://n8n.example.com/api/v1").unwrap();
        assert_eq!(url.as_str(), "https://n8n.example.com/api/v1/");
    }

    #[test]
    fn test_normalize_keeps_sub_path() {
        let url = normalize_base_url("http://localhost:5678/automation/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5678/automation/api/v1/");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in [
            "https://n8n.example.com",
            "https://n8n.example.com/",
            "https://n8n.example.com/api/v1",
            "http://localhost:5678/automation",
        ] {
            let once = normalize_base_url(raw).unwrap();
            let twice = normalize_base_url(once.as_str()).unwrap();
            assert_eq!(once, twice, "normalization of {} is not idempotent", raw);
        }
    }

    #[test]
    fn test_normalize_rejects_empty() {
        let err = normalize_base_url("   ").unwrap_err();
        assert!(matches!(client_error(&err), Some(ClientError::Config(_))));
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        let err = normalize_base_url("not a url").unwrap_err();
        assert!(matches!(client_error(&err), Some(ClientError::Config(_))));

        let err = normalize_base_url("mailto:ops@example.com").unwrap_err();
        assert!(matches!(client_error(&err), Some(ClientError::Config(_))));
    }

    #[test]
    fn test_resolve_plain_path() {
        let base = normalize_base_url("https://n8n.example.com").unwrap();
        let url = resolve(&base, "workflows/42").unwrap();
        assert_eq!(url.as_str(), "https://n8n.example.com/api/v1/workflows/42");
    }

    #[test]
    fn test_resolve_leading_slash_stays_under_prefix() {
        let base = normalize_base_url("https://n8n.example.com").unwrap();
        let url = resolve(&base, "/workflows").unwrap();
        assert_eq!(url.as_str(), "https://n8n.example.com/api/v1/workflows");
    }

    #[test]
    fn test_resolve_with_query_preserves_parameters() {
        let base = normalize_base_url("https://n8n.example.com").unwrap();
        let plain = resolve(&base, "workflows").unwrap();
        let with_query = resolve(&base, "workflows?active=true&limit=10").unwrap();

        assert_eq!(with_query.host_str(), plain.host_str());
        assert_eq!(with_query.path(), plain.path());
        assert_eq!(with_query.query(), Some("active=true&limit=10"));
    }

    #[test]
    fn test_resolve_plain_path_is_encoded_not_split() {
        let base = normalize_base_url("https://n8n.example.com").unwrap();
        let url = resolve(&base, "tags/my tag#1").unwrap();
        assert_eq!(url.path(), "/api/v1/tags/my%20tag%231");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_resolve_absolute_url_with_query_stays_on_base_host() {
        let base = normalize_base_url("https://n8n.example.com").unwrap();

        for path in [
            "https://evil.example/steal?x=1",
            "//evil.example/steal?x=1",
            "evil:steal?x=1",
        ] {
            let url = resolve(&base, path).unwrap();
            assert_eq!(url.scheme(), "https", "{}", path);
            assert_eq!(url.host_str(), Some("n8n.example.com"), "{}", path);
            assert!(url.path().starts_with("/api/v1/"), "{}", path);
            assert_eq!(url.query(), Some("x=1"), "{}", path);
        }
    }

    #[test]
    fn test_resolve_query_and_plain_branches_share_path() {
        let base = normalize_base_url("https://n8n.example.com").unwrap();
        let plain = resolve(&base, "https://evil.example/steal").unwrap();
        let with_query = resolve(&base, "https://evil.example/steal?x=1").unwrap();

        assert_eq!(with_query.path(), plain.path());
        assert_eq!(with_query.host_str(), plain.host_str());
    }
}
