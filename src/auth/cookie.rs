//! Netscape cookie-file loading for session authentication.
//!
//! The file format is the one written by curl and browser exporters: one
//! cookie per line, seven tab-separated columns
//! (domain, include-subdomains, path, secure, expires, name, value).

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::Url;
use reqwest::cookie::Jar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ClientError;
use crate::runtime::{Runtime, escapes_via_parent_dir, is_path_under, normalize_path};

/// Domain prefix marking an HTTP-only cookie.
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Extensions accepted for cookie files (plus no extension at all).
const ALLOWED_EXTENSIONS: [&str; 3] = ["txt", "cookies", "cookie"];

/// A cookie read from a cookie file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    /// Expiry as seconds since the Unix epoch, 0 for a session cookie
    pub expires: i64,
    pub name: String,
    pub value: String,
    pub http_only: bool,
}

impl Cookie {
    fn host(&self) -> &str {
        self.domain.trim_start_matches('.')
    }

    /// URL the cookie is attributed to when inserted into the store.
    pub fn origin_url(&self) -> Result<Url> {
        let scheme = if self.secure { "https" } else { "http" };
        let path = if self.path.starts_with('/') {
            self.path.as_str()
        } else {
            "/"
        };
        Url::parse(&format!("{}://{}{}", scheme, self.host(), path))
            .with_context(|| format!("Invalid cookie domain {:?}", self.domain))
    }

    /// Renders the cookie as a `Set-Cookie` header value.
    pub fn to_set_cookie(&self, now: i64) -> String {
        let mut header = format!("{}={}; Path={}", self.name, self.value, self.path);
        if self.include_subdomains {
            header.push_str(&format!("; Domain={}", self.host()));
        }
        if self.expires > 0 {
            header.push_str(&format!("; Max-Age={}", (self.expires - now).max(0)));
        }
        if self.secure {
            header.push_str("; Secure");
        }
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        header
    }
}

/// Parses cookie-file content, dropping cookies that expired before `now`.
///
/// Comments, blank lines, lines with fewer than seven fields and lines whose
/// expiry is not a number are skipped.
pub fn parse_cookies(content: &str, now: i64) -> Vec<Cookie> {
    let mut cookies = Vec::new();

    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let (line, http_only) = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => (rest, true),
            None if line.starts_with('#') => continue,
            None => (line, false),
        };

        let fields: Vec<&str> = line.splitn(7, '\t').collect();
        if fields.len() < 7 {
            continue;
        }

        let Ok(expires) = fields[4].trim().parse::<i64>() else {
            debug!("Skipping cookie line {}: invalid expiry {:?}", index + 1, fields[4]);
            continue;
        };

        if expires != 0 && expires < now {
            debug!("Dropping expired cookie {:?}", fields[5]);
            continue;
        }

        let domain = fields[0].trim().to_string();
        cookies.push(Cookie {
            include_subdomains: fields[1].trim().eq_ignore_ascii_case("TRUE")
                || domain.starts_with('.'),
            domain,
            path: fields[2].trim().to_string(),
            secure: fields[3].trim().eq_ignore_ascii_case("TRUE"),
            expires,
            name: fields[5].to_string(),
            value: fields[6].to_string(),
            http_only,
        });
    }

    cookies
}

/// Checks a cookie-file path before anything touches the filesystem.
///
/// Rejects empty paths, paths that still contain `..` after cleaning,
/// unexpected extensions, and absolute paths outside the temp directory, the
/// working directory and the home directory. Returns the cleaned path.
pub fn validate_cookie_path<R: Runtime + ?Sized>(runtime: &R, path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(ClientError::Config("cookie file path is empty".to_string()).into());
    }

    if escapes_via_parent_dir(path) {
        return Err(ClientError::Config(format!(
            "cookie file path {:?} contains a path traversal segment",
            path
        ))
        .into());
    }

    let cleaned = normalize_path(path);

    if let Some(ext) = cleaned.extension() {
        let ext = ext.to_string_lossy().to_lowercase();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ClientError::Config(format!(
                "cookie file {:?} has unsupported extension .{} (expected .txt, .cookies or .cookie)",
                path, ext
            ))
            .into());
        }
    }

    if cleaned.is_absolute() {
        let mut allowed = vec![runtime.temp_dir()];
        if let Ok(cwd) = runtime.current_dir() {
            allowed.push(cwd);
        }
        if let Some(home) = runtime.home_dir() {
            allowed.push(home);
        }

        if !allowed.iter().any(|dir| is_path_under(&cleaned, dir)) {
            return Err(ClientError::Config(format!(
                "cookie file {:?} must be inside the temp, working or home directory",
                path
            ))
            .into());
        }
    }

    Ok(cleaned)
}

/// Validates, reads and parses a cookie file.
#[tracing::instrument(skip(runtime))]
pub fn load_cookie_file<R: Runtime + ?Sized>(runtime: &R, path: &Path) -> Result<Vec<Cookie>> {
    let cleaned = validate_cookie_path(runtime, path)?;

    let content = runtime
        .read_to_string(&cleaned)
        .map_err(|e| ClientError::Config(format!("failed to read cookie file {:?}: {:#}", path, e)))?;

    let cookies = parse_cookies(&content, unix_now());
    debug!("Loaded {} cookie(s) from {:?}", cookies.len(), cleaned);
    Ok(cookies)
}

/// Builds a cookie store holding `cookies`.
pub fn cookie_jar(cookies: &[Cookie]) -> Arc<Jar> {
    let jar = Jar::default();
    let now = unix_now();

    for cookie in cookies {
        match cookie.origin_url() {
            Ok(url) => jar.add_cookie_str(&cookie.to_set_cookie(now), &url),
            Err(e) => warn!("Ignoring cookie {:?}: {:#}", cookie.name, e),
        }
    }

    Arc::new(jar)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::client_error;
    use crate::runtime::MockRuntime;
    use reqwest::cookie::CookieStore;

    const NOW: i64 = 1_700_000_000;

    fn config_message(err: &anyhow::Error) -> String {
        match client_error(err) {
            Some(ClientError::Config(msg)) => msg.clone(),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    /// Runtime that knows only the well-known directories; reading a file panics.
    fn runtime_with_dirs(temp: &Path, cwd: &Path, home: &Path) -> MockRuntime {
        let mut runtime = MockRuntime::new();
        let (temp, cwd, home) = (temp.to_path_buf(), cwd.to_path_buf(), home.to_path_buf());
        runtime.expect_temp_dir().returning(move || temp.clone());
        runtime
            .expect_current_dir()
            .returning(move || Ok(cwd.clone()));
        runtime.expect_home_dir().returning(move || Some(home.clone()));
        runtime.expect_read_to_string().never();
        runtime
    }

    #[test]
    fn test_parse_cookies_basic_line() {
        let content = "# Netscape HTTP Cookie File\n\
                       n8n.example.com\tFALSE\t/\tTRUE\t0\tn8n-auth\ttoken123\n";

        let cookies = parse_cookies(content, NOW);

        assert_eq!(
            cookies,
            vec![Cookie {
                domain: "n8n.example.com".to_string(),
                include_subdomains: false,
                path: "/".to_string(),
                secure: true,
                expires: 0,
                name: "n8n-auth".to_string(),
                value: "token123".to_string(),
                http_only: false,
            }]
        );
    }

    #[test]
    fn test_parse_cookies_http_only_prefix() {
        let content = "#HttpOnly_.example.com\tTRUE\t/\tFALSE\t0\tsid\tabc\n";

        let cookies = parse_cookies(content, NOW);

        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].http_only);
        assert!(cookies[0].include_subdomains);
        assert_eq!(cookies[0].domain, ".example.com");
    }

    #[test]
    fn test_parse_cookies_skips_comments_blank_and_short_lines() {
        let content = "# comment\n\
                       \n\
                       example.com\tFALSE\t/\tFALSE\t0\tshort\n\
                       example.com\tFALSE\t/\tFALSE\tnever\tbad\texpiry\n\
                       example.com\tFALSE\t/\tFALSE\t0\tok\tvalue\r\n";

        let cookies = parse_cookies(content, NOW);

        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "ok");
        assert_eq!(cookies[0].value, "value");
    }

    #[test]
    fn test_parse_cookies_drops_expired() {
        let content = format!(
            "example.com\tFALSE\t/\tFALSE\t{}\texpired\tx\n\
             example.com\tFALSE\t/\tFALSE\t{}\tfuture\ty\n\
             example.com\tFALSE\t/\tFALSE\t0\tpermanent\tz\n",
            NOW - 1,
            NOW + 3600
        );

        let names: Vec<_> = parse_cookies(&content, NOW)
            .into_iter()
            .map(|c| c.name)
            .collect();

        assert_eq!(names, vec!["future", "permanent"]);
    }

    #[test]
    fn test_to_set_cookie() {
        let cookie = Cookie {
            domain: ".example.com".to_string(),
            include_subdomains: true,
            path: "/rest".to_string(),
            secure: true,
            expires: NOW + 60,
            name: "sid".to_string(),
            value: "abc".to_string(),
            http_only: true,
        };

        assert_eq!(
            cookie.to_set_cookie(NOW),
            "sid=abc; Path=/rest; Domain=example.com; Max-Age=60; Secure; HttpOnly"
        );
        assert_eq!(
            cookie.origin_url().unwrap().as_str(),
            "https://example.com/rest"
        );
    }

    #[test]
    fn test_load_cookie_file_keeps_only_live_cookies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.txt");
        std::fs::write(
            &path,
            "# Netscape HTTP Cookie File\n\
             127.0.0.1\tFALSE\t/\tFALSE\t1000\texpired\told\n\
             127.0.0.1\tFALSE\t/\tFALSE\t0\tpermanent\tfresh\n",
        )
        .unwrap();

        let mut runtime = MockRuntime::new();
        let temp = dir.path().to_path_buf();
        runtime.expect_temp_dir().returning(move || temp.clone());
        runtime
            .expect_current_dir()
            .returning(|| Ok(PathBuf::from("/nonexistent/cwd")));
        runtime.expect_home_dir().returning(|| None);
        runtime
            .expect_read_to_string()
            .returning(|p| Ok(std::fs::read_to_string(p)?));

        let cookies = load_cookie_file(&runtime, &path).unwrap();
        assert_eq!(cookies.len(), 1);

        let jar = cookie_jar(&cookies);
        let header = jar
            .cookies(&Url::parse("http://127.0.0.1/api/v1/workflows").unwrap())
            .unwrap();
        assert_eq!(header.to_str().unwrap(), "permanent=fresh");
    }

    #[test]
    fn test_validate_rejects_path_traversal_without_opening() {
        let runtime = runtime_with_dirs(
            Path::new("/tmp"),
            Path::new("/work"),
            Path::new("/home/user"),
        );

        let err = load_cookie_file(&runtime, Path::new("../secrets/cookies.txt")).unwrap_err();

        assert!(config_message(&err).contains("path traversal"));
    }

    #[test]
    fn test_validate_rejects_empty_path() {
        let runtime = MockRuntime::new();

        let err = validate_cookie_path(&runtime, Path::new("")).unwrap_err();

        assert!(config_message(&err).contains("empty"));
    }

    #[test]
    fn test_validate_rejects_unknown_extension() {
        let runtime = runtime_with_dirs(
            Path::new("/tmp"),
            Path::new("/work"),
            Path::new("/home/user"),
        );

        let err = validate_cookie_path(&runtime, Path::new("session.json")).unwrap_err();

        assert!(config_message(&err).contains("unsupported extension"));
    }

    #[test]
    fn test_validate_accepts_allowed_extensions() {
        let runtime = MockRuntime::new();

        for name in ["cookies.txt", "jar.cookies", "n8n.cookie", "cookiejar", "A.TXT"] {
            assert_eq!(
                validate_cookie_path(&runtime, Path::new(name)).unwrap(),
                PathBuf::from(name)
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_absolute_path_must_be_in_allowed_dir() {
        let runtime = runtime_with_dirs(
            Path::new("/tmp"),
            Path::new("/work"),
            Path::new("/home/user"),
        );

        for ok in [
            "/tmp/cookies.txt",
            "/work/auth/cookies.txt",
            "/home/user/.n8n/cookies",
        ] {
            assert!(validate_cookie_path(&runtime, Path::new(ok)).is_ok(), "{}", ok);
        }

        let err = validate_cookie_path(&runtime, Path::new("/etc/cookies.txt")).unwrap_err();
        assert!(config_message(&err).contains("must be inside"));

        // Cleans to /etc/cookies.txt
        let err = validate_cookie_path(&runtime, Path::new("/tmp/../etc/cookies.txt")).unwrap_err();
        assert!(config_message(&err).contains("must be inside"));
    }

    #[test]
    fn test_load_cookie_file_read_failure_is_config_error() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .returning(|_| Err(anyhow::anyhow!("No such file or directory")));

        let err = load_cookie_file(&runtime, Path::new("missing.txt")).unwrap_err();

        assert!(config_message(&err).contains("failed to read cookie file"));
    }
}
