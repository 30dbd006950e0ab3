//! Auth gate: password verification and the persisted `authenticated` cookie.
//!
//! A successful check stores `authenticated=true; expires=…; path=/` in a
//! [`CookieJar`], so later sessions skip the prompt until the cookie expires.
//! The jar is a plain text file with one cookie per line, using the same
//! attribute syntax (and the same `Thu, 01 Jan 2026 00:00:00 GMT` date
//! format) a browser's `document.cookie` assignment would.
//!
//! There is no client-side lockout: repeated wrong passwords are allowed.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::clients::RemoteApi;
use crate::error::RepdfError;

/// Name of the cookie flag set after a successful password check.
pub const AUTH_COOKIE: &str = "authenticated";

const COOKIE_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// One persisted cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub expires: DateTime<Utc>,
    pub path: String,
}

impl Cookie {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        lifetime_days: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            expires: now + chrono::Duration::days(i64::from(lifetime_days)),
            path: "/".into(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    /// `name=value; expires=<date>; path=/`
    pub fn to_line(&self) -> String {
        format!(
            "{}={}; expires={}; path={}",
            self.name,
            self.value,
            format_cookie_date(self.expires),
            self.path
        )
    }

    /// Parse a line written by [`Cookie::to_line`]. Returns `None` for
    /// malformed lines and for cookies without an expiry.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split(';').map(str::trim);
        let (name, value) = parts.next()?.split_once('=')?;

        let mut expires = None;
        let mut path = "/".to_string();
        for attr in parts {
            match attr.split_once('=') {
                Some((k, v)) if k.eq_ignore_ascii_case("expires") => {
                    expires = parse_cookie_date(v);
                }
                Some((k, v)) if k.eq_ignore_ascii_case("path") => path = v.to_string(),
                _ => {}
            }
        }

        Some(Self {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
            expires: expires?,
            path,
        })
    }
}

/// `Thu, 23 Oct 2026 08:00:00 GMT`
pub fn format_cookie_date(dt: DateTime<Utc>) -> String {
    dt.format(COOKIE_DATE_FORMAT).to_string()
}

fn parse_cookie_date(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s.trim(), COOKIE_DATE_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Cookie storage, file-backed or in-memory.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    path: Option<PathBuf>,
    cookies: Vec<Cookie>,
}

impl CookieJar {
    /// A jar that forgets everything when dropped.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// `~/.config/repdf/cookies` (platform config dir).
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(std::env::temp_dir)
            .join("repdf")
            .join("cookies")
    }

    /// Load a jar from `path`. A missing file yields an empty jar; malformed
    /// lines are skipped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepdfError> {
        let path = path.as_ref().to_path_buf();
        let cookies = match std::fs::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .filter(|l| !l.trim().is_empty())
                .filter_map(|l| {
                    let parsed = Cookie::parse(l);
                    if parsed.is_none() {
                        warn!("Skipping malformed cookie line in {}", path.display());
                    }
                    parsed
                })
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(RepdfError::CookieStore { path, source }),
        };
        debug!("Loaded {} cookie(s) from {}", cookies.len(), path.display());
        Ok(Self {
            path: Some(path),
            cookies,
        })
    }

    /// Value of an unexpired cookie.
    pub fn get(&self, name: &str, now: DateTime<Utc>) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name && !c.is_expired(now))
            .map(|c| c.value.as_str())
    }

    /// Insert or replace a cookie by name, then persist.
    pub fn set(&mut self, cookie: Cookie) -> Result<(), RepdfError> {
        self.cookies.retain(|c| c.name != cookie.name);
        self.cookies.push(cookie);
        self.persist()
    }

    /// Write to `{path}.tmp` and rename, so a crash never leaves a
    /// half-written jar.
    fn persist(&self) -> Result<(), RepdfError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let store_err = |source| RepdfError::CookieStore {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(store_err)?;
        }
        let mut content: String = self
            .cookies
            .iter()
            .map(Cookie::to_line)
            .collect::<Vec<_>>()
            .join("\n");
        content.push('\n');

        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, content).map_err(store_err)?;
        std::fs::rename(&tmp, path).map_err(store_err)
    }
}

/// Whether the jar holds an unexpired `authenticated=true` cookie.
pub fn restore(jar: &CookieJar, now: DateTime<Utc>) -> bool {
    jar.get(AUTH_COOKIE, now) == Some("true")
}

/// Check `password` against the server and, on success, persist the cookie.
///
/// A cookie that cannot be written is logged and does not fail the sign-in.
///
/// * empty password → [`RepdfError::EmptyPassword`], no request sent
/// * rejected       → [`RepdfError::WrongPassword`]
/// * unreachable    → [`RepdfError::AuthUnreachable`]
pub async fn verify(
    api: &dyn RemoteApi,
    jar: &mut CookieJar,
    password: &str,
    lifetime_days: u32,
) -> Result<(), RepdfError> {
    if password.is_empty() {
        return Err(RepdfError::EmptyPassword);
    }

    if !api.verify_password(password).await? {
        info!("Password rejected");
        return Err(RepdfError::WrongPassword);
    }

    match jar.set(Cookie::new(AUTH_COOKIE, "true", lifetime_days, Utc::now())) {
        Ok(()) => info!("Authenticated; cookie valid for {} days", lifetime_days),
        Err(e) => warn!("Authenticated, but the login will not be remembered: {}", e),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn cookie_line_uses_utc_string_format() {
        let c = Cookie::new(AUTH_COOKIE, "true", 7, at("2026-10-16T08:30:00Z"));
        assert_eq!(
            c.to_line(),
            "authenticated=true; expires=Fri, 23 Oct 2026 08:30:00 GMT; path=/"
        );
    }

    #[test]
    fn cookie_line_parses_back() {
        let line = "authenticated=true; expires=Fri, 23 Oct 2026 08:30:00 GMT; path=/";
        let c = Cookie::parse(line).unwrap();
        assert_eq!(c.name, "authenticated");
        assert_eq!(c.value, "true");
        assert_eq!(c.expires, at("2026-10-23T08:30:00Z"));
        assert!(Cookie::parse("garbage").is_none());
        assert!(Cookie::parse("a=b; path=/").is_none());
    }

    #[test]
    fn expired_cookie_is_ignored() {
        let mut jar = CookieJar::in_memory();
        jar.set(Cookie::new(AUTH_COOKIE, "true", 7, at("2026-01-01T00:00:00Z")))
            .unwrap();
        assert!(restore(&jar, at("2026-01-07T23:59:59Z")));
        assert!(!restore(&jar, at("2026-01-08T00:00:00Z")));
    }

    #[test]
    fn file_jar_persists_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cookies");
        let now = at("2026-03-01T00:00:00Z");

        let mut jar = CookieJar::open(&path).unwrap();
        jar.set(Cookie::new(AUTH_COOKIE, "false", 7, now)).unwrap();
        jar.set(Cookie::new(AUTH_COOKIE, "true", 7, now)).unwrap();

        let reloaded = CookieJar::open(&path).unwrap();
        assert!(restore(&reloaded, now));
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn missing_jar_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let jar = CookieJar::open(dir.path().join("none")).unwrap();
        assert!(!restore(&jar, Utc::now()));
    }
}
