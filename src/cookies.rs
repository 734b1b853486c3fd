//! Cookie plumbing — header parsing, write options, and the document seam.
//!
//! SYSTEM CONTEXT
//! ==============
//! The store reads its token from a raw `Cookie` header (the live document's
//! or the inbound request's) and mirrors every token change back into the
//! document. `DocumentCookies` is the seam for "a cookie store this process
//! can write to"; it is absent when rendering on the server.

#[cfg(test)]
#[path = "cookies_test.rs"]
mod tests;

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use cookie::time::{Duration, OffsetDateTime};
use cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};

/// Name of the cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

const SECONDS_PER_DAY: i64 = 86_400;

// =============================================================================
// PARSING
// =============================================================================

/// Parse a raw `Cookie` header (`a=1; b=2`) into name/value pairs.
///
/// Values are percent-decoded and stripped of surrounding double quotes.
/// Malformed segments are skipped. When a name repeats, the first value wins.
#[must_use]
pub fn parse_cookie_header(header: &str) -> BTreeMap<String, String> {
    let mut pairs = BTreeMap::new();
    for cookie in Cookie::split_parse_encoded(header).flatten() {
        pairs
            .entry(cookie.name().to_owned())
            .or_insert_with(|| cookie.value_trimmed().to_owned());
    }
    pairs
}

// =============================================================================
// OPTIONS
// =============================================================================

/// `SameSite` attribute for the token cookie.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    Lax,
    None,
}

impl SameSitePolicy {
    /// Parse `strict`, `lax`, or `none` (case-insensitive).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    fn as_same_site(self) -> SameSite {
        match self {
            Self::Strict => SameSite::Strict,
            Self::Lax => SameSite::Lax,
            Self::None => SameSite::None,
        }
    }
}

/// Attributes applied whenever the token cookie is written or removed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieOptions {
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSitePolicy>,
    /// Lifetime in days. `None` makes a session cookie.
    pub expires_days: Option<i64>,
}

fn with_scope(name: String, value: String, options: &CookieOptions) -> cookie::CookieBuilder<'static> {
    let mut builder = Cookie::build((name, value))
        .secure(options.secure)
        .http_only(options.http_only);
    if let Some(path) = &options.path {
        builder = builder.path(path.clone());
    }
    if let Some(domain) = &options.domain {
        builder = builder.domain(domain.clone());
    }
    if let Some(same_site) = options.same_site {
        builder = builder.same_site(same_site.as_same_site());
    }
    builder
}

/// Build the cookie written for `name=value` under `options`.
///
/// Day counts too large to express in seconds saturate instead of
/// overflowing.
#[must_use]
pub fn write_cookie(name: &str, value: &str, options: &CookieOptions) -> Cookie<'static> {
    let mut builder = with_scope(name.to_owned(), value.to_owned(), options);
    if let Some(days) = options.expires_days {
        builder = builder.max_age(Duration::seconds(days.saturating_mul(SECONDS_PER_DAY)));
    }
    builder.build()
}

/// Build the cookie that deletes `name` under the same path and domain.
#[must_use]
pub fn removal_cookie(name: &str, options: &CookieOptions) -> Cookie<'static> {
    with_scope(name.to_owned(), String::new(), options)
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}

// =============================================================================
// DOCUMENT SEAM
// =============================================================================

/// A cookie store the current process can read and write directly, such as
/// a browser document.
pub trait DocumentCookies: Send + Sync {
    /// Current cookies rendered as a `Cookie` header value.
    fn cookie_header(&self) -> String;

    /// Write `name=value` with `options`.
    fn set(&self, name: &str, value: &str, options: &CookieOptions);

    /// Delete `name`, matching the scope given by `options`.
    fn remove(&self, name: &str, options: &CookieOptions);
}

/// In-process cookie jar standing in for a document.
///
/// Cookies are keyed by name only. Writing a cookie whose lifetime is not
/// positive deletes it, the way a browser treats an already-expired write.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    cookies: Mutex<BTreeMap<String, Cookie<'static>>>,
}

impl MemoryDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a jar from a saved `Cookie` header.
    #[must_use]
    pub fn from_cookie_header(header: &str) -> Self {
        let cookies = parse_cookie_header(header)
            .into_iter()
            .map(|(name, value)| (name.clone(), Cookie::new(name, value)))
            .collect();
        Self { cookies: Mutex::new(cookies) }
    }

    /// The stored cookie named `name`, attributes included.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Cookie<'static>> {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn store(&self, cookie: Cookie<'static>) {
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = cookie.max_age().is_some_and(|age| !age.is_positive());
        if expired {
            cookies.remove(cookie.name());
        } else {
            cookies.insert(cookie.name().to_owned(), cookie);
        }
    }
}

impl DocumentCookies for MemoryDocument {
    fn cookie_header(&self) -> String {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|cookie| cookie.encoded().stripped().to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) {
        self.store(write_cookie(name, value, options));
    }

    fn remove(&self, name: &str, options: &CookieOptions) {
        self.store(removal_cookie(name, options));
    }
}
