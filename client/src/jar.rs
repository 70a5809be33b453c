//! Persistent client-side cookie jar.
//!
//! Plays the part of a browser's cookie storage: it keeps the server's
//! `todos` cookie between runs and hosts the `tomatoDate`/`tomatoCount`
//! pair written by the harvest counter. Cookies are kept as name → value
//! plus an optional expiry, saved as JSON in a single file.
//!
//! Domain and path scoping are not modelled; one jar talks to one server.
//!
//! # File format
//!
//! ```json
//! {
//!   "tomatoCount": { "value": "3", "expires": "2024-01-11T08:00:00Z" },
//!   "todos": { "value": "[...]", "expires": "2024-01-17T08:00:00Z" }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use cookie::Cookie;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Errors raised while persisting the jar.
#[derive(Error, Debug)]
pub enum JarError {
    /// Reading or writing the jar file failed.
    #[error("cookie jar I/O error: {0}")]
    Io(#[from] io::Error),

    /// The jar could not be serialized.
    #[error("cookie jar JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single stored cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub value: String,
    /// `None` for a session cookie, which is kept until removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

impl StoredCookie {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }
}

/// File-backed cookie storage shared by the HTTP client and the harvest
/// counter.
#[derive(Debug)]
pub struct CookieJar {
    path: Option<PathBuf>,
    cookies: RwLock<BTreeMap<String, StoredCookie>>,
    /// Held for the whole of a save, so snapshots reach the file in order.
    save_lock: Mutex<()>,
}

impl CookieJar {
    /// Opens the jar at `path`.
    ///
    /// A missing file gives an empty jar. So does a file that is not valid
    /// JSON, after a warning; it is overwritten on the next save.
    ///
    /// # Errors
    ///
    /// Returns [`JarError::Io`] if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, JarError> {
        let path = path.into();

        let cookies = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(cookies) => cookies,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Ignoring corrupt cookie jar");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        debug!(path = %path.display(), count = cookies.len(), "Cookie jar opened");

        Ok(Self {
            path: Some(path),
            cookies: RwLock::new(cookies),
            save_lock: Mutex::new(()),
        })
    }

    /// A jar that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            cookies: RwLock::new(BTreeMap::new()),
            save_lock: Mutex::new(()),
        }
    }

    /// Location of the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the value of `name` unless it is missing or expired.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let now = Utc::now();
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .filter(|c| !c.is_expired(now))
            .map(|c| c.value.clone())
    }

    /// Stores `name` with an expiry `ttl` from now and saves the jar.
    ///
    /// # Errors
    ///
    /// Returns an error if the jar file cannot be written.
    pub fn set(&self, name: &str, value: impl Into<String>, ttl: Duration) -> Result<(), JarError> {
        self.insert(name, value, Some(Utc::now() + ttl))
    }

    /// Stores `name` with an explicit expiry and saves the jar.
    ///
    /// # Errors
    ///
    /// Returns an error if the jar file cannot be written.
    pub fn insert(
        &self,
        name: &str,
        value: impl Into<String>,
        expires: Option<DateTime<Utc>>,
    ) -> Result<(), JarError> {
        self.store(name, value.into(), expires);
        self.save()
    }

    /// Removes `name` and saves the jar.
    ///
    /// # Errors
    ///
    /// Returns an error if the jar file cannot be written.
    pub fn remove(&self, name: &str) -> Result<(), JarError> {
        self.cookies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        self.save()
    }

    /// Writes live cookies to the backing file, dropping expired ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its directory cannot be written.
    pub fn save(&self) -> Result<(), JarError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let _saving = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Utc::now();
        let json = {
            let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
            cookies.retain(|_, c| !c.is_expired(now));
            serde_json::to_string_pretty(&*cookies)?
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(path).map_err(|err| err.error)?;

        trace!(path = %path.display(), "Cookie jar saved");
        Ok(())
    }

    fn store(&self, name: &str, value: String, expires: Option<DateTime<Utc>>) {
        let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);

        if expires.is_some_and(|at| at <= Utc::now()) {
            cookies.remove(name);
        } else {
            cookies.insert(name.to_string(), StoredCookie { value, expires });
        }
    }

    /// Applies one `Set-Cookie` header value.
    fn apply_set_cookie(&self, header: &str) {
        let cookie = match Cookie::parse_encoded(header) {
            Ok(cookie) => cookie,
            Err(err) => {
                warn!(error = %err, "Ignoring unparseable Set-Cookie header");
                return;
            }
        };

        let now = Utc::now();
        let expires = match (cookie.max_age(), cookie.expires_datetime()) {
            (Some(max_age), _) => Some(now + Duration::seconds(max_age.whole_seconds())),
            (None, Some(at)) => DateTime::from_timestamp(at.unix_timestamp(), 0),
            (None, None) => None,
        };

        debug!(name = cookie.name(), expires = ?expires, "Storing cookie from server");
        self.store(cookie.name(), cookie.value().to_string(), expires);
    }

    /// Builds the `Cookie` request header from live cookies.
    fn header_value(&self) -> Option<HeaderValue> {
        let now = Utc::now();
        let cookies = self.cookies.read().unwrap_or_else(PoisonError::into_inner);

        let header = cookies
            .iter()
            .filter(|(_, c)| !c.is_expired(now))
            .map(|(name, c)| Cookie::new(name.as_str(), c.value.as_str()).encoded().to_string())
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, _url: &reqwest::Url) {
        let mut changed = false;
        for header in cookie_headers {
            match header.to_str() {
                Ok(header) => {
                    self.apply_set_cookie(header);
                    changed = true;
                }
                Err(_) => warn!("Ignoring non-ASCII Set-Cookie header"),
            }
        }

        if changed {
            if let Err(err) = self.save() {
                warn!(error = %err, "Failed to persist cookies from server");
            }
        }
    }

    fn cookies(&self, _url: &reqwest::Url) -> Option<HeaderValue> {
        self.header_value()
    }
}
