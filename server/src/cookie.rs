//! Cookie-backed persistence handle.
//!
//! [`CookieBlob`] adapts a request's [`CookieJar`] to the store's
//! [`BlobHandle`]. Reads come from the `Cookie` header sent with the request;
//! writes are queued on the jar and emitted as `Set-Cookie` when the jar is
//! returned as part of the response.

use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Utc};
use time::OffsetDateTime;
use tracing::warn;

use crate::store::BlobHandle;

/// Name of the cookie holding the JSON-encoded todo collection.
pub const TODOS_COOKIE: &str = "todos";

/// Request-scoped [`BlobHandle`] over the `todos` cookie.
#[derive(Debug, Clone)]
pub struct CookieBlob {
    jar: CookieJar,
}

impl CookieBlob {
    /// Wraps the jar extracted from the incoming request.
    #[must_use]
    pub fn new(jar: CookieJar) -> Self {
        Self { jar }
    }

    /// Returns the jar, including any cookie written during the request.
    #[must_use]
    pub fn into_jar(self) -> CookieJar {
        self.jar
    }
}

impl BlobHandle for CookieBlob {
    fn read(&self) -> Option<String> {
        self.jar
            .get(TODOS_COOKIE)
            .map(|cookie| cookie.value().to_string())
    }

    fn write(&mut self, value: String, expires_at: DateTime<Utc>) {
        let mut cookie = Cookie::build((TODOS_COOKIE, value)).path("/");

        match OffsetDateTime::from_unix_timestamp(expires_at.timestamp()) {
            Ok(expires) => cookie = cookie.expires(expires),
            Err(err) => {
                warn!(error = %err, "Expiry out of range, writing session cookie");
            }
        }

        let jar = std::mem::replace(&mut self.jar, CookieJar::new());
        self.jar = jar.add(cookie);
    }
}
