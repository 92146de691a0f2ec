//! Browser storage slots backed by cookies.
//!
//! The nonce slot is a browser-session cookie (no `Max-Age`), so it dies with
//! the browser session. Issued tokens live in durable cookies bounded by the
//! configured TTL. All cookies are `HttpOnly` and `SameSite=Lax`; `Lax` is
//! required so the nonce survives the top-level redirect back from the
//! identity provider.

use crate::idp::TokenSet;
use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue, SET_COOKIE},
};
use thiserror::Error;

pub(crate) const OAUTH_STATE_COOKIE: &str = "authgate_oauth_state";
pub(crate) const ACCESS_TOKEN_COOKIE: &str = "authgate_access_token";
pub(crate) const ID_TOKEN_COOKIE: &str = "authgate_id_token";

/// Browsers silently drop cookies larger than this (name, value and attributes).
pub(crate) const MAX_COOKIE_BYTES: usize = 4096;

#[derive(Debug, Error)]
pub enum CookieError {
    #[error("cookie {name} is {size} bytes, browsers keep at most {MAX_COOKIE_BYTES}")]
    TooLarge { name: String, size: usize },
    #[error("invalid cookie value: {0}")]
    InvalidValue(#[from] InvalidHeaderValue),
}

/// Cookie attributes shared by every handler that writes browser storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    secure: bool,
    token_ttl_seconds: i64,
}

impl CookiePolicy {
    #[must_use]
    pub const fn new(secure: bool, token_ttl_seconds: i64) -> Self {
        Self {
            secure,
            token_ttl_seconds,
        }
    }

    #[must_use]
    pub const fn secure(&self) -> bool {
        self.secure
    }

    #[must_use]
    pub const fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    /// Browser-session cookie: no `Max-Age`, overwritten on every write.
    pub(crate) fn session(&self, name: &str, value: &str) -> Result<HeaderValue, CookieError> {
        self.build(name, format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax"))
    }

    pub(crate) fn durable(&self, name: &str, value: &str) -> Result<HeaderValue, CookieError> {
        let ttl = self.token_ttl_seconds;
        self.build(
            name,
            format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl}"),
        )
    }

    pub(crate) fn clear(&self, name: &str) -> Result<HeaderValue, CookieError> {
        self.build(name, format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"))
    }

    fn build(&self, name: &str, mut cookie: String) -> Result<HeaderValue, CookieError> {
        if self.secure {
            cookie.push_str("; Secure");
        }
        if cookie.len() > MAX_COOKIE_BYTES {
            return Err(CookieError::TooLarge {
                name: name.to_string(),
                size: cookie.len(),
            });
        }
        Ok(HeaderValue::from_str(&cookie)?)
    }

    /// Append the access and identity token cookies.
    ///
    /// Nothing is appended unless both cookies can be built.
    pub(crate) fn append_tokens(
        &self,
        headers: &mut HeaderMap,
        tokens: &TokenSet,
    ) -> Result<(), CookieError> {
        let access = self.durable(ACCESS_TOKEN_COOKIE, &tokens.access_token)?;
        let identity = self.durable(ID_TOKEN_COOKIE, &tokens.id_token)?;
        headers.append(SET_COOKIE, access);
        headers.append(SET_COOKIE, identity);
        Ok(())
    }

    pub(crate) fn append_clear_tokens(&self, headers: &mut HeaderMap) {
        for name in [ACCESS_TOKEN_COOKIE, ID_TOKEN_COOKIE] {
            if let Ok(cookie) = self.clear(name) {
                headers.append(SET_COOKIE, cookie);
            }
        }
    }
}

/// Read a cookie by name across every `Cookie` header. Empty values count as absent.
pub(crate) fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let key = parts.next()?.trim();
            let val = parts.next()?.trim();
            (key == name && !val.is_empty()).then(|| val.to_string())
        })
        .next()
}
