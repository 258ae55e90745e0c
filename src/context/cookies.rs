use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use cookie::{Cookie, SameSite};
use std::collections::HashMap;
use time::{Duration, OffsetDateTime};
use tracing::warn;

/// Client-held key/value storage backed by cookies.
///
/// Reads see the cookies sent with the request plus anything written during
/// the same request. Writes are queued as `Set-Cookie` values until the
/// response is built.
#[derive(Debug, Clone, Default)]
pub struct ClientStorage {
    values: HashMap<String, String>,
    writes: Vec<Cookie<'static>>,
}

impl ClientStorage {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut values = HashMap::new();

        for header in headers.get_all(COOKIE) {
            let Ok(raw) = header.to_str() else {
                continue;
            };
            for cookie in Cookie::split_parse(raw).flatten() {
                values.insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }

        Self {
            values,
            writes: Vec::new(),
        }
    }

    /// Current value of a slot; empty values count as absent
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Write a slot that expires after `max_age`.
    ///
    /// Cookies are host-only (no Domain attribute), scoped to `/`, HTTP-only
    /// and `SameSite=Lax`; `secure` adds the `Secure` attribute.
    pub fn set(&mut self, name: &str, value: &str, max_age: Duration, secure: bool) {
        let cookie = Cookie::build((name.to_string(), value.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .max_age(max_age)
            .expires(OffsetDateTime::now_utc() + max_age)
            .build();

        self.values.insert(name.to_string(), value.to_string());
        self.writes.push(cookie);
    }

    /// Writes queued since the last drain
    pub fn pending(&self) -> &[Cookie<'static>] {
        &self.writes
    }

    pub fn drain_writes(&mut self) -> Vec<Cookie<'static>> {
        std::mem::take(&mut self.writes)
    }
}

/// Append queued cookie writes to response headers
pub fn append_set_cookies(headers: &mut HeaderMap, writes: &[Cookie<'static>]) {
    for cookie in writes {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(err) => {
                warn!(cookie = cookie.name(), error = %err, "dropping unencodable cookie");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_request_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("a=1; b=two; empty="));
        let storage = ClientStorage::from_headers(&headers);

        assert_eq!(storage.get("a"), Some("1"));
        assert_eq!(storage.get("b"), Some("two"));
        assert!(!storage.contains("empty"));
        assert!(!storage.contains("missing"));
    }

    #[test]
    fn test_write_is_visible_and_queued() {
        let mut storage = ClientStorage::default();
        storage.set("slot", "value", Duration::hours(1), false);

        assert_eq!(storage.get("slot"), Some("value"));
        assert_eq!(storage.pending().len(), 1);

        let cookie = &storage.pending()[0];
        assert_eq!(cookie.max_age(), Some(Duration::hours(1)));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.domain(), None);

        let drained = storage.drain_writes();
        assert_eq!(drained.len(), 1);
        assert!(storage.pending().is_empty());
        assert_eq!(storage.get("slot"), Some("value"));
    }

    #[test]
    fn test_append_set_cookies() {
        let mut storage = ClientStorage::default();
        storage.set("slot", "value", Duration::days(7), true);

        let mut headers = HeaderMap::new();
        append_set_cookies(&mut headers, storage.pending());

        let header = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(header.starts_with("slot=value"));
        assert!(header.contains("Max-Age=604800"));
        assert!(header.contains("Secure"));
        assert!(header.contains("HttpOnly"));
    }
}
