//! Request-scoped inputs shared by capture and relay
//!
//! A [`RequestContext`] is built once per inbound request from the method,
//! URI, headers and socket address; client-held state travels separately in
//! [`ClientStorage`].

pub mod cookies;
pub mod ip_extractor;

pub use cookies::{append_set_cookies, ClientStorage};
pub use ip_extractor::extract_client_ip;

use axum::extract::Query;
use axum::http::header::{HOST, USER_AGENT};
use axum::http::{HeaderMap, Method, Uri};
use std::collections::HashMap;
use std::net::IpAddr;

use crate::config::{ProxyConfig, TrustedProxyMode};

/// Deployment options that shape how a request context is derived
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub proxy: ProxyConfig,
    pub admin_path_prefix: String,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            proxy: ProxyConfig::default(),
            admin_path_prefix: "/admin".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Path component only
    pub path: String,
    /// Path and query exactly as requested
    pub request_uri: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub host: String,
    pub secure: bool,
    pub client_ip: Option<IpAddr>,
    /// Administrative requests never capture or relay
    pub is_admin: bool,
}

impl RequestContext {
    pub fn new(
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        socket_ip: Option<IpAddr>,
        options: &ContextOptions,
    ) -> Self {
        let path = uri.path().to_string();
        let request_uri = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| path.clone());

        let query = Query::<HashMap<String, String>>::try_from_uri(uri)
            .map(|Query(query)| query)
            .unwrap_or_default();

        let host = uri
            .authority()
            .map(|authority| authority.as_str().to_string())
            .or_else(|| {
                headers
                    .get(HOST)
                    .and_then(|h| h.to_str().ok())
                    .map(str::to_string)
            })
            .unwrap_or_default();

        let forwarded_https = options.proxy.trusted_proxy_mode != TrustedProxyMode::None
            && headers
                .get("x-forwarded-proto")
                .and_then(|h| h.to_str().ok())
                .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"));
        let secure = uri.scheme_str() == Some("https") || forwarded_https;

        let client_ip = socket_ip.map(|ip| extract_client_ip(headers, ip, &options.proxy));

        let prefix = options.admin_path_prefix.trim_end_matches('/');
        let is_admin = !prefix.is_empty()
            && (path == prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/')));

        Self {
            method: method.clone(),
            path,
            request_uri,
            query,
            headers: headers.clone(),
            host,
            secure,
            client_ip,
            is_admin,
        }
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers.get(USER_AGENT).and_then(|h| h.to_str().ok())
    }

    /// Absolute URL of the current page
    pub fn full_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}{}", scheme, self.host, self.request_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn context(uri: &str, headers: HeaderMap, options: &ContextOptions) -> RequestContext {
        let uri: Uri = uri.parse().unwrap();
        RequestContext::new(
            &Method::GET,
            &uri,
            &headers,
            Some("192.0.2.10".parse().unwrap()),
            options,
        )
    }

    #[test]
    fn test_builds_url_and_query() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("shop.example"));
        let ctx = context("/thanks?fbclid=abc123&x=1", headers, &ContextOptions::default());

        assert_eq!(ctx.path, "/thanks");
        assert_eq!(ctx.request_uri, "/thanks?fbclid=abc123&x=1");
        assert_eq!(ctx.query_param("fbclid"), Some("abc123"));
        assert_eq!(ctx.full_url(), "http://shop.example/thanks?fbclid=abc123&x=1");
        assert!(!ctx.secure);
        assert!(!ctx.is_admin);
        assert_eq!(ctx.client_ip, Some("192.0.2.10".parse().unwrap()));
    }

    #[test]
    fn test_admin_prefix_matches_whole_segments() {
        let options = ContextOptions::default();
        assert!(context("/admin", HeaderMap::new(), &options).is_admin);
        assert!(context("/admin/settings", HeaderMap::new(), &options).is_admin);
        assert!(!context("/administrator", HeaderMap::new(), &options).is_admin);
    }

    #[test]
    fn test_forwarded_proto_only_trusted_behind_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));

        let direct = context("/", headers.clone(), &ContextOptions::default());
        assert!(!direct.secure);

        let options = ContextOptions {
            proxy: ProxyConfig {
                trusted_proxy_mode: TrustedProxyMode::Standard,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(context("/", headers, &options).secure);
    }
}
