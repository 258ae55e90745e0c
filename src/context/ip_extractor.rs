//! Visitor address resolution
//!
//! The socket address is used unless a proxy mode is configured. Behind a
//! proxy the address comes from `CF-Connecting-IP` or from the `Forwarded` /
//! `X-Forwarded-For` hop list, read from the end closest to us.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};
use tracing::warn;

use crate::config::{ProxyConfig, TrustedProxyMode};

/// Address reported as `client_ip_address` for a request that arrived from `peer`.
pub fn extract_client_ip(headers: &HeaderMap, peer: IpAddr, proxy: &ProxyConfig) -> IpAddr {
    let resolved = match proxy.trusted_proxy_mode {
        TrustedProxyMode::None => return peer,
        TrustedProxyMode::Cloudflare => {
            let ip = header_str(headers, "cf-connecting-ip").and_then(|v| v.trim().parse().ok());
            if ip.is_none() {
                warn!(%peer, "cloudflare mode without CF-Connecting-IP, using peer address");
            }
            ip
        }
        TrustedProxyMode::Standard => {
            let hops = forwarded_hops(headers).unwrap_or_else(|| x_forwarded_for_hops(headers));
            origin_hop(&hops, proxy)
        }
    };

    resolved.unwrap_or(peer)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// `for=` addresses from an RFC 7239 header, client first.
///
/// `None` when the header is absent or names no usable address.
fn forwarded_hops(headers: &HeaderMap) -> Option<Vec<IpAddr>> {
    let hops: Vec<IpAddr> = header_str(headers, "forwarded")?
        .split(',')
        .filter_map(|element| {
            element
                .split(';')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| key.trim().eq_ignore_ascii_case("for"))
                .and_then(|(_, node)| parse_node(node.trim()))
        })
        .collect();

    (!hops.is_empty()).then_some(hops)
}

fn x_forwarded_for_hops(headers: &HeaderMap) -> Vec<IpAddr> {
    header_str(headers, "x-forwarded-for")
        .into_iter()
        .flat_map(|list| list.split(','))
        .filter_map(|hop| hop.trim().parse().ok())
        .collect()
}

/// Node values may be quoted and carry a port: `"[2001:db8::1]:4711"`, `192.0.2.60:80`
fn parse_node(node: &str) -> Option<IpAddr> {
    let node = node.trim_matches('"');

    match node.strip_prefix('[') {
        Some(bracketed) => bracketed.split_once(']')?.0.parse().ok(),
        None => node
            .parse::<IpAddr>()
            .ok()
            .or_else(|| node.parse::<SocketAddr>().ok().map(|addr| addr.ip())),
    }
}

/// Choose the originating address from a hop list ordered client first.
fn origin_hop(hops: &[IpAddr], proxy: &ProxyConfig) -> Option<IpAddr> {
    let leftmost = hops.first().copied();

    if let Some(trusted) = proxy.num_trusted_proxies {
        // Short chains fall back to the leftmost entry
        return hops
            .len()
            .checked_sub(trusted + 1)
            .map(|index| hops[index])
            .or(leftmost);
    }

    if proxy.trusted_proxies.is_empty() {
        return hops.last().copied();
    }

    hops.iter()
        .rev()
        .copied()
        .find(|hop| !proxy.trusted_proxies.iter().any(|net| net.contains(hop)))
        .or(leftmost)
}
