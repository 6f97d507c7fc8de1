//! Network half of the client identity
//!
//! Without a client fingerprint the IP is the identity key, so forwarding
//! headers are only believed when the direct peer is a proxy: an entry of
//! `server.trusted_proxies` (single address or CIDR), or any private/loopback
//! peer when that list is empty. A public peer sending `X-Forwarded-For`
//! keeps its own address.

use std::net::{IpAddr, SocketAddr};

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;
use tracing::trace;

use crate::config::get_config;

/// `trusted_proxies` 的一项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProxyRule {
    Addr(IpAddr),
    Net { base: IpAddr, prefix: u8 },
}

impl ProxyRule {
    /// 无法解析的规则直接忽略
    fn parse(rule: &str) -> Option<Self> {
        let rule = rule.trim();
        let Some((base, prefix)) = rule.split_once('/') else {
            return rule.parse().ok().map(ProxyRule::Addr);
        };
        let base: IpAddr = base.parse().ok()?;
        let prefix: u8 = prefix.parse().ok()?;
        let bits = if base.is_ipv4() { 32 } else { 128 };
        (prefix <= bits).then_some(ProxyRule::Net { base, prefix })
    }

    fn matches(&self, ip: IpAddr) -> bool {
        match *self {
            ProxyRule::Addr(addr) => addr == ip,
            ProxyRule::Net { base, prefix } => same_network(ip, base, prefix),
        }
    }
}

fn same_network(ip: IpAddr, base: IpAddr, prefix: u8) -> bool {
    match (ip, base) {
        (IpAddr::V4(ip), IpAddr::V4(base)) => {
            let shift = 32 - u32::from(prefix);
            u32::from(ip).checked_shr(shift).unwrap_or(0)
                == u32::from(base).checked_shr(shift).unwrap_or(0)
        }
        (IpAddr::V6(ip), IpAddr::V6(base)) => {
            let shift = 128 - u32::from(prefix);
            u128::from(ip).checked_shr(shift).unwrap_or(0)
                == u128::from(base).checked_shr(shift).unwrap_or(0)
        }
        _ => false,
    }
}

/// 内网或本机地址（未配置 trusted_proxies 时视为反向代理）
fn is_internal(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unique_local() || v6.is_unicast_link_local(),
    }
}

/// 对端地址，可能带端口
fn parse_peer(peer: &str) -> Option<IpAddr> {
    peer.parse::<SocketAddr>()
        .map(|addr| addr.ip())
        .or_else(|_| peer.parse::<IpAddr>())
        .ok()
}

/// 代理转交的原始客户端：`X-Forwarded-For` 第一跳，其次 `X-Real-IP`
fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    header("x-forwarded-for")
        .and_then(|chain| chain.split(',').next())
        .or_else(|| header("x-real-ip"))
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(String::from)
}

/// 按代理规则决定用于身份的客户端 IP
pub fn resolve_client_ip(peer: &str, headers: &HeaderMap, trusted_proxies: &[String]) -> String {
    let Some(peer_ip) = parse_peer(peer) else {
        return peer.to_string();
    };

    let via_proxy = if trusted_proxies.is_empty() {
        is_internal(peer_ip)
    } else {
        trusted_proxies
            .iter()
            .filter_map(|rule| ProxyRule::parse(rule))
            .any(|rule| rule.matches(peer_ip))
    };

    if via_proxy && let Some(client) = forwarded_client(headers) {
        trace!("Client {} forwarded by proxy {}", client, peer_ip);
        return client;
    }
    peer_ip.to_string()
}

/// 从 HttpRequest 提取客户端 IP；测试请求等没有对端地址时返回 None
pub fn extract_client_ip(req: &HttpRequest) -> Option<String> {
    let conn = req.connection_info();
    let peer = conn.peer_addr()?;
    Some(resolve_client_ip(
        peer,
        req.headers(),
        &get_config().server.trusted_proxies,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        map
    }

    #[test]
    fn test_public_peer_cannot_spoof_identity() {
        // 直连客户端伪造 XFF 不能换出新身份
        let spoofed = headers(&[("x-forwarded-for", "198.51.100.7")]);
        assert_eq!(resolve_client_ip("203.0.113.5", &spoofed, &[]), "203.0.113.5");
        assert_eq!(
            resolve_client_ip("203.0.113.5:51234", &spoofed, &[]),
            "203.0.113.5"
        );
    }

    #[test]
    fn test_private_proxy_forwards_first_hop() {
        let chain = headers(&[("x-forwarded-for", "203.0.113.5, 10.0.0.2")]);
        assert_eq!(resolve_client_ip("10.0.0.2", &chain, &[]), "203.0.113.5");
        assert_eq!(resolve_client_ip("fd00::2", &chain, &[]), "203.0.113.5");

        let real_ip = headers(&[("x-real-ip", "203.0.113.9")]);
        assert_eq!(resolve_client_ip("127.0.0.1", &real_ip, &[]), "203.0.113.9");

        // 代理没带转发头时退回代理地址
        assert_eq!(resolve_client_ip("10.0.0.2", &HeaderMap::new(), &[]), "10.0.0.2");
    }

    #[test]
    fn test_explicit_proxy_list_replaces_private_detection() {
        let chain = headers(&[("x-forwarded-for", "203.0.113.5")]);
        let proxies = vec!["192.0.2.0/24".to_string(), "2001:db8::1".to_string()];

        assert_eq!(resolve_client_ip("192.0.2.77", &chain, &proxies), "203.0.113.5");
        assert_eq!(resolve_client_ip("2001:db8::1", &chain, &proxies), "203.0.113.5");
        // 列表存在时内网地址不再自动可信
        assert_eq!(resolve_client_ip("10.0.0.2", &chain, &proxies), "10.0.0.2");
    }

    #[test]
    fn test_proxy_rule_parsing() {
        assert_eq!(
            ProxyRule::parse(" 10.1.0.0/16 "),
            Some(ProxyRule::Net {
                base: "10.1.0.0".parse().unwrap(),
                prefix: 16
            })
        );
        assert_eq!(ProxyRule::parse("10.1.0.0/33"), None);
        assert_eq!(ProxyRule::parse("proxy.internal"), None);

        let everything = ProxyRule::parse("0.0.0.0/0").unwrap();
        assert!(everything.matches("203.0.113.5".parse().unwrap()));
        assert!(!everything.matches("::1".parse().unwrap()));
    }
}
