//! Network-safety checks applied to every redirect hop before it is probed.
//!
//! The policy is a trait so the resolver can be exercised against local mock
//! servers in tests; production wires in [`StandardSafetyPolicy`], which
//! rejects loopback, private, and link-local targets and consults the
//! blocklist checkpoint.

use async_trait::async_trait;
use std::net::IpAddr;
use url::Url;

use crate::errors::{Error, Result};
use crate::safety::blocklist::BlocklistService;

/// Decides whether a URL is a safe fetch target.
#[async_trait]
pub trait SafetyPolicy: Send + Sync {
    async fn check_url(&self, url: &Url) -> Result<()>;
}

/// Is this address one we must never fetch from? Loopback, RFC 1918 private
/// ranges, link-local, and unspecified addresses are all SSRF targets.
pub fn is_disallowed_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified() || v4.is_broadcast(),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_disallowed_ip(IpAddr::V4(mapped));
            }
            let segments = v6.segments();
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique-local
                || (segments[0] & 0xfe00) == 0xfc00
                // fe80::/10 link-local
                || (segments[0] & 0xffc0) == 0xfe80
        }
    }
}

/// Production policy: scheme, address-range, and blocklist checks. Hostnames
/// are resolved and every candidate address must be publicly routable.
pub struct StandardSafetyPolicy {
    blocklist: BlocklistService,
}

impl StandardSafetyPolicy {
    pub fn new(blocklist: BlocklistService) -> Self {
        Self { blocklist }
    }
}

#[async_trait]
impl SafetyPolicy for StandardSafetyPolicy {
    async fn check_url(&self, url: &Url) -> Result<()> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::UnsafeUrl {
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let host = url.host_str().ok_or_else(|| Error::UnsafeUrl {
            reason: "URL has no host".to_string(),
        })?;

        if self.blocklist.is_blocked(host).await {
            return Err(Error::UnsafeUrl {
                reason: format!("domain '{host}' is blocked"),
            });
        }

        // IP literals are checked directly; hostnames are resolved and every
        // returned address must pass.
        if let Ok(ip) = host.parse::<IpAddr>() {
            if is_disallowed_ip(ip) {
                return Err(Error::UnsafeUrl {
                    reason: format!("address {ip} is not publicly routable"),
                });
            }
            return Ok(());
        }

        let port = url.port_or_known_default().unwrap_or(443);
        let addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| Error::UnsafeUrl {
            reason: format!("could not resolve host '{host}': {e}"),
        })?;

        for addr in addrs {
            if is_disallowed_ip(addr.ip()) {
                return Err(Error::UnsafeUrl {
                    reason: format!("host '{host}' resolves to non-routable address {}", addr.ip()),
                });
            }
        }

        Ok(())
    }
}

/// Permissive policy that only enforces scheme and blocklist rules, skipping
/// address-range checks. Used in tests against local mock origins.
pub struct PublicNetworkPolicy;

#[async_trait]
impl SafetyPolicy for PublicNetworkPolicy {
    async fn check_url(&self, url: &Url) -> Result<()> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::UnsafeUrl {
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_and_private_ranges_are_disallowed() {
        for ip in ["127.0.0.1", "10.0.0.8", "192.168.1.1", "172.16.0.3", "169.254.169.254", "0.0.0.0"] {
            assert!(is_disallowed_ip(ip.parse().unwrap()), "{ip} should be disallowed");
        }
    }

    #[test]
    fn public_addresses_are_allowed() {
        for ip in ["8.8.8.8", "93.184.216.34", "2606:4700::1111"] {
            assert!(!is_disallowed_ip(ip.parse().unwrap()), "{ip} should be allowed");
        }
    }

    #[test]
    fn ipv6_local_ranges_are_disallowed() {
        for ip in ["::1", "fe80::1", "fc00::1", "fd12:3456::1", "::ffff:127.0.0.1", "::ffff:10.0.0.1"] {
            assert!(is_disallowed_ip(ip.parse().unwrap()), "{ip} should be disallowed");
        }
    }

    #[tokio::test]
    async fn permissive_policy_still_rejects_bad_schemes() {
        let policy = PublicNetworkPolicy;
        let url: Url = "ftp://example.com/file".parse().unwrap();
        assert!(policy.check_url(&url).await.is_err());

        let url: Url = "https://example.com/".parse().unwrap();
        assert!(policy.check_url(&url).await.is_ok());
    }
}
