//! SSRF URL validation, called as a pure function ahead of any fetch.

use std::net::IpAddr;

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsrfViolation(pub String);

/// Rejects non-http(s) schemes and loopback/link-local/private-range hosts.
/// Hostnames are resolved by literal IP parse only — a DNS-resolving
/// variant belongs at the fetch layer, since resolution itself can be
/// adversarial (DNS rebinding); this function only catches the literal case.
pub fn validate(raw_url: &str) -> Result<Url, SsrfViolation> {
    let url = Url::parse(raw_url).map_err(|e| SsrfViolation(format!("invalid URL: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(SsrfViolation(format!("unsupported scheme: {other}"))),
    }

    let host = url
        .host_str()
        .ok_or_else(|| SsrfViolation("URL has no host".to_string()))?;

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_blocked_ip(&ip) {
            return Err(SsrfViolation(format!("blocked address: {ip}")));
        }
    } else if is_blocked_hostname(host) {
        return Err(SsrfViolation(format!("blocked host: {host}")));
    }

    Ok(url)
}

fn is_blocked_hostname(host: &str) -> bool {
    matches!(
        host.to_ascii_lowercase().as_str(),
        "localhost" | "metadata.google.internal"
    )
}

fn is_blocked_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 169.254.169.254 and friends are covered by is_link_local;
                // explicitly reject the common cloud metadata address too.
                || *v4 == std::net::Ipv4Addr::new(169, 254, 169, 254)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified() || is_unique_local_v6(v6),
    }
}

fn is_unique_local_v6(v6: &std::net::Ipv6Addr) -> bool {
    (v6.segments()[0] & 0xfe00) == 0xfc00
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_scheme() {
        assert!(validate("file:///etc/passwd").is_err());
        assert!(validate("ftp://example.com").is_err());
    }

    #[test]
    fn rejects_loopback() {
        assert!(validate("http://127.0.0.1/admin").is_err());
        assert!(validate("http://localhost/admin").is_err());
    }

    #[test]
    fn rejects_private_ranges() {
        assert!(validate("http://10.0.0.5/").is_err());
        assert!(validate("http://192.168.1.1/").is_err());
        assert!(validate("http://169.254.169.254/latest/meta-data").is_err());
    }

    #[test]
    fn accepts_public_http_url() {
        assert!(validate("https://example.com/article").is_ok());
    }
}
