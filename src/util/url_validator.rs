use std::net::IpAddr;
use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
///
/// Covers parsing failures and the host policy applied to every URL the
/// resolver fetches, including each redirect hop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
    /// The URL points to a private/internal IP address.
    #[error("private IP address not allowed: {0}")]
    PrivateIp(String),
    /// The URL points to localhost.
    #[error("localhost not allowed")]
    Localhost,
}

/// Which hosts a fetch may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostPolicy {
    /// Permit `localhost` and loopback addresses.
    pub allow_loopback: bool,
    /// Permit private, link-local and unspecified addresses.
    pub allow_private: bool,
}

impl HostPolicy {
    /// Policy that rejects loopback and private-range hosts.
    pub const PUBLIC_ONLY: HostPolicy = HostPolicy {
        allow_loopback: false,
        allow_private: false,
    };

    /// Policy for a mirror on the same machine: loopback is reachable, the
    /// rest of the private network is not.
    pub const LOOPBACK_ONLY: HostPolicy = HostPolicy {
        allow_loopback: true,
        allow_private: false,
    };

    /// Policy that accepts any http(s) host.
    pub const ANY_HOST: HostPolicy = HostPolicy {
        allow_loopback: true,
        allow_private: true,
    };
}

/// Validates a URL string before it is fetched.
///
/// Rejects non-HTTP(S) schemes and URLs without a host. Unless the policy
/// allows private hosts, also rejects `localhost`, loopback addresses and
/// private/link-local ranges (RFC 1918, fc00::/7, fe80::/10).
///
/// # Examples
///
/// ```
/// use podfeed::util::{validate_url, HostPolicy};
///
/// let url = validate_url("https://example.com/feed.xml", HostPolicy::PUBLIC_ONLY).unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// assert!(validate_url("http://localhost/feed", HostPolicy::PUBLIC_ONLY).is_err());
/// assert!(validate_url("http://localhost/feed", HostPolicy::ANY_HOST).is_ok());
/// assert!(validate_url("file:///etc/passwd", HostPolicy::ANY_HOST).is_err());
/// ```
pub fn validate_url(url_str: &str, policy: HostPolicy) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;
    check_url(&url, policy)?;
    Ok(url)
}

/// Applies [`validate_url`]'s checks to an already-parsed URL.
pub fn check_url(url: &Url, policy: HostPolicy) -> Result<(), UrlValidationError> {
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    let host = url.host_str().ok_or(UrlValidationError::MissingHost)?;
    if policy.allow_loopback && policy.allow_private {
        return Ok(());
    }

    if host.eq_ignore_ascii_case("localhost") {
        return if policy.allow_loopback {
            Ok(())
        } else {
            Err(UrlValidationError::Localhost)
        };
    }

    // Strip brackets from IPv6 addresses for parsing
    let host_for_parse = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    if let Ok(ip) = host_for_parse.parse::<IpAddr>() {
        if ip.is_loopback() {
            return if policy.allow_loopback {
                Ok(())
            } else {
                Err(UrlValidationError::Localhost)
            };
        }
        if !policy.allow_private && is_private_ip(&ip) {
            return Err(UrlValidationError::PrivateIp(ip.to_string()));
        }
    }

    Ok(())
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_private() || ipv4.is_loopback() || ipv4.is_link_local() || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => {
            if ipv6.is_loopback() || ipv6.is_unspecified() {
                return true;
            }
            let segments = ipv6.segments();
            // Unique Local (fc00::/7)
            let is_unique_local = (segments[0] & 0xfe00) == 0xfc00;
            // Link-Local (fe80::/10)
            let is_link_local = (segments[0] & 0xffc0) == 0xfe80;
            is_unique_local || is_link_local
        }
    }
}
