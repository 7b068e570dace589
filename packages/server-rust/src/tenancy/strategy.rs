//! Tenant resolution strategy selection and host/subdomain parsing.

use std::fmt;

use tracing::warn;

/// How the fallback resolver identifies a tenant for requests without a
/// usable token binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionStrategy {
    /// Read the explicit tenant header.
    #[default]
    Header,
    /// Map the leftmost host label to a tenant via the cached lookup.
    Subdomain,
    /// Read the tenant claim of a bearer token, when one is present.
    Jwt,
    /// Try the header first, then the subdomain.
    Hybrid,
}

impl ResolutionStrategy {
    /// Parses a configured selector value, case-insensitively.
    ///
    /// Unrecognized values warn and fall back to [`Self::Header`] so a
    /// typo in deployment configuration degrades to the default instead
    /// of failing startup.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "HEADER" => Self::Header,
            "SUBDOMAIN" => Self::Subdomain,
            "JWT" => Self::Jwt,
            "HYBRID" => Self::Hybrid,
            _ => {
                warn!(
                    strategy = %value,
                    "unknown tenant resolution strategy, falling back to HEADER"
                );
                Self::Header
            }
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Header => "HEADER",
            Self::Subdomain => "SUBDOMAIN",
            Self::Jwt => "JWT",
            Self::Hybrid => "HYBRID",
        };
        f.write_str(name)
    }
}

/// Extracts the tenant subdomain label from a request host.
///
/// The host is split on `.` after stripping any port suffix. A usable
/// subdomain requires at least three labels (`acme.example.com`); the
/// leftmost label is taken unless it is `www`, which is not a tenant.
#[must_use]
pub fn subdomain_label(host: &str) -> Option<&str> {
    let host = host.split(':').next().unwrap_or(host);
    let mut labels = host.split('.');
    let first = labels.next()?;
    if labels.count() < 2 {
        return None;
    }
    if first.is_empty() || first.eq_ignore_ascii_case("www") {
        return None;
    }
    Some(first)
}
