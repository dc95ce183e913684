//! Hostname parsing and fallback-host patterns

use std::fmt;

/// Normalized request hostname
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostName {
    /// Lowercase name without port or trailing dot; IPv6 keeps its brackets
    name: String,
    port: Option<u16>,
}

impl HostName {
    /// Parse a `Host`-style value (`name[:port]`)
    pub fn parse(raw: &str) -> Result<Self, MalformedHost> {
        let raw = raw.trim().to_ascii_lowercase();
        if raw.is_empty() {
            return Err(MalformedHost);
        }

        let (name, port) = if raw.starts_with('[') {
            let end = raw.find(']').ok_or(MalformedHost)?;
            let (literal, rest) = raw.split_at(end + 1);
            let inner = &literal[1..literal.len() - 1];
            if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_hexdigit() || b == b':' || b == b'.') {
                return Err(MalformedHost);
            }
            (literal.to_string(), parse_port(rest)?)
        } else {
            match raw.rsplit_once(':') {
                Some((name, port)) => (name.to_string(), parse_port(&format!(":{port}"))?),
                None => (raw.clone(), None),
            }
        };

        let name = name.strip_suffix('.').map(str::to_string).unwrap_or(name);

        if !name.starts_with('[') {
            if name.is_empty() || name.len() > 253 {
                return Err(MalformedHost);
            }
            for label in name.split('.') {
                if label.is_empty()
                    || label.len() > 63
                    || label.starts_with('-')
                    || label.ends_with('-')
                    || !label.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
                {
                    return Err(MalformedHost);
                }
            }
        }

        Ok(Self { name, port })
    }

    /// Lowercased name without port or trailing dot
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Whether the name is an IP literal
    pub fn is_ip(&self) -> bool {
        self.name.starts_with('[') || self.name.parse::<std::net::Ipv4Addr>().is_ok()
    }

    /// Single-label subdomain directly under one of `base_domains`
    ///
    /// `riverside.example.com` under `example.com` yields `riverside`; the
    /// bare domain and deeper names (`a.b.example.com`) yield nothing.
    pub fn subdomain_under<'a>(&'a self, base_domains: &[String]) -> Option<&'a str> {
        if self.is_ip() {
            return None;
        }
        base_domains.iter().find_map(|base| {
            let base = base.trim().trim_end_matches('.').to_ascii_lowercase();
            let prefix = self.name.strip_suffix(base.as_str())?.strip_suffix('.')?;
            (!prefix.is_empty() && !prefix.contains('.')).then_some(prefix)
        })
    }
}

impl fmt::Display for HostName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.name, port),
            None => f.write_str(&self.name),
        }
    }
}

fn parse_port(rest: &str) -> Result<Option<u16>, MalformedHost> {
    if rest.is_empty() {
        return Ok(None);
    }
    let digits = rest.strip_prefix(':').ok_or(MalformedHost)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MalformedHost);
    }
    digits.parse().map(Some).map_err(|_| MalformedHost)
}

/// Host could not be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("malformed host")]
pub struct MalformedHost;

/// Fallback-host allow-list entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPattern {
    /// Exact name, any port
    Exact(String),
    /// Exact name and port
    ExactPort(String, u16),
    /// `*.suffix`: any strict subdomain of `suffix`
    Wildcard(String),
}

impl HostPattern {
    pub fn parse(raw: &str) -> Result<Self, MalformedHost> {
        let raw = raw.trim();
        if let Some(suffix) = raw.strip_prefix("*.") {
            let host = HostName::parse(suffix)?;
            if host.port().is_some() {
                return Err(MalformedHost);
            }
            return Ok(Self::Wildcard(host.name().to_string()));
        }

        let host = HostName::parse(raw)?;
        Ok(match host.port() {
            Some(port) => Self::ExactPort(host.name().to_string(), port),
            None => Self::Exact(host.name().to_string()),
        })
    }

    pub fn matches(&self, host: &HostName) -> bool {
        match self {
            Self::Exact(name) => host.name() == name,
            Self::ExactPort(name, port) => host.name() == name && host.port() == Some(*port),
            Self::Wildcard(suffix) => host
                .name()
                .strip_suffix(suffix.as_str())
                .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.')),
        }
    }
}
