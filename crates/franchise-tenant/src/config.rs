//! Tenancy Configuration
//!
//! Loaded from TOML, overlaid with `FRANCHISE_*` environment variables, then
//! validated. The fallback-host allow-list is deployment configuration and
//! is never hardcoded.

use crate::host::HostPattern;
use crate::model::{TenantRecord, TenantSlug};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "FRANCHISE_";

/// Longest accepted session lifetime (90 days)
pub const MAX_SESSION_TTL_SECS: u64 = 90 * 24 * 3600;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TenancyConfig {
    /// Host classification
    pub hosts: HostConfig,
    /// Deployment-wide default tenant, honored on fallback hosts only
    pub default_tenant: Option<String>,
    /// Session settings
    pub session: SessionConfig,
    /// Audit sink settings
    pub audit: AuditConfig,
    /// Registered franchises
    pub tenants: Vec<TenantRecord>,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            hosts: HostConfig::default(),
            default_tenant: None,
            session: SessionConfig::default(),
            audit: AuditConfig::default(),
            tenants: Vec::new(),
        }
    }
}

/// Host classification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Domains under which a single-label subdomain names a tenant
    pub base_domains: Vec<String>,
    /// Hosts allowed to accept overrides and the default tenant
    pub fallback_hosts: Vec<String>,
    /// Labels never treated as tenant subdomains
    pub reserved_subdomains: Vec<String>,
    /// Prefer `X-Forwarded-Host` over `Host`
    pub trust_forwarded_host: bool,
    /// Query parameter carrying a tenant override
    pub override_param: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            base_domains: vec!["localhost".into()],
            fallback_hosts: vec!["localhost".into(), "127.0.0.1".into(), "[::1]".into()],
            reserved_subdomains: vec!["www".into()],
            trust_forwarded_host: false,
            override_param: "tenant".into(),
        }
    }
}

/// Session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie carrying the opaque session token
    pub cookie_name: String,
    /// Session lifetime in seconds, at most [`MAX_SESSION_TTL_SECS`]
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "fr_session".into(),
            ttl_secs: 8 * 3600,
        }
    }
}

impl SessionConfig {
    /// Session lifetime, if representable
    pub fn ttl(&self) -> Option<chrono::Duration> {
        i64::try_from(self.ttl_secs).ok().and_then(chrono::Duration::try_seconds)
    }
}

/// Audit settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Append JSON lines here; tracing events when unset
    pub path: Option<PathBuf>,
}

impl TenancyConfig {
    /// Load from a TOML file, apply process environment, validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?.with_env(std::env::vars());
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML without validating
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay `FRANCHISE_*` variables
    pub fn with_env<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "DEFAULT_TENANT" => {
                    self.default_tenant = Some(value).filter(|v| !v.trim().is_empty());
                }
                "BASE_DOMAINS" => self.hosts.base_domains = split_list(&value),
                "FALLBACK_HOSTS" => self.hosts.fallback_hosts = split_list(&value),
                "TRUST_FORWARDED_HOST" => {
                    self.hosts.trust_forwarded_host = value.trim().eq_ignore_ascii_case("true");
                }
                _ => {}
            }
        }
        self
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hosts.override_param.trim().is_empty() {
            return Err(ConfigError::Invalid("hosts.override_param must not be empty".into()));
        }

        if self.session.cookie_name.trim().is_empty() {
            return Err(ConfigError::Invalid("session.cookie_name must not be empty".into()));
        }
        if !(1..=MAX_SESSION_TTL_SECS).contains(&self.session.ttl_secs) || self.session.ttl().is_none() {
            return Err(ConfigError::Invalid(format!(
                "session.ttl_secs {} outside 1..={MAX_SESSION_TTL_SECS}",
                self.session.ttl_secs
            )));
        }

        for pattern in &self.hosts.fallback_hosts {
            HostPattern::parse(pattern)
                .map_err(|_| ConfigError::Invalid(format!("bad fallback host pattern {pattern:?}")))?;
        }

        if let Some(default) = &self.default_tenant {
            TenantSlug::parse(default)
                .map_err(|_| ConfigError::Invalid(format!("bad default_tenant {default:?}")))?;
        }

        let mut slugs = HashSet::new();
        let mut subdomains = HashSet::new();
        for tenant in &self.tenants {
            if !slugs.insert(tenant.slug.clone()) {
                return Err(ConfigError::Invalid(format!("duplicate tenant {}", tenant.slug)));
            }
            let subdomain = tenant.subdomain.trim().to_ascii_lowercase();
            if TenantSlug::parse(&subdomain).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "bad subdomain {:?} for tenant {}",
                    tenant.subdomain, tenant.slug
                )));
            }
            if !subdomains.insert(subdomain) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate subdomain {:?}",
                    tenant.subdomain
                )));
            }
        }

        Ok(())
    }

    /// Parsed fallback-host patterns; call after [`Self::validate`]
    pub fn fallback_patterns(&self) -> Vec<HostPattern> {
        self.hosts
            .fallback_hosts
            .iter()
            .filter_map(|p| HostPattern::parse(p).ok())
            .collect()
    }

    /// Parsed default tenant; call after [`Self::validate`]
    pub fn default_tenant_slug(&self) -> Option<TenantSlug> {
        self.default_tenant
            .as_deref()
            .and_then(|s| TenantSlug::parse(s).ok())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
default_tenant = "riverside"

[hosts]
base_domains = ["example.com"]
fallback_hosts = ["localhost", "*.preview.example.net"]

[[tenants]]
slug = "riverside"
subdomain = "riverside"
display_name = "Riverside"

[[tenants]]
slug = "lakeside"
subdomain = "lake"
status = "inactive"
"#;

    #[test]
    fn test_parse_sample() {
        let config = TenancyConfig::from_toml(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.tenants.len(), 2);
        assert!(config.tenants[0].is_active());
        assert!(!config.tenants[1].is_active());
        assert_eq!(config.hosts.override_param, "tenant");
        assert_eq!(config.session.cookie_name, "fr_session");
        assert_eq!(config.default_tenant_slug().unwrap().as_str(), "riverside");
        assert_eq!(config.fallback_patterns().len(), 2);
    }

    #[test]
    fn test_env_overlay() {
        let config = TenancyConfig::default().with_env(vec![
            ("FRANCHISE_DEFAULT_TENANT".to_string(), "lakeside".to_string()),
            ("FRANCHISE_FALLBACK_HOSTS".to_string(), "localhost, *.vercel.app".to_string()),
            ("FRANCHISE_TRUST_FORWARDED_HOST".to_string(), "TRUE".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ]);

        assert_eq!(config.default_tenant.as_deref(), Some("lakeside"));
        assert_eq!(config.hosts.fallback_hosts, vec!["localhost", "*.vercel.app"]);
        assert!(config.hosts.trust_forwarded_host);
    }

    #[test]
    fn test_empty_default_from_env_clears_it() {
        let mut config = TenancyConfig::default();
        config.default_tenant = Some("riverside".into());
        let config = config.with_env(vec![("FRANCHISE_DEFAULT_TENANT".to_string(), " ".to_string())]);
        assert_eq!(config.default_tenant, None);
    }

    #[test]
    fn test_rejects_duplicate_subdomains() {
        let config = TenancyConfig::from_toml(
            r#"
[[tenants]]
slug = "a"
subdomain = "city"

[[tenants]]
slug = "b"
subdomain = "CITY"
"#,
        )
        .unwrap();

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_bad_default_and_patterns() {
        let mut config = TenancyConfig::default();
        config.default_tenant = Some("not a slug".into());
        assert!(config.validate().is_err());

        let mut config = TenancyConfig::default();
        config.hosts.fallback_hosts = vec!["local host".into()];
        assert!(config.validate().is_err());

        let mut config = TenancyConfig::default();
        config.hosts.override_param = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_ttl_bounds() {
        let mut config = TenancyConfig::default();
        config.session.ttl_secs = 0;
        assert!(config.validate().is_err());

        // representable as a Duration but overflows any expiry timestamp
        config.session.ttl_secs = 9_000_000_000_000;
        assert!(config.session.ttl().is_some());
        assert!(config.validate().is_err());

        config.session.ttl_secs = MAX_SESSION_TTL_SECS + 1;
        assert!(config.validate().is_err());

        config.session.ttl_secs = MAX_SESSION_TTL_SECS;
        assert!(config.validate().is_ok());
    }
}
