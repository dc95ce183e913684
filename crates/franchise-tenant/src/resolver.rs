//! Tenant Resolver
//!
//! Derives the tenant for a request from its hostname. Client-supplied
//! overrides are only ever considered on fallback hosts; on a real tenant
//! host the answer depends on the hostname alone.

use crate::config::TenancyConfig;
use crate::error::{ResolutionError, TenancyResult, ValidationInputError};
use crate::host::{HostName, HostPattern};
use crate::model::{TenantRecord, TenantSlug};
use crate::request::RequestMeta;
use crate::store::TenantDirectory;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Where the tenant came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantSource {
    /// Registered subdomain of the request host
    Hostname,
    /// Override query parameter on a fallback host
    Query,
    /// Deployment-wide default on a fallback host
    Env,
}

/// Resolved, request-scoped tenant context
///
/// Passed explicitly to everything downstream; nothing re-derives the
/// tenant from headers on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantContext {
    /// Normalized hostname, if one parsed
    pub hostname: Option<String>,
    /// Tenant the request belongs to
    #[serde(rename = "resolvedTenant")]
    pub tenant: TenantSlug,
    /// Which step produced the tenant
    pub source: TenantSource,
    /// Whether the host is on the fallback allow-list
    #[serde(rename = "isFallbackHost")]
    pub is_fallback: bool,
}

/// Per-call-site resolution options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Honor the override parameter on fallback hosts
    pub allow_override: bool,
}

impl ResolveOptions {
    /// Read paths: overrides honored on fallback hosts
    pub const ALLOW_OVERRIDE: Self = Self { allow_override: true };
    /// Writes and admin paths: hostname or deployment default only
    pub const STRICT: Self = Self { allow_override: false };
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::ALLOW_OVERRIDE
    }
}

/// Tenant resolver
pub struct TenantResolver {
    directory: Arc<dyn TenantDirectory>,
    base_domains: Vec<String>,
    reserved_subdomains: Vec<String>,
    fallback_hosts: Vec<HostPattern>,
    default_tenant: Option<TenantSlug>,
    override_param: String,
    trust_forwarded_host: bool,
}

impl TenantResolver {
    /// Create from validated configuration
    pub fn new(config: &TenancyConfig, directory: Arc<dyn TenantDirectory>) -> Self {
        Self {
            directory,
            base_domains: config.hosts.base_domains.clone(),
            reserved_subdomains: config
                .hosts
                .reserved_subdomains
                .iter()
                .map(|s| s.trim().to_ascii_lowercase())
                .collect(),
            fallback_hosts: config.fallback_patterns(),
            default_tenant: config.default_tenant_slug(),
            override_param: config.hosts.override_param.clone(),
            trust_forwarded_host: config.hosts.trust_forwarded_host,
        }
    }

    /// Whether a parsed host is on the fallback allow-list
    pub fn is_fallback_host(&self, host: &HostName) -> bool {
        self.fallback_hosts.iter().any(|p| p.matches(host))
    }

    /// Resolve the tenant for a request
    pub async fn resolve(&self, request: &RequestMeta, options: ResolveOptions) -> TenancyResult<TenantContext> {
        let raw_host = request.host(self.trust_forwarded_host);
        let host = raw_host.and_then(|h| HostName::parse(h).ok());
        let hostname = host.as_ref().map(|h| h.name().to_string());

        let from_host = match &host {
            Some(host) => self.tenant_from_host(host).await,
            None => None,
        };

        let is_fallback = host.as_ref().is_some_and(|h| self.is_fallback_host(h));

        let overrides: Vec<&str> = request.query_values(&self.override_param).collect();
        if !overrides.is_empty() && !is_fallback {
            warn!(
                host = ?raw_host,
                override_value = ?overrides,
                "tenant override on non-fallback host rejected"
            );
            return Err(ResolutionError::OverrideRejected {
                host: raw_host.map(str::to_string),
                value: overrides.join(","),
            }
            .into());
        }

        if let Some(record) = from_host {
            debug!(host = ?hostname, tenant = %record.slug, "tenant resolved from hostname");
            return Ok(TenantContext {
                hostname,
                tenant: record.slug,
                source: TenantSource::Hostname,
                is_fallback,
            });
        }

        if is_fallback && options.allow_override && !overrides.is_empty() {
            let tenant = self.override_tenant(&overrides, raw_host).await?;
            debug!(host = ?hostname, tenant = %tenant, "tenant resolved from override");
            return Ok(TenantContext {
                hostname,
                tenant,
                source: TenantSource::Query,
                is_fallback,
            });
        }

        if is_fallback {
            if let Some(default) = &self.default_tenant {
                let tenant = self.registered(default, raw_host).await?;
                debug!(host = ?hostname, tenant = %tenant, "tenant resolved from deployment default");
                return Ok(TenantContext {
                    hostname,
                    tenant,
                    source: TenantSource::Env,
                    is_fallback,
                });
            }
        }

        if host.is_none() {
            warn!(host = ?raw_host, "missing or malformed host");
            return Err(ValidationInputError::MalformedHost(raw_host.map(str::to_string)).into());
        }

        warn!(host = ?raw_host, is_fallback, "no tenant resolvable");
        Err(ResolutionError::NoTenant {
            host: raw_host.map(str::to_string),
            detail: if is_fallback {
                format!(
                    "fallback host without usable ?{}= override or default tenant",
                    self.override_param
                )
            } else {
                "no registered tenant subdomain".to_string()
            },
        }
        .into())
    }

    /// Registered, active tenant for the host's subdomain
    ///
    /// Every failure here means "no tenant from hostname", including
    /// datastore errors.
    async fn tenant_from_host(&self, host: &HostName) -> Option<TenantRecord> {
        let subdomain = host.subdomain_under(&self.base_domains)?;
        if self.reserved_subdomains.iter().any(|r| r == subdomain) {
            debug!(host = %host, subdomain, "reserved subdomain");
            return None;
        }

        match self.directory.find_by_subdomain(subdomain).await {
            Ok(Some(record)) if record.is_active() => Some(record),
            Ok(Some(record)) => {
                warn!(host = %host, tenant = %record.slug, "subdomain maps to inactive tenant");
                None
            }
            Ok(None) => {
                debug!(host = %host, subdomain, "unregistered subdomain");
                None
            }
            Err(e) => {
                error!(host = %host, error = %e, "tenant lookup failed");
                None
            }
        }
    }

    async fn override_tenant(&self, values: &[&str], raw_host: Option<&str>) -> TenancyResult<TenantSlug> {
        let no_tenant = |detail: String| ResolutionError::NoTenant {
            host: raw_host.map(str::to_string),
            detail,
        };

        let mut slugs = values.iter().map(|v| TenantSlug::parse(v));
        let first = match slugs.next() {
            Some(Ok(slug)) => slug,
            _ => return Err(no_tenant(format!("unusable override {values:?}")).into()),
        };
        if slugs.any(|s| s.as_ref() != Ok(&first)) {
            return Err(no_tenant(format!("conflicting overrides {values:?}")).into());
        }

        self.registered(&first, raw_host).await
    }

    /// Confirm a slug names an active, registered tenant
    async fn registered(&self, slug: &TenantSlug, raw_host: Option<&str>) -> TenancyResult<TenantSlug> {
        let record = self.directory.find(slug).await?;
        match record {
            Some(record) if record.is_active() => Ok(record.slug),
            _ => Err(ResolutionError::NoTenant {
                host: raw_host.map(str::to_string),
                detail: format!("tenant {slug} is not registered or inactive"),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TenancyError;
    use crate::model::TenantStatus;
    use crate::store::InMemoryStore;
    use http::{HeaderMap, HeaderValue, Uri};

    fn slug(s: &str) -> TenantSlug {
        TenantSlug::parse(s).unwrap()
    }

    fn store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.insert_tenant(TenantRecord::active(slug("riverside")));
        store.insert_tenant(TenantRecord::active(slug("lakeside")));
        let mut closed = TenantRecord::active(slug("oldtown"));
        closed.status = TenantStatus::Inactive;
        store.insert_tenant(closed);
        store
    }

    fn config(default: Option<&str>) -> TenancyConfig {
        let mut config = TenancyConfig::default();
        config.hosts.base_domains = vec!["example.com".into(), "localhost".into()];
        config.hosts.fallback_hosts = vec![
            "localhost".into(),
            "*.localhost".into(),
            "*.preview.example.net".into(),
            "example.com".into(),
        ];
        config.default_tenant = default.map(Into::into);
        config
    }

    fn resolver(default: Option<&str>) -> (TenantResolver, Arc<InMemoryStore>) {
        let store = store();
        (TenantResolver::new(&config(default), store.clone()), store)
    }

    fn request(host: Option<&'static str>, uri: &str) -> RequestMeta {
        let mut headers = HeaderMap::new();
        if let Some(host) = host {
            headers.insert("host", HeaderValue::from_static(host));
        }
        let uri: Uri = uri.parse().unwrap();
        RequestMeta::from_http(&headers, &uri, "fr_session")
    }

    #[tokio::test]
    async fn test_registered_subdomain_resolves() {
        let (resolver, _) = resolver(None);
        let ctx = resolver
            .resolve(&request(Some("riverside.example.com"), "/"), ResolveOptions::default())
            .await
            .unwrap();

        assert_eq!(ctx.tenant.as_str(), "riverside");
        assert_eq!(ctx.source, TenantSource::Hostname);
        assert!(!ctx.is_fallback);
        assert_eq!(ctx.hostname.as_deref(), Some("riverside.example.com"));
    }

    #[tokio::test]
    async fn test_override_rejected_on_tenant_host_even_when_matching() {
        let (resolver, _) = resolver(None);
        for uri in ["/?tenant=other", "/?tenant=riverside", "/?tenant="] {
            let err = resolver
                .resolve(&request(Some("riverside.example.com"), uri), ResolveOptions::default())
                .await
                .unwrap_err();
            assert_eq!(err.status(), 403, "{uri}");
            assert!(matches!(err, TenancyError::Resolution(ResolutionError::OverrideRejected { .. })));
        }
    }

    #[tokio::test]
    async fn test_override_rejected_on_unknown_non_fallback_host() {
        let (resolver, _) = resolver(Some("riverside"));
        let err = resolver
            .resolve(&request(Some("shop.other.org"), "/?tenant=riverside"), ResolveOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), 403);
    }

    #[tokio::test]
    async fn test_host_without_subdomain() {
        let (resolver, _) = resolver(Some("riverside"));
        let err = resolver
            .resolve(&request(Some("city.example.org"), "/"), ResolveOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(matches!(err, TenancyError::Resolution(ResolutionError::NoTenant { .. })));
    }

    #[tokio::test]
    async fn test_unregistered_and_inactive_subdomains() {
        let (resolver, _) = resolver(None);
        for host in ["nowhere.example.com", "oldtown.example.com", "www.example.com"] {
            let err = resolver
                .resolve(&request(Some(host), "/"), ResolveOptions::default())
                .await
                .unwrap_err();
            assert_eq!(err.status(), 400, "{host}");
        }
    }

    #[tokio::test]
    async fn test_fallback_without_override_or_default_is_400() {
        let (resolver, _) = resolver(None);
        let err = resolver
            .resolve(&request(Some("localhost:3000"), "/"), ResolveOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn test_fallback_override_and_default() {
        let (resolver, _) = resolver(Some("lakeside"));

        let ctx = resolver
            .resolve(&request(Some("localhost:3000"), "/?tenant=Riverside"), ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(ctx.tenant.as_str(), "riverside");
        assert_eq!(ctx.source, TenantSource::Query);
        assert!(ctx.is_fallback);

        let ctx = resolver
            .resolve(&request(Some("localhost:3000"), "/"), ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(ctx.tenant.as_str(), "lakeside");
        assert_eq!(ctx.source, TenantSource::Env);
    }

    #[tokio::test]
    async fn test_override_disabled_at_call_site_falls_to_default() {
        let (resolver, _) = resolver(Some("lakeside"));
        let ctx = resolver
            .resolve(&request(Some("localhost"), "/?tenant=riverside"), ResolveOptions::STRICT)
            .await
            .unwrap();
        assert_eq!(ctx.tenant.as_str(), "lakeside");
        assert_eq!(ctx.source, TenantSource::Env);
    }

    #[tokio::test]
    async fn test_hostname_wins_on_fallback_host() {
        let (resolver, _) = resolver(Some("lakeside"));
        let ctx = resolver
            .resolve(&request(Some("riverside.localhost:3000"), "/?tenant=lakeside"), ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(ctx.tenant.as_str(), "riverside");
        assert_eq!(ctx.source, TenantSource::Hostname);
        assert!(ctx.is_fallback);
    }

    #[tokio::test]
    async fn test_bad_overrides_fail_closed() {
        let (resolver, _) = resolver(Some("lakeside"));
        for uri in ["/?tenant=nowhere", "/?tenant=oldtown", "/?tenant=bad%20slug", "/?tenant=riverside&tenant=lakeside"] {
            let err = resolver
                .resolve(&request(Some("pr-7.preview.example.net"), uri), ResolveOptions::default())
                .await
                .unwrap_err();
            assert_eq!(err.status(), 400, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_missing_or_malformed_host() {
        let (resolver, _) = resolver(Some("riverside"));
        for host in [None, Some("bad host")] {
            let err = resolver
                .resolve(&request(host, "/"), ResolveOptions::default())
                .await
                .unwrap_err();
            assert_eq!(err.status(), 400);
            assert!(matches!(err, TenancyError::Input(ValidationInputError::MalformedHost(_))));
        }

        let err = resolver
            .resolve(&request(None, "/?tenant=riverside"), ResolveOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), 403);
    }

    #[tokio::test]
    async fn test_lookup_failure_degrades_to_no_tenant() {
        let (resolver, store) = resolver(None);
        store.set_failing(true);
        let err = resolver
            .resolve(&request(Some("riverside.example.com"), "/"), ResolveOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn test_bare_domain_fallback_uses_default() {
        let (resolver, _) = resolver(Some("riverside"));
        let ctx = resolver
            .resolve(&request(Some("example.com"), "/"), ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(ctx.source, TenantSource::Env);
        assert!(ctx.is_fallback);
    }

    #[tokio::test]
    async fn test_forwarded_host_ignored_unless_trusted() {
        let store = store();
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("internal-lb"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("riverside.example.com"));
        let request = RequestMeta::from_http(&headers, &"/".parse().unwrap(), "fr_session");

        let untrusted = TenantResolver::new(&config(None), store.clone());
        assert!(untrusted.resolve(&request, ResolveOptions::default()).await.is_err());

        let mut trusted_config = config(None);
        trusted_config.hosts.trust_forwarded_host = true;
        let trusted = TenantResolver::new(&trusted_config, store);
        let ctx = trusted.resolve(&request, ResolveOptions::default()).await.unwrap();
        assert_eq!(ctx.tenant.as_str(), "riverside");
    }
}
