//! Access Validator
//!
//! Confirms that an authenticated principal's resource belongs to the
//! tenant the request resolved to. Every failure is terminal for the
//! request: callers deny and stop, they never continue with reduced scope.
//!
//! Checks run sequentially, cheapest first, and a failed datastore read is
//! surfaced immediately as a denial rather than retried.

use crate::audit::{AuditEntry, AuditSink, Decision};
use crate::error::{AuthError, AuthorizationError, TenancyError, TenancyResult};
use crate::model::{Business, Principal, TenantSlug};
use crate::request::RequestMeta;
use crate::resolver::{ResolveOptions, TenantContext, TenantResolver};
use crate::session::{SessionRecord, SessionStore};
use crate::store::{AdminDirectory, BusinessStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Successful owner validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedContext {
    pub resource_id: String,
    pub tenant: TenantSlug,
    pub principal_id: String,
    pub resource: Business,
    /// How the tenant was resolved
    pub tenant_context: TenantContext,
}

/// Successful admin validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedAdmin {
    pub admin_id: String,
    pub tenant: TenantSlug,
    pub tenant_context: TenantContext,
}

/// Access validator
pub struct AccessValidator {
    resolver: Arc<TenantResolver>,
    sessions: Arc<dyn SessionStore>,
    businesses: Arc<dyn BusinessStore>,
    admins: Arc<dyn AdminDirectory>,
    audit: Arc<dyn AuditSink>,
}

/// Fields collected while a validation attempt runs, for the audit entry
#[derive(Default)]
struct Attempt {
    principal_id: Option<String>,
    resolved_tenant: Option<String>,
    resource_tenant: Option<String>,
}

impl AccessValidator {
    pub fn new(
        resolver: Arc<TenantResolver>,
        sessions: Arc<dyn SessionStore>,
        businesses: Arc<dyn BusinessStore>,
        admins: Arc<dyn AdminDirectory>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            resolver,
            sessions,
            businesses,
            admins,
            audit,
        }
    }

    /// Validate that the request's owner may act on their business in this tenant
    pub async fn validate_owner(&self, request: &RequestMeta, options: ResolveOptions) -> TenancyResult<ValidatedContext> {
        let mut attempt = Attempt::default();
        let result = self.check_owner(request, options, &mut attempt).await;
        self.audit(request, &attempt, &result);
        result
    }

    /// Validate that the request's admin is a member of this tenant
    pub async fn validate_admin(&self, request: &RequestMeta, options: ResolveOptions) -> TenancyResult<ValidatedAdmin> {
        let mut attempt = Attempt::default();
        let result = self.check_admin(request, options, &mut attempt).await;
        self.audit(request, &attempt, &result);
        result
    }

    /// Live session behind the request's credential
    async fn authenticate(&self, request: &RequestMeta) -> TenancyResult<SessionRecord> {
        let Some(token) = request.session_token.as_deref() else {
            return Err(AuthError::Unauthenticated("no credential".into()).into());
        };
        match self.sessions.lookup(token, Utc::now()).await? {
            Some(session) => Ok(session),
            None => {
                debug!(route = %request.route, "unknown or expired session token");
                Err(AuthError::Unauthenticated("unknown or expired session".into()).into())
            }
        }
    }

    async fn check_owner(
        &self,
        request: &RequestMeta,
        options: ResolveOptions,
        attempt: &mut Attempt,
    ) -> TenancyResult<ValidatedContext> {
        let SessionRecord { principal, .. } = self.authenticate(request).await?;
        attempt.principal_id = Some(principal.id().to_string());

        let tenant_context = self.resolver.resolve(request, options).await?;
        attempt.resolved_tenant = Some(tenant_context.tenant.to_string());

        let user_id = match &principal {
            Principal::Owner { user_id } => user_id,
            Principal::Admin { admin_id, .. } => {
                return Err(AuthorizationError::ResourceNotFound {
                    principal_id: admin_id.clone(),
                    detail: "admin session on owner route".into(),
                }
                .into());
            }
        };

        let business = self.businesses.find_by_owner(user_id).await?.ok_or_else(|| {
            AuthorizationError::ResourceNotFound {
                principal_id: user_id.clone(),
                detail: "principal owns no business".into(),
            }
        })?;
        attempt.resource_tenant = Some(business.tenant.clone());

        if !tenant_context.tenant.matches(&business.tenant) {
            return Err(AuthorizationError::TenantMismatch {
                resolved: tenant_context.tenant.to_string(),
                actual: business.tenant.trim().to_string(),
            }
            .into());
        }

        Ok(ValidatedContext {
            resource_id: business.id.clone(),
            tenant: tenant_context.tenant.clone(),
            principal_id: user_id.clone(),
            resource: business,
            tenant_context,
        })
    }

    async fn check_admin(
        &self,
        request: &RequestMeta,
        options: ResolveOptions,
        attempt: &mut Attempt,
    ) -> TenancyResult<ValidatedAdmin> {
        let SessionRecord { principal, .. } = self.authenticate(request).await?;
        attempt.principal_id = Some(principal.id().to_string());

        let tenant_context = self.resolver.resolve(request, options).await?;
        attempt.resolved_tenant = Some(tenant_context.tenant.to_string());

        let (admin_id, claimed) = match &principal {
            Principal::Admin { admin_id, tenant } => (admin_id, tenant),
            Principal::Owner { user_id } => {
                return Err(AuthorizationError::ResourceNotFound {
                    principal_id: user_id.clone(),
                    detail: "owner session on admin route".into(),
                }
                .into());
            }
        };
        attempt.resource_tenant = Some(claimed.trim().to_string());

        if !tenant_context.tenant.matches(claimed) {
            return Err(AuthorizationError::TenantMismatch {
                resolved: tenant_context.tenant.to_string(),
                actual: claimed.trim().to_string(),
            }
            .into());
        }

        // The claim alone is never enough: membership is re-read every call.
        let record = self.admins.find_admin(admin_id, &tenant_context.tenant).await?;
        match record {
            Some(record) if record.active => Ok(ValidatedAdmin {
                admin_id: record.admin_id,
                tenant: tenant_context.tenant.clone(),
                tenant_context,
            }),
            Some(_) => Err(AuthorizationError::ResourceNotFound {
                principal_id: admin_id.clone(),
                detail: "admin record inactive".into(),
            }
            .into()),
            None => Err(AuthorizationError::ResourceNotFound {
                principal_id: admin_id.clone(),
                detail: format!("no admin record for tenant {}", tenant_context.tenant),
            }
            .into()),
        }
    }

    fn audit<T>(&self, request: &RequestMeta, attempt: &Attempt, result: &TenancyResult<T>) {
        let (decision, reason_code) = match result {
            Ok(_) => (Decision::Allow, "ok"),
            Err(e) => {
                match e {
                    TenancyError::Store(_) => error!(
                        route = %request.route,
                        principal_id = ?attempt.principal_id,
                        error = %e,
                        "access validation failed on datastore error"
                    ),
                    _ => warn!(
                        route = %request.route,
                        host = ?request.host_header,
                        principal_id = ?attempt.principal_id,
                        resolved_tenant = ?attempt.resolved_tenant,
                        resource_tenant = ?attempt.resource_tenant,
                        error = %e,
                        "access denied"
                    ),
                }
                (Decision::Deny, e.audit_reason())
            }
        };

        self.audit.record(AuditEntry {
            timestamp: Utc::now(),
            principal_id: attempt.principal_id.clone(),
            route: request.route.clone(),
            resolved_tenant: attempt.resolved_tenant.clone(),
            resource_tenant: attempt.resource_tenant.clone(),
            decision,
            reason_code: reason_code.to_string(),
        });
    }
}
