//! Error taxonomy for tenant resolution and access validation
//!
//! `Display` output carries full diagnostics and is meant for server-side
//! logs only. Anything that reaches a client goes through
//! [`TenancyError::public_message`].

use thiserror::Error;

/// Tenant could not be derived for the request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// Nothing resolvable: no tenant subdomain, no usable override, no default
    #[error("no tenant resolvable for host {host:?}: {detail}")]
    NoTenant {
        /// Attempted hostname, if any
        host: Option<String>,
        /// What was tried
        detail: String,
    },

    /// Client supplied a tenant override on a real tenant host
    #[error("tenant override {value:?} rejected on non-fallback host {host:?}")]
    OverrideRejected {
        /// Attempted hostname, if any
        host: Option<String>,
        /// The override value as sent
        value: String,
    },
}

/// Principal could not be authenticated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No session, or the session is unknown or expired
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
}

/// Principal is authenticated but may not touch the resource
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// Resource (or admin claim) belongs to a different tenant
    #[error("tenant mismatch: resolved {resolved}, actual {actual}")]
    TenantMismatch {
        /// Tenant the request resolved to
        resolved: String,
        /// Tenant the resource or claim belongs to
        actual: String,
    },

    /// Resource not found or not owned; never distinguished to the client
    #[error("resource not found for principal {principal_id}: {detail}")]
    ResourceNotFound {
        /// Principal that asked
        principal_id: String,
        /// Server-side reason
        detail: String,
    },
}

/// Request input could not be interpreted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationInputError {
    /// Host header missing or not a valid hostname
    #[error("malformed host {0:?}")]
    MalformedHost(Option<String>),
}

/// Datastore failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend unavailable or query failed
    #[error("datastore unavailable: {0}")]
    Unavailable(String),

    /// Write refused because a value is out of range
    #[error("datastore write rejected: {0}")]
    Rejected(String),
}

/// Top-level error for the tenancy layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TenancyError {
    /// Tenant resolution failed
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Authentication failed
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Authorization failed
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// Malformed input
    #[error(transparent)]
    Input(#[from] ValidationInputError),

    /// Datastore failure, surfaced as a denial
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TenancyError {
    /// HTTP status for this error
    pub fn status(&self) -> u16 {
        match self {
            Self::Resolution(ResolutionError::NoTenant { .. }) => 400,
            Self::Resolution(ResolutionError::OverrideRejected { .. }) => 403,
            Self::Auth(_) => 401,
            Self::Authorization(_) => 403,
            Self::Input(_) => 400,
            Self::Store(_) => 500,
        }
    }

    /// Stable machine-readable reason returned in API errors
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Resolution(ResolutionError::NoTenant { .. }) => "no_tenant",
            Self::Resolution(ResolutionError::OverrideRejected { .. }) => "override_rejected",
            Self::Auth(AuthError::Unauthenticated(_)) => "unauthenticated",
            // Mismatch and not-found share one public code so a response
            // never reveals whether the resource exists.
            Self::Authorization(_) => "access_denied",
            Self::Input(ValidationInputError::MalformedHost(_)) => "malformed_host",
            Self::Store(_) => "internal_error",
        }
    }

    /// Reason recorded server-side, more precise than [`Self::reason_code`]
    pub fn audit_reason(&self) -> &'static str {
        match self {
            Self::Authorization(AuthorizationError::TenantMismatch { .. }) => "tenant_mismatch",
            Self::Authorization(AuthorizationError::ResourceNotFound { .. }) => "resource_not_found",
            Self::Store(_) => "datastore_error",
            other => other.reason_code(),
        }
    }

    /// Generic, non-leaking message safe to return to clients
    pub fn public_message(&self) -> &'static str {
        match self.status() {
            400 => "City not detected",
            401 => "Authentication required",
            403 => "Access denied",
            _ => "Internal error",
        }
    }
}

/// Result type for the tenancy layer
pub type TenancyResult<T> = Result<T, TenancyError>;
