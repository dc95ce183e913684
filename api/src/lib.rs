//! Franchise API
//!
//! HTTP surface over the tenancy layer. Every tenant-scoped handler resolves
//! the tenant from the request, validates the principal against it, and only
//! then reads or writes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          FRANCHISE API                              │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                TraceLayer │ CorsLayer                         │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │                                                                     │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────┐  │
//! │  │   context    │  │  directory   │  │ business/me  │  │  admin  │  │
//! │  │  (resolver)  │  │ (resolver +  │  │ (owner check │  │ (admin  │  │
//! │  │              │  │ entitlement) │  │ + entitle.)  │  │  check) │  │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └─────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod extract;
pub mod models;
pub mod routes;
pub mod seed;

use axum::{routing::get, Router};
use franchise_tenant::{
    AccessValidator, AdminDirectory, AuditSink, BusinessStore, InMemoryStore, SessionStore, SubscriptionStore,
    TenancyConfig, TenantDirectory, TenantResolver,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use models::*;

/// Datastore and sink handles the API runs on
#[derive(Clone)]
pub struct Backends {
    /// Tenant registry
    pub tenants: Arc<dyn TenantDirectory>,
    /// Business listings
    pub businesses: Arc<dyn BusinessStore>,
    /// Subscription records
    pub subscriptions: Arc<dyn SubscriptionStore>,
    /// Admin membership
    pub admins: Arc<dyn AdminDirectory>,
    /// Server-side sessions
    pub sessions: Arc<dyn SessionStore>,
    /// Validation audit trail
    pub audit: Arc<dyn AuditSink>,
}

impl Backends {
    /// All datastore roles served by one in-memory store
    pub fn in_memory(store: Arc<InMemoryStore>, sessions: Arc<dyn SessionStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            tenants: store.clone(),
            businesses: store.clone(),
            subscriptions: store.clone(),
            admins: store,
            sessions,
            audit,
        }
    }
}

/// API state
pub struct ApiState {
    /// API version
    pub version: String,
    /// Session cookie name
    pub cookie_name: String,
    /// Tenant resolver, shared with the validator
    pub resolver: Arc<TenantResolver>,
    /// Access validator
    pub validator: AccessValidator,
    /// Business listings
    pub businesses: Arc<dyn BusinessStore>,
    /// Subscription records
    pub subscriptions: Arc<dyn SubscriptionStore>,
}

impl ApiState {
    /// Wire components from validated configuration
    pub fn new(config: &TenancyConfig, backends: Backends) -> Self {
        let resolver = Arc::new(TenantResolver::new(config, backends.tenants));
        let validator = AccessValidator::new(
            resolver.clone(),
            backends.sessions,
            backends.businesses.clone(),
            backends.admins,
            backends.audit,
        );
        Self {
            version: env!("CARGO_PKG_VERSION").into(),
            cookie_name: config.session.cookie_name.clone(),
            resolver,
            validator,
            businesses: backends.businesses,
            subscriptions: backends.subscriptions,
        }
    }
}

/// Build the API router
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

fn api_routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/context", get(routes::context::get_context))
        .route("/directory", get(routes::directory::list_directory))
        .nest("/business", routes::business::router())
        .nest("/admin", routes::admin::router())
}
