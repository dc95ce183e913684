//! Franchise Tenancy Layer
//!
//! Tenant isolation and entitlement for a shared deployment serving many
//! independently run franchise cities.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      FRANCHISE TENANCY LAYER                        │
//! │                                                                     │
//! │   inbound request (Host, ?tenant=, session credential)              │
//! │          │                                                          │
//! │  ┌───────▼──────────────┐     ┌──────────────────────────────────┐  │
//! │  │   TENANT RESOLVER    │◄────│  TENANT DIRECTORY                │  │
//! │  │ hostname > override  │     │  subdomain → slug, active flag   │  │
//! │  │ (fallback) > default │     └──────────────────────────────────┘  │
//! │  └───────┬──────────────┘                                           │
//! │          │ TenantContext                                            │
//! │  ┌───────▼──────────────┐     ┌──────────────────────────────────┐  │
//! │  │   ACCESS VALIDATOR   │◄────│  SESSIONS │ BUSINESSES │ ADMINS  │  │
//! │  │ resource tenant must │     └──────────────────────────────────┘  │
//! │  │ equal resolved tenant│────► AUDIT SINK (one entry per attempt)   │
//! │  └───────┬──────────────┘                                           │
//! │          │ ValidatedContext                                         │
//! │  ┌───────▼──────────────┐                                           │
//! │  │ ENTITLEMENT ENGINE   │  pure: (business, subscription, now)      │
//! │  │ 7 states + flags     │        → EntitlementResult                │
//! │  └──────────────────────┘                                           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

pub mod access;
pub mod audit;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod host;
pub mod model;
pub mod request;
pub mod resolver;
pub mod session;
pub mod store;

pub use access::{AccessValidator, ValidatedAdmin, ValidatedContext};
pub use audit::{AuditEntry, AuditSink, Decision, JsonLinesAuditSink, MemoryAuditSink, TracingAuditSink};
pub use config::{ConfigError, TenancyConfig};
pub use entitlement::{compute, BillingFeature, EntitlementResult, EntitlementState};
pub use error::{TenancyError, TenancyResult};
pub use model::{AdminRecord, Business, BusinessStatus, Principal, Subscription, SubscriptionStatus, TenantRecord, TenantSlug};
pub use request::RequestMeta;
pub use resolver::{ResolveOptions, TenantContext, TenantResolver, TenantSource};
pub use session::{InMemorySessionStore, SessionRecord, SessionStore};
pub use store::{AdminDirectory, BusinessStore, InMemoryStore, SubscriptionStore, TenantDirectory};
