//! Tenant Data Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum slug length (one DNS label)
pub const MAX_SLUG_LEN: usize = 63;

/// Canonical tenant identifier
///
/// Lowercase ASCII alphanumerics and hyphens, 1-63 characters, no leading or
/// trailing hyphen. Parsing trims and lowercases, so two slugs compare equal
/// exactly when their trimmed, case-folded forms do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantSlug(String);

impl TenantSlug {
    /// Parse and normalize a slug
    pub fn parse(raw: &str) -> Result<Self, InvalidSlug> {
        let slug = raw.trim().to_ascii_lowercase();

        if slug.is_empty() || slug.len() > MAX_SLUG_LEN {
            return Err(InvalidSlug(raw.to_string()));
        }
        if slug.starts_with('-') || slug.ends_with('-') {
            return Err(InvalidSlug(raw.to_string()));
        }
        if !slug.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-') {
            return Err(InvalidSlug(raw.to_string()));
        }

        Ok(Self(slug))
    }

    /// Borrow as str
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a raw, possibly unnormalized tenant string
    pub fn matches(&self, raw: &str) -> bool {
        raw.trim().eq_ignore_ascii_case(&self.0)
    }
}

impl fmt::Display for TenantSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantSlug {
    type Error = InvalidSlug;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TenantSlug> for String {
    fn from(slug: TenantSlug) -> Self {
        slug.0
    }
}

/// Slug failed validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid tenant slug {0:?}")]
pub struct InvalidSlug(pub String);

/// Franchise configuration record (1:1 with a tenant)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    /// Canonical tenant slug
    pub slug: TenantSlug,
    /// Subdomain label the franchise is served under
    pub subdomain: String,
    /// City display name
    #[serde(default)]
    pub display_name: String,
    /// Operational status
    #[serde(default)]
    pub status: TenantStatus,
    /// Locale, e.g. `en-US`
    #[serde(default = "default_locale")]
    pub locale: String,
}

impl TenantRecord {
    /// Active record with subdomain equal to the slug
    pub fn active(slug: TenantSlug) -> Self {
        Self {
            subdomain: slug.as_str().to_string(),
            display_name: slug.as_str().to_string(),
            slug,
            status: TenantStatus::Active,
            locale: default_locale(),
        }
    }

    /// Whether the franchise currently serves requests
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

fn default_locale() -> String {
    "en-US".to_string()
}

/// Franchise status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    #[default]
    Active,
    Inactive,
}

/// Business listing status as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BusinessStatus {
    Unclaimed,
    PendingClaim,
    Claimed,
    /// Anything the datastore holds that this layer does not model
    Other(String),
}

impl BusinessStatus {
    /// Status that allows the UNCLAIMED entitlement state
    pub fn is_unclaimed(&self) -> bool {
        matches!(self, Self::Unclaimed | Self::PendingClaim)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Unclaimed => "unclaimed",
            Self::PendingClaim => "pending_claim",
            Self::Claimed => "claimed",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for BusinessStatus {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unclaimed" => Self::Unclaimed,
            "pending_claim" => Self::PendingClaim,
            "claimed" => Self::Claimed,
            _ => Self::Other(raw.to_string()),
        }
    }
}

impl From<String> for BusinessStatus {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<BusinessStatus> for String {
    fn from(status: BusinessStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Business resource owned by at most one principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    /// Business ID
    pub id: String,
    /// Owning tenant, set at creation and never changed
    pub tenant: String,
    /// Owning principal, if claimed
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Listing status
    pub status: BusinessStatus,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Free-form profile text, editable by the owner
    #[serde(default)]
    pub description: String,
}

/// Subscription status as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Canceled,
    Other(String),
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Canceled => "canceled",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for SubscriptionStatus {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "paused" => Self::Paused,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::Other(raw.to_string()),
        }
    }
}

impl From<String> for SubscriptionStatus {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<SubscriptionStatus> for String {
    fn from(status: SubscriptionStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Latest subscription record for a business
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub business_id: String,
    /// Trial flag
    #[serde(default)]
    pub trial: bool,
    #[serde(default)]
    pub trial_end: Option<DateTime<Utc>>,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
    /// Billing-provider tier identifier
    #[serde(default)]
    pub tier_id: Option<String>,
    /// Human-readable tier name
    #[serde(default)]
    pub tier_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Authenticated actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    /// Business owner
    Owner { user_id: String },
    /// Tenant admin; `tenant` is a claim re-verified on every call
    Admin { admin_id: String, tenant: String },
}

impl Principal {
    /// Stable identifier for logs and audit entries
    pub fn id(&self) -> &str {
        match self {
            Self::Owner { user_id } => user_id,
            Self::Admin { admin_id, .. } => admin_id,
        }
    }
}

/// Admin membership record, the source of truth for admin tenant scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRecord {
    pub admin_id: String,
    pub tenant: TenantSlug,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_normalization() {
        let slug = TenantSlug::parse("  Riverside ").unwrap();
        assert_eq!(slug.as_str(), "riverside");
        assert!(slug.matches("RIVERSIDE "));
        assert!(!slug.matches("lakeside"));
    }

    #[test]
    fn test_slug_rejects_bad_input() {
        assert!(TenantSlug::parse("").is_err());
        assert!(TenantSlug::parse("-river").is_err());
        assert!(TenantSlug::parse("river-").is_err());
        assert!(TenantSlug::parse("river side").is_err());
        assert!(TenantSlug::parse("river.side").is_err());
        assert!(TenantSlug::parse(&"a".repeat(64)).is_err());
        assert!(TenantSlug::parse("st-louis-2").is_ok());
    }

    #[test]
    fn test_status_parsing_keeps_unknown_values() {
        assert_eq!(BusinessStatus::from("pending_claim"), BusinessStatus::PendingClaim);
        assert_eq!(
            BusinessStatus::from("archived"),
            BusinessStatus::Other("archived".into())
        );
        assert_eq!(SubscriptionStatus::from("Cancelled"), SubscriptionStatus::Canceled);
        assert_eq!(
            SubscriptionStatus::from("past_due"),
            SubscriptionStatus::Other("past_due".into())
        );
    }

    #[test]
    fn test_business_deserializes_from_raw_strings() {
        let business: Business = serde_json::from_value(serde_json::json!({
            "id": "b1",
            "tenant": "riverside",
            "status": "unclaimed",
        }))
        .unwrap();

        assert_eq!(business.owner_id, None);
        assert!(business.status.is_unclaimed());
    }
}
