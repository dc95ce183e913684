//! Development seed data
//!
//! A JSON document loaded into the in-memory store at startup. Listed
//! principals get a freshly issued session each.

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use franchise_tenant::error::StoreError;
use franchise_tenant::{AdminRecord, Business, InMemoryStore, Principal, SessionStore, Subscription, TenantRecord};
use serde::Deserialize;
use std::path::Path;

/// Seed document
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    /// Added to the tenants from configuration
    pub tenants: Vec<TenantRecord>,
    pub businesses: Vec<Business>,
    pub subscriptions: Vec<Subscription>,
    pub admins: Vec<AdminRecord>,
    /// Principals to issue sessions for
    pub sessions: Vec<Principal>,
}

/// Session issued while seeding
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub principal: Principal,
    pub token: String,
}

impl Seed {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| format!("reading seed file {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing seed file {}", path.display()))
    }

    /// Insert records and issue sessions
    pub async fn apply(
        self,
        store: &InMemoryStore,
        sessions: &dyn SessionStore,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<IssuedSession>, StoreError> {
        for tenant in self.tenants {
            store.insert_tenant(tenant);
        }
        for business in self.businesses {
            store.insert_business(business);
        }
        for subscription in self.subscriptions {
            store.insert_subscription(subscription);
        }
        for admin in self.admins {
            store.insert_admin(admin);
        }

        let mut issued = Vec::with_capacity(self.sessions.len());
        for principal in self.sessions {
            let token = sessions.issue(principal.clone(), ttl, now).await?;
            issued.push(IssuedSession { principal, token });
        }
        Ok(issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use franchise_tenant::{BusinessStore, InMemorySessionStore, TenantDirectory, TenantSlug};

    const SEED: &str = r#"{
        "tenants": [{ "slug": "riverside", "subdomain": "riverside" }],
        "businesses": [{
            "id": "b1", "tenant": "riverside", "owner_id": "u1",
            "status": "claimed", "name": "Corner Bakery"
        }],
        "subscriptions": [{
            "id": "s1", "business_id": "b1", "trial": true,
            "trial_end": "2030-01-01T00:00:00Z", "status": "active",
            "created_at": "2026-01-01T00:00:00Z"
        }],
        "admins": [{ "admin_id": "a1", "tenant": "riverside" }],
        "sessions": [{ "kind": "owner", "user_id": "u1" }]
    }"#;

    #[tokio::test]
    async fn test_apply_seed() {
        let seed: Seed = serde_json::from_str(SEED).unwrap();
        let store = InMemoryStore::new();
        let sessions = InMemorySessionStore::new();

        let issued = seed.apply(&store, &sessions, Duration::hours(1), Utc::now()).await.unwrap();

        assert_eq!(issued.len(), 1);
        assert_eq!(issued[0].principal.id(), "u1");
        assert!(sessions.lookup(&issued[0].token, Utc::now()).await.unwrap().is_some());
        assert!(store.find(&TenantSlug::parse("riverside").unwrap()).await.unwrap().is_some());
        assert!(store.find_by_owner("u1").await.unwrap().is_some());
    }
}
