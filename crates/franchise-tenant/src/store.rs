//! Datastore seam
//!
//! The tenancy layer only reads. Writes happen in route handlers once
//! validation has succeeded.

use crate::error::StoreError;
use crate::model::{AdminRecord, Business, Subscription, TenantRecord, TenantSlug};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Store result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Registered franchises
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Tenant served under a subdomain label
    async fn find_by_subdomain(&self, subdomain: &str) -> StoreResult<Option<TenantRecord>>;

    /// Tenant by slug
    async fn find(&self, slug: &TenantSlug) -> StoreResult<Option<TenantRecord>>;
}

/// Business listings
#[async_trait]
pub trait BusinessStore: Send + Sync {
    /// The business owned by a principal, if any
    async fn find_by_owner(&self, owner_id: &str) -> StoreResult<Option<Business>>;

    /// Business by id, in any tenant
    async fn get(&self, id: &str) -> StoreResult<Option<Business>>;

    async fn list_by_tenant(&self, tenant: &TenantSlug) -> StoreResult<Vec<Business>>;

    /// Update owner-editable fields; the tenant is never touched
    async fn update_profile(&self, id: &str, name: Option<String>, description: Option<String>) -> StoreResult<Business>;
}

/// Subscription records
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Most recently created subscription for a business
    async fn latest_for_business(&self, business_id: &str) -> StoreResult<Option<Subscription>>;
}

/// Admin membership, the source of truth for admin scope
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    /// Admin record for exactly this tenant
    async fn find_admin(&self, admin_id: &str, tenant: &TenantSlug) -> StoreResult<Option<AdminRecord>>;
}

/// In-memory datastore (development and tests)
#[derive(Default)]
pub struct InMemoryStore {
    tenants: RwLock<HashMap<TenantSlug, TenantRecord>>,
    businesses: RwLock<HashMap<String, Business>>,
    subscriptions: RwLock<Vec<Subscription>>,
    admins: RwLock<Vec<AdminRecord>>,
    failing: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_tenant(&self, record: TenantRecord) {
        self.tenants.write().insert(record.slug.clone(), record);
    }

    pub fn insert_business(&self, business: Business) {
        self.businesses.write().insert(business.id.clone(), business);
    }

    pub fn insert_subscription(&self, subscription: Subscription) {
        self.subscriptions.write().push(subscription);
    }

    pub fn insert_admin(&self, admin: AdminRecord) {
        self.admins.write().push(admin);
    }

    /// Make every read fail until switched back
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store set to fail".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TenantDirectory for InMemoryStore {
    async fn find_by_subdomain(&self, subdomain: &str) -> StoreResult<Option<TenantRecord>> {
        self.check()?;
        Ok(self
            .tenants
            .read()
            .values()
            .find(|t| t.subdomain.eq_ignore_ascii_case(subdomain.trim()))
            .cloned())
    }

    async fn find(&self, slug: &TenantSlug) -> StoreResult<Option<TenantRecord>> {
        self.check()?;
        Ok(self.tenants.read().get(slug).cloned())
    }
}

#[async_trait]
impl BusinessStore for InMemoryStore {
    async fn find_by_owner(&self, owner_id: &str) -> StoreResult<Option<Business>> {
        self.check()?;
        Ok(self
            .businesses
            .read()
            .values()
            .find(|b| b.owner_id.as_deref() == Some(owner_id))
            .cloned())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Business>> {
        self.check()?;
        Ok(self.businesses.read().get(id).cloned())
    }

    async fn list_by_tenant(&self, tenant: &TenantSlug) -> StoreResult<Vec<Business>> {
        self.check()?;
        let mut list: Vec<_> = self
            .businesses
            .read()
            .values()
            .filter(|b| tenant.matches(&b.tenant))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn update_profile(&self, id: &str, name: Option<String>, description: Option<String>) -> StoreResult<Business> {
        self.check()?;
        let mut businesses = self.businesses.write();
        let business = businesses
            .get_mut(id)
            .ok_or_else(|| StoreError::Unavailable(format!("business {id} vanished")))?;
        if let Some(name) = name {
            business.name = name;
        }
        if let Some(description) = description {
            business.description = description;
        }
        Ok(business.clone())
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryStore {
    async fn latest_for_business(&self, business_id: &str) -> StoreResult<Option<Subscription>> {
        self.check()?;
        Ok(self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.business_id == business_id)
            .max_by_key(|s| s.created_at)
            .cloned())
    }
}

#[async_trait]
impl AdminDirectory for InMemoryStore {
    async fn find_admin(&self, admin_id: &str, tenant: &TenantSlug) -> StoreResult<Option<AdminRecord>> {
        self.check()?;
        Ok(self
            .admins
            .read()
            .iter()
            .find(|a| a.admin_id == admin_id && a.tenant == *tenant)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BusinessStatus, SubscriptionStatus};
    use chrono::{Duration, Utc};

    fn slug(s: &str) -> TenantSlug {
        TenantSlug::parse(s).unwrap()
    }

    fn business(id: &str, tenant: &str, owner: Option<&str>) -> Business {
        Business {
            id: id.into(),
            tenant: tenant.into(),
            owner_id: owner.map(Into::into),
            status: BusinessStatus::Claimed,
            name: id.into(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_tenant_lookup() {
        let store = InMemoryStore::new();
        let mut record = TenantRecord::active(slug("riverside"));
        record.subdomain = "river".into();
        store.insert_tenant(record);

        assert!(store.find_by_subdomain("RIVER").await.unwrap().is_some());
        assert!(store.find_by_subdomain("riverside").await.unwrap().is_none());
        assert!(store.find(&slug("riverside")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_business_queries() {
        let store = InMemoryStore::new();
        store.insert_business(business("b2", "riverside", Some("u2")));
        store.insert_business(business("b1", "Riverside ", Some("u1")));
        store.insert_business(business("b3", "lakeside", None));

        let owned = store.find_by_owner("u1").await.unwrap().unwrap();
        assert_eq!(owned.id, "b1");
        assert!(store.find_by_owner("nobody").await.unwrap().is_none());
        assert_eq!(store.get("b3").await.unwrap().unwrap().owner_id, None);
        assert!(store.get("b9").await.unwrap().is_none());

        let listed = store.list_by_tenant(&slug("riverside")).await.unwrap();
        assert_eq!(listed.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), vec!["b1", "b2"]);

        let updated = store
            .update_profile("b1", None, Some("Fresh bread".into()))
            .await
            .unwrap();
        assert_eq!(updated.description, "Fresh bread");
        assert_eq!(updated.tenant, "Riverside ");
    }

    #[tokio::test]
    async fn test_latest_subscription_wins() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        for (id, age) in [("old", 10), ("new", 1)] {
            store.insert_subscription(Subscription {
                id: id.into(),
                business_id: "b1".into(),
                trial: false,
                trial_end: None,
                status: SubscriptionStatus::Active,
                current_period_end: None,
                tier_id: None,
                tier_name: None,
                created_at: now - Duration::days(age),
            });
        }

        let latest = store.latest_for_business("b1").await.unwrap().unwrap();
        assert_eq!(latest.id, "new");
    }

    #[tokio::test]
    async fn test_admin_scoped_to_tenant() {
        let store = InMemoryStore::new();
        store.insert_admin(AdminRecord {
            admin_id: "a1".into(),
            tenant: slug("riverside"),
            active: true,
        });

        assert!(store.find_admin("a1", &slug("riverside")).await.unwrap().is_some());
        assert!(store.find_admin("a1", &slug("lakeside")).await.unwrap().is_none());
    }

    #[test]
    fn test_failure_switch() {
        let store = InMemoryStore::new();
        store.set_failing(true);
        let result = tokio_test::block_on(store.find(&slug("riverside")));
        assert!(matches!(result, Err(StoreError::Unavailable(_))));

        store.set_failing(false);
        assert!(tokio_test::block_on(store.find(&slug("riverside"))).unwrap().is_none());
    }
}
