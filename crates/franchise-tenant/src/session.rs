//! Server-side sessions
//!
//! Clients hold an opaque random token. The store keeps only its SHA-256
//! digest, so a leaked session table cannot be replayed. Nothing in the
//! token itself is trusted.

use crate::error::StoreError;
use crate::model::Principal;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Random bytes per token
const TOKEN_BYTES: usize = 32;

/// Stored session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub principal: Principal,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Session persistence
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session and return the client token
    async fn issue(&self, principal: Principal, ttl: Duration, now: DateTime<Utc>) -> Result<String, StoreError>;

    /// Live session for a token; expired sessions are dropped
    async fn lookup(&self, token: &str, now: DateTime<Utc>) -> Result<Option<SessionRecord>, StoreError>;

    /// Invalidate a token
    async fn revoke(&self, token: &str) -> Result<(), StoreError>;
}

/// Generate a fresh opaque token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Digest under which a token is stored
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// In-memory session store
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
    failing: AtomicBool,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, live or not
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Make every call fail as if the backend were down
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory session store set to fail".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn issue(&self, principal: Principal, ttl: Duration, now: DateTime<Utc>) -> Result<String, StoreError> {
        self.check()?;
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| StoreError::Rejected(format!("session ttl {ttl} out of range")))?;
        let token = generate_token();
        let record = SessionRecord {
            principal,
            issued_at: now,
            expires_at,
        };

        let mut sessions = self.sessions.write();
        sessions.retain(|_, existing| existing.is_live(now));
        sessions.insert(token_digest(&token), record);
        Ok(token)
    }

    async fn lookup(&self, token: &str, now: DateTime<Utc>) -> Result<Option<SessionRecord>, StoreError> {
        self.check()?;
        let digest = token_digest(token);
        let record = self.sessions.read().get(&digest).cloned();

        match record {
            Some(record) if record.is_live(now) => Ok(Some(record)),
            Some(_) => {
                self.sessions.write().remove(&digest);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        self.check()?;
        self.sessions.write().remove(&token_digest(token));
        Ok(())
    }
}
