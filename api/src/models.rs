//! API Models

use franchise_tenant::entitlement::{Badge, EntitlementResult};
use franchise_tenant::model::Business;
use serde::{Deserialize, Serialize};

/// Standard API response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

// ============ Directory ============

/// Public listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub badge: Badge,
    /// Read-only listing, no owner yet
    pub is_claimed: bool,
}

/// Tenant directory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryResponse {
    pub tenant: String,
    pub items: Vec<DirectoryEntry>,
    pub total: usize,
}

// ============ Owner ============

/// Owner view of their business
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessView {
    pub business: Business,
    pub entitlement: EntitlementResult,
}

/// Owner-editable profile fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Billing-gated feature availability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    pub state: String,
    pub analytics: bool,
    pub notifications: bool,
    pub advanced_reporting: bool,
}

// ============ Admin ============

/// Admin listing row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminBusinessRow {
    pub id: String,
    pub name: String,
    pub owner_id: Option<String>,
    pub status: String,
    pub entitlement: EntitlementResult,
}
