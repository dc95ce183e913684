//! Public business directory for the resolved tenant

use crate::extract::Meta;
use crate::models::{DirectoryEntry, DirectoryResponse};
use crate::{ApiError, ApiResponse, ApiState};
use axum::{extract::State, Json};
use chrono::Utc;
use franchise_tenant::{entitlement, ResolveOptions};
use std::sync::Arc;

/// Listings visible to end users, with their badges
pub async fn list_directory(
    State(state): State<Arc<ApiState>>,
    Meta(meta): Meta,
) -> Result<Json<ApiResponse<DirectoryResponse>>, ApiError> {
    let context = state.resolver.resolve(&meta, ResolveOptions::ALLOW_OVERRIDE).await?;
    let businesses = state.businesses.list_by_tenant(&context.tenant).await?;

    let now = Utc::now();
    let mut items = Vec::with_capacity(businesses.len());
    for business in businesses {
        let subscription = state.subscriptions.latest_for_business(&business.id).await?;
        let result = entitlement::compute(&business, subscription.as_ref(), now);
        if !result.should_show_to_users {
            continue;
        }
        items.push(DirectoryEntry {
            id: business.id,
            name: business.name,
            description: business.description,
            badge: result.badge,
            is_claimed: result.is_claimed,
        });
    }

    Ok(Json(ApiResponse::success(DirectoryResponse {
        tenant: context.tenant.to_string(),
        total: items.len(),
        items,
    })))
}
