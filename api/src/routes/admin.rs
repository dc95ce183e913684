//! Tenant admin endpoints

use crate::extract::Meta;
use crate::models::AdminBusinessRow;
use crate::{ApiError, ApiResponse, ApiState};
use axum::routing::get;
use axum::{extract::State, Json, Router};
use chrono::Utc;
use franchise_tenant::{entitlement, ResolveOptions};
use std::sync::Arc;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new().route("/businesses", get(list_businesses))
}

/// Every business in the admin's tenant with its entitlement state
pub async fn list_businesses(
    State(state): State<Arc<ApiState>>,
    Meta(meta): Meta,
) -> Result<Json<ApiResponse<Vec<AdminBusinessRow>>>, ApiError> {
    let admin = state
        .validator
        .validate_admin(&meta, ResolveOptions::STRICT)
        .await?;

    let businesses = state.businesses.list_by_tenant(&admin.tenant).await?;
    let now = Utc::now();
    let mut rows = Vec::with_capacity(businesses.len());
    for business in businesses {
        let subscription = state.subscriptions.latest_for_business(&business.id).await?;
        let entitlement = entitlement::compute(&business, subscription.as_ref(), now);
        rows.push(AdminBusinessRow {
            status: business.status.as_str().to_string(),
            id: business.id,
            name: business.name,
            owner_id: business.owner_id,
            entitlement,
        });
    }

    Ok(Json(ApiResponse::success(rows)))
}
