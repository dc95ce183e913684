//! Owner endpoints
//!
//! Every handler validates the session's business against the resolved
//! tenant before touching it. Writes run with overrides disabled.

use crate::extract::Meta;
use crate::models::{BusinessView, FeatureFlags, ProfileUpdate};
use crate::{ApiError, ApiResponse, ApiState};
use axum::routing::get;
use axum::body::Bytes;
use axum::{extract::State, Json, Router};
use chrono::Utc;
use franchise_tenant::entitlement::{self, BillingFeature};
use franchise_tenant::model::Business;
use franchise_tenant::{EntitlementResult, ResolveOptions};
use std::sync::Arc;

const MAX_NAME_LEN: usize = 120;
const MAX_DESCRIPTION_LEN: usize = 2000;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/me", get(get_my_business).put(update_my_business))
        .route("/me/features", get(get_my_features))
}

/// The owner's business with its entitlement state
pub async fn get_my_business(
    State(state): State<Arc<ApiState>>,
    Meta(meta): Meta,
) -> Result<Json<ApiResponse<BusinessView>>, ApiError> {
    let ctx = state
        .validator
        .validate_owner(&meta, ResolveOptions::ALLOW_OVERRIDE)
        .await?;
    let entitlement = entitlement_for(&state, &ctx.resource).await?;
    Ok(Json(ApiResponse::success(BusinessView {
        business: ctx.resource,
        entitlement,
    })))
}

/// Update owner-editable profile fields
pub async fn update_my_business(
    State(state): State<Arc<ApiState>>,
    Meta(meta): Meta,
    body: Bytes,
) -> Result<Json<ApiResponse<BusinessView>>, ApiError> {
    let ctx = state
        .validator
        .validate_owner(&meta, ResolveOptions::STRICT)
        .await?;

    // validate before parsing the body
    let input: ProfileUpdate =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("invalid profile update: {e}")))?;
    let update = check_update(input)?;
    let business = state
        .businesses
        .update_profile(&ctx.resource_id, update.name, update.description)
        .await?;
    tracing::info!(
        business_id = %business.id,
        tenant = %ctx.tenant,
        principal_id = %ctx.principal_id,
        "business profile updated"
    );

    let entitlement = entitlement_for(&state, &business).await?;
    Ok(Json(ApiResponse::success(BusinessView { business, entitlement })))
}

/// Billing-gated features for the owner's business
pub async fn get_my_features(
    State(state): State<Arc<ApiState>>,
    Meta(meta): Meta,
) -> Result<Json<ApiResponse<FeatureFlags>>, ApiError> {
    let ctx = state
        .validator
        .validate_owner(&meta, ResolveOptions::ALLOW_OVERRIDE)
        .await?;
    let result = entitlement_for(&state, &ctx.resource).await?;
    Ok(Json(ApiResponse::success(FeatureFlags {
        state: result.state.as_str().to_string(),
        analytics: result.allows(BillingFeature::Analytics),
        notifications: result.allows(BillingFeature::Notifications),
        advanced_reporting: result.allows(BillingFeature::AdvancedReporting),
    })))
}

async fn entitlement_for(state: &ApiState, business: &Business) -> Result<EntitlementResult, ApiError> {
    let subscription = state.subscriptions.latest_for_business(&business.id).await?;
    Ok(entitlement::compute(business, subscription.as_ref(), Utc::now()))
}

fn check_update(input: ProfileUpdate) -> Result<ProfileUpdate, ApiError> {
    let name = match input.name {
        Some(name) => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ApiError::BadRequest("name must not be empty".into()));
            }
            if name.chars().count() > MAX_NAME_LEN {
                return Err(ApiError::BadRequest(format!("name exceeds {MAX_NAME_LEN} characters")));
            }
            Some(name)
        }
        None => None,
    };

    if let Some(description) = &input.description {
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ApiError::BadRequest(format!(
                "description exceeds {MAX_DESCRIPTION_LEN} characters"
            )));
        }
    }

    Ok(ProfileUpdate {
        name,
        description: input.description,
    })
}
