//! Resolved tenant context

use crate::extract::Meta;
use crate::{ApiError, ApiResponse, ApiState};
use axum::{extract::State, Json};
use franchise_tenant::{ResolveOptions, TenantContext};
use std::sync::Arc;

/// Which tenant this request belongs to, and how that was decided
pub async fn get_context(
    State(state): State<Arc<ApiState>>,
    Meta(meta): Meta,
) -> Result<Json<ApiResponse<TenantContext>>, ApiError> {
    let context = state.resolver.resolve(&meta, ResolveOptions::ALLOW_OVERRIDE).await?;
    Ok(Json(ApiResponse::success(context)))
}
