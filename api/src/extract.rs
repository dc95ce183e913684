//! Request extractors
//!
//! Build the tenancy layer's view of a request from axum request parts.

use crate::ApiState;
use axum::{
    async_trait,
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
};
use franchise_tenant::RequestMeta;
use std::convert::Infallible;
use std::sync::Arc;

/// Request metadata with a `METHOD /path` route label
pub struct Meta(pub RequestMeta);

#[async_trait]
impl FromRequestParts<Arc<ApiState>> for Meta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<ApiState>) -> Result<Self, Self::Rejection> {
        // nested routers see a prefix-stripped URI
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| &original.0)
            .unwrap_or(&parts.uri);
        let route = format!("{} {}", parts.method, uri.path());
        Ok(Self(RequestMeta::from_http(&parts.headers, uri, &state.cookie_name).with_route(route)))
    }
}
