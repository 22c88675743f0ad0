//! Request middleware binding the ambient tenant.
//!
//! Every request must carry an `X-Tenant-ID` header; the rest of the request
//! runs inside [`tenant::scope`] so the data gateway sees the tenant without
//! any handler passing it along.

use crate::tenant::{self, TenantId};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub const TENANT_ID_HEADER: &str = "x-tenant-id";

pub async fn require_tenant(request: Request, next: Next) -> Response {
    let tenant = request
        .headers()
        .get(TENANT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(TenantId::from);

    match tenant {
        Some(tenant) => tenant::scope(tenant, next.run(request)).await,
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "X-Tenant-ID header is missing" })),
        )
            .into_response(),
    }
}
