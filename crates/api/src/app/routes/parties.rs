use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use facturx_invoicing::PartyRole;

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/sellers", get(list_sellers))
        .route("/buyers", get(list_buyers))
}

pub async fn list_sellers(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    list(&services, PartyRole::Seller)
}

pub async fn list_buyers(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    list(&services, PartyRole::Buyer)
}

fn list(services: &AppServices, role: PartyRole) -> axum::response::Response {
    match services.history().list(role) {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::infra_error_to_response(e),
    }
}
