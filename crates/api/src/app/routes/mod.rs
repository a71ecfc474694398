use axum::{routing::post, Router};

pub mod invoices;
pub mod parties;
pub mod system;

/// Router for all endpoints that need application services.
pub fn router() -> Router {
    Router::new()
        .nest("/invoices", invoices::router())
        .nest("/parties", parties::router())
        .route("/generate-xml", post(invoices::generate_xml))
}
