use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use facturx_core::InvoiceError;
use facturx_infra::InfraError;

/// Every rule violation is a client error; `kind()` becomes the error code.
pub fn invoice_error_to_response(err: InvoiceError) -> axum::response::Response {
    let status = match err {
        InvoiceError::DuplicateInvoiceNumber(_) => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    };
    json_error(status, err.kind(), err.to_string())
}

pub fn infra_error_to_response(err: InfraError) -> axum::response::Response {
    match err {
        InfraError::Domain(err) => invoice_error_to_response(err),
        other => {
            tracing::error!(error = %other, "invoice generation failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                other.to_string(),
            )
        }
    }
}

pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
}

pub fn query_rejection_to_response(rejection: QueryRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_query", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
