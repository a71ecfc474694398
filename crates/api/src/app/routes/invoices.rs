use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Query},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Datelike;

use facturx_infra::{GeneratedDocument, InvoiceSerializer};
use facturx_invoicing::InvoiceNumber;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

const DOCUMENT_ID_HEADER: HeaderName = HeaderName::from_static("x-document-id");
const INVOICE_NUMBER_HEADER: HeaderName = HeaderName::from_static("x-invoice-number");

pub fn router() -> Router {
    Router::new()
        .route("/next-number", get(next_number))
        .route("/compute", post(compute_invoice))
}

/// Suggest the next number for a year. Nothing is reserved.
pub async fn next_number(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::NextNumberQuery>, QueryRejection>,
) -> axum::response::Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return errors::query_rejection_to_response(rejection),
    };
    let year = query.year.unwrap_or_else(|| services.today().year());

    match services.pipeline().suggest_number(year) {
        Ok(invoice_number) => (
            StatusCode::OK,
            Json(dto::NextNumberResponse { invoice_number }),
        )
            .into_response(),
        Err(e) => errors::infra_error_to_response(e),
    }
}

/// Compute and validate without generating anything or touching the counter.
pub async fn compute_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::InvoiceRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let number = match body.explicit_number() {
        Some(n) => n,
        None => match services.pipeline().suggest_number(body.issue_date.year()) {
            Ok(n) => n,
            Err(e) => return errors::infra_error_to_response(e),
        },
    };
    let draft = match body.into_draft(number) {
        Ok(d) => d,
        Err(e) => return errors::invoice_error_to_response(e),
    };

    match draft.finalize(services.today(), services.pipeline().policy()) {
        Ok(invoice) => (
            StatusCode::OK,
            Json(dto::computed_response(&draft, &invoice)),
        )
            .into_response(),
        Err(e) => errors::invoice_error_to_response(e),
    }
}

/// Produce the Factur-X XML as a download.
///
/// Without an `id` the invoice gets the next free number of its issue year;
/// the number is only taken once the document was built.
pub async fn generate_xml(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::InvoiceRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let explicit = body.explicit_number();
    let today = services.today();
    let pipeline = services.pipeline();

    // Unnumbered drafts are numbered by the pipeline.
    let number = explicit.clone().unwrap_or_else(|| InvoiceNumber::new(""));
    let draft = match body.into_draft(number) {
        Ok(d) => d,
        Err(e) => return errors::invoice_error_to_response(e),
    };
    let generated = match explicit {
        Some(_) => pipeline.generate(&draft, today),
        None => pipeline.generate_with_next_number(&draft, today),
    };

    match generated {
        Ok(doc) => xml_download(doc, pipeline.serializer()),
        Err(e) => errors::infra_error_to_response(e),
    }
}

fn xml_download(
    doc: GeneratedDocument,
    serializer: &dyn InvoiceSerializer,
) -> axum::response::Response {
    let disposition = format!("attachment; filename={}", serializer.file_name());
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(serializer.media_type())),
        (header::CONTENT_DISPOSITION, header_value(&disposition)),
        (DOCUMENT_ID_HEADER, header_value(&doc.document_id.to_string())),
        (INVOICE_NUMBER_HEADER, header_value(doc.invoice.number().as_str())),
    ];
    (StatusCode::OK, headers, doc.xml).into_response()
}

/// Header value for text that may contain bytes not allowed in headers.
fn header_value(text: &str) -> HeaderValue {
    HeaderValue::from_str(text).unwrap_or_else(|_| {
        let ascii: String = text.chars().filter(|c| c.is_ascii_graphic() || *c == ' ').collect();
        HeaderValue::from_str(&ascii).unwrap_or_else(|_| HeaderValue::from_static(""))
    })
}
