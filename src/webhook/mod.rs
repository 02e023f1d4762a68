//! Mutating Admission Webhook
//!
//! Intercepts Ingress creation and applies the default annotations defined
//! in the policy table. The router exposes:
//! - `POST /mutate` - mutate Ingresses (see [`ingress`])
//! - `POST /validate` - not implemented; answers with an empty review
//! - `GET /healthz` - liveness probe

pub mod ingress;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use kube::core::{
    admission::{AdmissionRequest, AdmissionResponse, AdmissionReview},
    DynamicObject, TypeMeta,
};
use tracing::error;

use crate::policy::PolicyTable;
use crate::{system_namespaces, Error};

/// Media type the API server uses for AdmissionReview bodies
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// AdmissionReview API version spoken on the wire
pub const ADMISSION_API_VERSION: &str = "admission.k8s.io/v1";

/// Shared state for webhook handlers
#[derive(Clone, Debug)]
pub struct WebhookState {
    /// Policy snapshot loaded at startup
    pub policy: Arc<PolicyTable>,
    /// Namespaces whose objects are never mutated
    pub excluded_namespaces: Vec<String>,
}

impl WebhookState {
    /// Create webhook state with the default system namespace exclusions
    pub fn new(policy: PolicyTable) -> Self {
        Self {
            policy: Arc::new(policy),
            excluded_namespaces: system_namespaces::all()
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Transport-level rejection, returned before any review is decoded
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// Request had no body
    #[error("empty body")]
    EmptyBody,

    /// Request was not `application/json`
    #[error("invalid Content-Type, expect `application/json`")]
    UnsupportedMediaType(String),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::EmptyBody => StatusCode::BAD_REQUEST,
            WebhookError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        };

        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}

/// Create the webhook router
pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/mutate", post(ingress::mutate_handler))
        .route("/validate", post(validate_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

/// Reject bodies the API server would never send
fn check_transport(headers: &HeaderMap, body: &[u8]) -> Result<(), WebhookError> {
    if body.is_empty() {
        error!("empty body");
        return Err(WebhookError::EmptyBody);
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    if !media_type.eq_ignore_ascii_case(JSON_CONTENT_TYPE) {
        error!(content_type = %content_type, "Unsupported Content-Type, expect application/json");
        return Err(WebhookError::UnsupportedMediaType(content_type.to_string()));
    }

    Ok(())
}

/// Decode an AdmissionReview body into its request
pub fn decode_review(body: &[u8]) -> crate::Result<AdmissionRequest<DynamicObject>> {
    let review: AdmissionReview<DynamicObject> =
        serde_json::from_slice(body).map_err(|e| Error::decode(e.to_string()))?;
    review
        .try_into()
        .map_err(|e: kube::core::admission::ConvertAdmissionReviewError| {
            Error::decode(e.to_string())
        })
}

/// A not-allowed review for a body that could not be decoded.
///
/// There is no request to copy the review version from, so it is pinned to
/// `admission.k8s.io/v1`.
pub(crate) fn invalid_review(message: String) -> AdmissionReview<DynamicObject> {
    let mut response = AdmissionResponse::invalid(message);
    response.types = TypeMeta {
        api_version: ADMISSION_API_VERSION.to_string(),
        kind: "AdmissionReview".to_string(),
    };
    response.into_review()
}

/// Handle `POST /validate`.
///
/// Validation is not offered; a decodable review gets an envelope with no
/// response, an undecodable one gets the decode error.
async fn validate_handler(
    State(_state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, WebhookError> {
    check_transport(&headers, &body)?;

    match decode_review(&body) {
        Ok(request) => {
            error!(uid = %request.uid, "Not set up to do validation");
            Ok(Json(serde_json::json!({
                "apiVersion": ADMISSION_API_VERSION,
                "kind": "AdmissionReview",
            }))
            .into_response())
        }
        Err(e) => {
            error!(error = %e, "Can't decode body");
            Ok(Json(invalid_review(e.to_string())).into_response())
        }
    }
}
