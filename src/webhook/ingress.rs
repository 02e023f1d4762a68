//! Ingress Mutation Webhook
//!
//! Handles AdmissionReview requests for Ingress resources, adding the
//! default annotations configured for the Ingress name.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::{
    admission::{AdmissionRequest, AdmissionResponse, AdmissionReview},
    DynamicObject,
};
use tracing::{debug, error, info};

use crate::engine::ObjectDescriptor;
use crate::patch::build_patch;
use crate::{Error, INGRESS_KIND};

use super::{check_transport, decode_review, invalid_review, WebhookError, WebhookState};

/// Handle mutating admission review for Ingresses
///
/// This handler:
/// 1. Rejects empty or non-JSON bodies at the transport level
/// 2. Decodes the AdmissionReview, answering undecodable ones as not allowed
/// 3. Runs the decision engine on the embedded Ingress
/// 4. Returns the review with a JSON patch when defaults apply
pub async fn mutate_handler(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AdmissionReview<DynamicObject>>, WebhookError> {
    check_transport(&headers, &body)?;

    let request = match decode_review(&body) {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Can't decode body");
            return Ok(Json(invalid_review(e.to_string())));
        }
    };

    let response = mutate_ingress(&state, &request);
    Ok(Json(response.into_review()))
}

/// Read the metadata of the embedded Ingress.
///
/// Any Ingress API version is accepted (`networking.k8s.io/v1`, `v1beta1`,
/// `extensions/v1beta1`); only metadata is needed. The object must still
/// call itself an Ingress and carry an object-shaped `spec` if it has one.
pub fn parse_ingress(obj: &DynamicObject) -> crate::Result<&ObjectMeta> {
    if let Some(types) = &obj.types {
        if types.kind != INGRESS_KIND {
            return Err(Error::unmarshal(format!(
                "expected kind {INGRESS_KIND}, got {} ({})",
                types.kind, types.api_version
            )));
        }
    }

    match obj.data.get("spec") {
        None | Some(serde_json::Value::Object(_)) => Ok(&obj.metadata),
        Some(other) => Err(Error::unmarshal(format!(
            "invalid Ingress spec: expected an object, got {other}"
        ))),
    }
}

/// Process a single Ingress mutation request
pub fn mutate_ingress(
    state: &WebhookState,
    request: &AdmissionRequest<DynamicObject>,
) -> AdmissionResponse {
    let uid = &request.uid;

    info!(
        uid = %uid,
        kind = %request.kind.kind,
        namespace = ?request.namespace,
        name = %request.name,
        operation = ?request.operation,
        user = ?request.user_info.username,
        "Mutating AdmissionReview"
    );

    if request.kind.kind != INGRESS_KIND {
        debug!(uid = %uid, kind = %request.kind.kind, "Not an Ingress, allowing unchanged");
        return AdmissionResponse::from(request);
    }

    let obj = match &request.object {
        Some(obj) => obj,
        None => {
            debug!(uid = %uid, "No Ingress object in request, allowing unchanged");
            return AdmissionResponse::from(request);
        }
    };

    let metadata = match parse_ingress(obj) {
        Ok(metadata) => metadata,
        Err(e) => {
            error!(uid = %uid, error = %e, "Could not unmarshal raw object");
            return AdmissionResponse::from(request).deny(e.to_string());
        }
    };

    let object = ObjectDescriptor::from_metadata(metadata, request.namespace.as_deref());

    if !object.should_mutate(&state.excluded_namespaces, &state.policy) {
        info!(
            uid = %uid,
            namespace = %object.namespace,
            name = %object.name,
            "Skipping mutation due to policy check"
        );
        return AdmissionResponse::from(request);
    }

    let patch = build_patch(&object.name, &object.annotations, &state.policy);

    info!(
        uid = %uid,
        namespace = %object.namespace,
        name = %object.name,
        patch_ops = patch.0.len(),
        "Applying default annotations to Ingress"
    );

    match AdmissionResponse::from(request).with_patch(patch) {
        Ok(response) => response,
        Err(e) => {
            error!(uid = %uid, error = %e, "Failed to serialize patch");
            AdmissionResponse::from(request).deny(format!("patch serialization error: {e}"))
        }
    }
}
