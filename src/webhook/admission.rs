use super::WebhookState;
use crate::{
    consts::GROUP,
    conversion::FUNCTION_KIND,
    crds::v1alpha2::{self, Function},
    defaulting, validation,
};
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use kube::{
    api::DynamicObject,
    core::admission::{
        AdmissionRequest, AdmissionResponse, AdmissionReview, ConvertAdmissionReviewError,
        Operation, SerializePatchError,
    },
};
use std::sync::Arc;
use thiserror::Error as ThisError;
use tracing::{info, warn};

type Review = AdmissionReview<DynamicObject>;
type Rejected = (StatusCode, String);

/// Why an admission request could not be answered with a verdict.
#[derive(ThisError, Debug)]
enum AdmissionError {
    #[error("invalid kind: {group}/{version}, {kind}")]
    InvalidKind {
        group: String,
        version: String,
        kind: String,
    },
    #[error("invalid version: {0}")]
    InvalidVersion(String),
    #[error("request has no object")]
    MissingObject,
    #[error("failed to decode function: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode function: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to serialize patch: {0}")]
    Patch(#[source] SerializePatchError),
}

impl AdmissionError {
    fn status(&self) -> StatusCode {
        match self {
            AdmissionError::InvalidKind { .. }
            | AdmissionError::InvalidVersion(_)
            | AdmissionError::MissingObject
            | AdmissionError::Decode(_) => StatusCode::BAD_REQUEST,
            AdmissionError::Encode(_) | AdmissionError::Patch(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn reason(&self) -> &'static str {
        match self.status() {
            StatusCode::BAD_REQUEST => "BadRequest",
            _ => "InternalError",
        }
    }

    /// A denial carrying the status code, so callers can tell it apart from
    /// a rejected function.
    fn into_response(self, request: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
        let mut response = AdmissionResponse::from(request).deny(&self);
        response.result.code = self.status().as_u16();
        response.result.reason = self.reason().to_string();
        response
    }
}

fn admission_request(
    payload: Result<Json<Review>, JsonRejection>,
) -> Result<AdmissionRequest<DynamicObject>, Rejected> {
    let Json(review) = payload.map_err(|rejection| {
        warn!(%rejection, "Failed to decode admission review.");
        (StatusCode::BAD_REQUEST, rejection.to_string())
    })?;

    review.try_into().map_err(|error: ConvertAdmissionReviewError| {
        warn!(%error, "Admission review has no request.");
        (StatusCode::BAD_REQUEST, error.to_string())
    })
}

/// Decodes the v1alpha2 Function carried by `request`.
fn function(request: &AdmissionRequest<DynamicObject>) -> Result<Function, AdmissionError> {
    let kind = &request.kind;
    if kind.group != GROUP || kind.kind != FUNCTION_KIND {
        return Err(AdmissionError::InvalidKind {
            group: kind.group.clone(),
            version: kind.version.clone(),
            kind: kind.kind.clone(),
        });
    }
    if kind.version != v1alpha2::VERSION {
        return Err(AdmissionError::InvalidVersion(kind.version.clone()));
    }

    let object = request
        .object
        .as_ref()
        .ok_or(AdmissionError::MissingObject)?;

    serde_json::to_value(object)
        .and_then(serde_json::from_value)
        .map_err(AdmissionError::Decode)
}

fn defaulting_response(
    request: &AdmissionRequest<DynamicObject>,
    state: &WebhookState,
) -> Result<AdmissionResponse, AdmissionError> {
    let function = function(request)?;

    let original = serde_json::to_value(&function).map_err(AdmissionError::Encode)?;

    let mut defaulted = function;
    defaulting::set_defaults(&mut defaulted, &state.config.defaulting);

    let defaulted = serde_json::to_value(&defaulted).map_err(AdmissionError::Encode)?;

    let patch = json_patch::diff(&original, &defaulted);

    AdmissionResponse::from(request)
        .with_patch(patch)
        .map_err(AdmissionError::Patch)
}

pub(super) async fn defaulting(
    State(state): State<Arc<WebhookState>>,
    payload: Result<Json<Review>, JsonRejection>,
) -> Result<Json<Review>, Rejected> {
    let request = admission_request(payload)?;
    let uid = &request.uid;
    let name = &request.name;

    let response = match defaulting_response(&request, &state) {
        Ok(response) => {
            info!(%uid, %name, "Defaulted function.");
            response
        }
        Err(error) => {
            warn!(%uid, %name, %error, "Failed to default function.");
            error.into_response(&request)
        }
    };

    Ok(Json(response.into_review()))
}

fn validation_response(
    request: &AdmissionRequest<DynamicObject>,
    state: &WebhookState,
) -> AdmissionResponse {
    if request.operation == Operation::Delete {
        return AdmissionResponse::from(request);
    }

    let function = match function(request) {
        Ok(function) => function,
        Err(error) => {
            warn!(uid = %request.uid, %error, "Failed to decode function.");
            return error.into_response(request);
        }
    };

    let response = AdmissionResponse::from(request);
    match validation::validate(&function, &state.config.validation) {
        Ok(()) => {
            info!(uid = %request.uid, name = %request.name, "Function is valid.");
            response
        }
        Err(violations) => {
            info!(uid = %request.uid, name = %request.name, %violations, "Function is invalid.");
            response.deny(violations)
        }
    }
}

pub(super) async fn validation(
    State(state): State<Arc<WebhookState>>,
    payload: Result<Json<Review>, JsonRejection>,
) -> Result<Json<Review>, Rejected> {
    let request = admission_request(payload)?;

    Ok(Json(validation_response(&request, &state).into_review()))
}
