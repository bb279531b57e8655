//! The `apiextensions.k8s.io/v1` ConversionReview envelope.

use super::{convert, ConversionError, DowngradeFallback, GitRepositoryStore, VersionedFunction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

pub const CONVERSION_REVIEW_API_VERSION: &str = "apiextensions.k8s.io/v1";
pub const CONVERSION_REVIEW_KIND: &str = "ConversionReview";

const STATUS_SUCCESS: &str = "Success";
const STATUS_FAILURE: &str = "Failure";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReview {
    pub api_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ConversionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ConversionResponse>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub uid: String,
    #[serde(rename = "desiredAPIVersion")]
    pub desired_api_version: String,
    #[serde(default)]
    pub objects: Vec<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub uid: String,
    pub result: ConversionResult,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub converted_objects: Vec<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConversionResponse {
    fn success(uid: String, converted_objects: Vec<Value>) -> Self {
        Self {
            uid,
            result: ConversionResult {
                status: STATUS_SUCCESS.to_string(),
                message: None,
            },
            converted_objects,
        }
    }

    fn failure(uid: String, message: String) -> Self {
        Self {
            uid,
            result: ConversionResult {
                status: STATUS_FAILURE.to_string(),
                message: Some(message),
            },
            converted_objects: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.status == STATUS_SUCCESS
    }

    pub fn into_review(self) -> ConversionReview {
        ConversionReview {
            api_version: CONVERSION_REVIEW_API_VERSION.to_string(),
            kind: CONVERSION_REVIEW_KIND.to_string(),
            request: None,
            response: Some(self),
        }
    }
}

async fn convert_object(
    object: Value,
    desired_api_version: &str,
    repositories: &dyn GitRepositoryStore,
    fallback: DowngradeFallback,
) -> Result<Value, ConversionError> {
    let function = VersionedFunction::from_value(object)?;
    convert(function, desired_api_version, repositories, fallback)
        .await?
        .into_value()
}

async fn convert_objects(
    request: &ConversionRequest,
    repositories: &dyn GitRepositoryStore,
    fallback: DowngradeFallback,
) -> Result<Vec<Value>, String> {
    let mut converted_objects = Vec::with_capacity(request.objects.len());

    for (index, object) in request.objects.iter().enumerate() {
        let converted = convert_object(
            object.clone(),
            &request.desired_api_version,
            repositories,
            fallback,
        )
        .await
        .map_err(|error| format!("while converting object {index}: {error}"))?;

        converted_objects.push(converted);
    }

    Ok(converted_objects)
}

/// Answers a ConversionReview.
///
/// Every object is converted; the first failure fails the whole review and
/// no partially converted objects are returned. The request UID is echoed.
pub async fn convert_review(
    review: ConversionReview,
    repositories: &dyn GitRepositoryStore,
    fallback: DowngradeFallback,
) -> ConversionReview {
    let Some(request) = review.request else {
        warn!("Conversion review without request.");
        return ConversionResponse::failure(String::new(), String::from("conversion request is nil"))
            .into_review();
    };

    info!(
        uid = %request.uid,
        desired_api_version = %request.desired_api_version,
        objects = request.objects.len(),
        "Converting objects."
    );

    let response = match convert_objects(&request, repositories, fallback).await {
        Ok(converted_objects) => {
            info!(uid = %request.uid, "Conversion succeeded.");
            ConversionResponse::success(request.uid, converted_objects)
        }
        Err(message) => {
            warn!(uid = %request.uid, %message, "Conversion failed.");
            ConversionResponse::failure(request.uid, message)
        }
    };

    response.into_review()
}
