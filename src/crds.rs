pub mod v1alpha1;
pub mod v1alpha2;

use crate::consts::CONVERT_PATH;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    CustomResourceConversion, CustomResourceDefinition, ServiceReference, WebhookClientConfig,
    WebhookConversion,
};
use kube::{
    core::crd::{merge_crds, MergeError},
    CustomResourceExt,
};
use thiserror::Error as ThisError;

pub const FUNCTION_CRD_NAME: &str = "functions.serverless.operato.rs";
pub const GIT_REPOSITORY_CRD_NAME: &str = "gitrepositories.serverless.operato.rs";

/// The in-cluster service serving the conversion webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookService {
    pub name: String,
    pub namespace: String,
    pub port: Option<i32>,
}

#[derive(ThisError, Debug)]
pub enum CrdError {
    #[error("Failed to merge function versions: {0}")]
    Merge(#[source] MergeError),
    #[error("Failed to serialize CRDs: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

/// The Function CRD serving both versions with v1alpha2 stored.
pub fn merged_crd(webhook: Option<&WebhookService>) -> Result<CustomResourceDefinition, CrdError> {
    let mut crd = merge_crds(
        vec![v1alpha1::Function::crd(), v1alpha2::Function::crd()],
        v1alpha2::VERSION,
    )
    .map_err(CrdError::Merge)?;

    if let Some(webhook) = webhook {
        crd.spec.conversion = Some(conversion_stanza(webhook));
    }

    Ok(crd)
}

fn conversion_stanza(webhook: &WebhookService) -> CustomResourceConversion {
    CustomResourceConversion {
        strategy: String::from("Webhook"),
        webhook: Some(WebhookConversion {
            client_config: Some(WebhookClientConfig {
                service: Some(ServiceReference {
                    name: webhook.name.clone(),
                    namespace: webhook.namespace.clone(),
                    path: Some(CONVERT_PATH.to_string()),
                    port: webhook.port,
                }),
                ..WebhookClientConfig::default()
            }),
            conversion_review_versions: vec![String::from("v1")],
        }),
    }
}

/// Every CRD of the domain, Function first.
pub fn all_crds(
    webhook: Option<&WebhookService>,
) -> Result<Vec<CustomResourceDefinition>, CrdError> {
    Ok(vec![merged_crd(webhook)?, v1alpha1::GitRepository::crd()])
}

/// Renders the CRDs as a multi document YAML stream.
pub fn generate_crds(webhook: Option<&WebhookService>) -> Result<String, CrdError> {
    let crds = all_crds(webhook)?;

    let mut documents = Vec::with_capacity(crds.len());
    for crd in crds.iter() {
        documents.push(serde_yaml::to_string(crd).map_err(CrdError::Serialize)?);
    }

    Ok(documents.join("---\n"))
}
