//! Conversion of Functions between v1alpha1 and v1alpha2.
//!
//! Information one version cannot express is carried in annotations:
//! the name of the v1alpha1 GitRepository a v1alpha2 function came from and
//! the secret mounts of a v1alpha1 function. [`ConversionContext`] is the
//! typed view of these annotations; they are only read and written at the
//! edges of a conversion.

mod downgrade;
pub mod git;
mod review;
mod upgrade;

pub use git::{GitRepositoryStore, KubeGitRepositories};
pub use review::{
    convert_review, ConversionRequest, ConversionResponse, ConversionResult, ConversionReview,
};

use crate::{
    consts::{GIT_REPO_NAME_ANNOTATION, SECRET_MOUNTS_ANNOTATION},
    crds::{
        v1alpha1,
        v1alpha2::{self, SecretMount},
    },
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;
use std::{collections::BTreeMap, fmt};
use thiserror::Error as ThisError;

pub const FUNCTION_KIND: &str = "Function";

#[derive(ThisError, Debug)]
pub enum ConversionError {
    #[error("Unsupported convert source version {api_version}, kind {kind}")]
    UnsupportedSource { api_version: String, kind: String },
    #[error("Unsupported convert destination version {0}")]
    UnsupportedDestination(String),
    #[error("while decoding {api_version} function: {error}")]
    Decode {
        api_version: &'static str,
        #[source]
        error: serde_json::Error,
    },
    #[error("while encoding converted function: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("while decoding secret mounts annotation: {0}")]
    DecodeSecretMounts(#[source] serde_json::Error),
    #[error("while encoding secret mounts annotation: {0}")]
    EncodeSecretMounts(#[source] serde_json::Error),
    #[error("Function {0} has no namespace")]
    MissingNamespace(String),
    #[error("while getting git repository {namespace}/{name}: {error}")]
    GetGitRepository {
        namespace: String,
        name: String,
        #[source]
        error: kube::Error,
    },
    #[error("while applying git repository {namespace}/{name}: {error}")]
    ApplyGitRepository {
        namespace: String,
        name: String,
        #[source]
        error: kube::Error,
    },
    #[error("while converting function {name} from {from} to {to}: {error}")]
    Function {
        name: String,
        from: Version,
        to: Version,
        #[source]
        error: Box<ConversionError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V1Alpha1,
    V1Alpha2,
}

impl Version {
    pub fn from_api_version(api_version: &str) -> Option<Self> {
        match api_version {
            v1alpha1::API_VERSION => Some(Version::V1Alpha1),
            v1alpha2::API_VERSION => Some(Version::V1Alpha2),
            _ => None,
        }
    }

    pub fn api_version(&self) -> &'static str {
        match self {
            Version::V1Alpha1 => v1alpha1::API_VERSION,
            Version::V1Alpha2 => v1alpha2::API_VERSION,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_version())
    }
}

/// A Function of either served version.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionedFunction {
    V1Alpha1(v1alpha1::Function),
    V1Alpha2(v1alpha2::Function),
}

impl VersionedFunction {
    /// Decodes a raw object, dispatching on its `apiVersion` and `kind`.
    pub fn from_value(value: Value) -> Result<Self, ConversionError> {
        let api_version = value
            .get("apiVersion")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match (Version::from_api_version(&api_version), kind.as_str()) {
            (Some(Version::V1Alpha1), FUNCTION_KIND) => serde_json::from_value(value)
                .map(VersionedFunction::V1Alpha1)
                .map_err(|error| ConversionError::Decode {
                    api_version: v1alpha1::API_VERSION,
                    error,
                }),
            (Some(Version::V1Alpha2), FUNCTION_KIND) => serde_json::from_value(value)
                .map(VersionedFunction::V1Alpha2)
                .map_err(|error| ConversionError::Decode {
                    api_version: v1alpha2::API_VERSION,
                    error,
                }),
            _ => Err(ConversionError::UnsupportedSource { api_version, kind }),
        }
    }

    pub fn into_value(self) -> Result<Value, ConversionError> {
        let value = match self {
            VersionedFunction::V1Alpha1(function) => serde_json::to_value(function),
            VersionedFunction::V1Alpha2(function) => serde_json::to_value(function),
        };
        value.map_err(ConversionError::Encode)
    }

    pub fn version(&self) -> Version {
        match self {
            VersionedFunction::V1Alpha1(_) => Version::V1Alpha1,
            VersionedFunction::V1Alpha2(_) => Version::V1Alpha2,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            VersionedFunction::V1Alpha1(function) => &function.metadata,
            VersionedFunction::V1Alpha2(function) => &function.metadata,
        }
    }
}

/// What a downgrade does with a git function that was created as v1alpha2
/// and therefore has no v1alpha1 GitRepository to point at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DowngradeFallback {
    /// Leave the v1alpha1 `source` empty.
    #[default]
    Leave,
    /// Create or update a GitRepository named after the function and point at it.
    Synthesize,
}

/// Annotation carried state, see the module docs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionContext {
    pub preserved_git_repo_name: Option<String>,
    pub secret_mounts: Vec<SecretMount>,
}

impl ConversionContext {
    /// Removes the conversion annotations from `metadata` and decodes them.
    pub fn take(metadata: &mut ObjectMeta) -> Result<Self, ConversionError> {
        let Some(annotations) = metadata.annotations.as_mut() else {
            return Ok(Self::default());
        };

        let preserved_git_repo_name = annotations
            .remove(GIT_REPO_NAME_ANNOTATION)
            .filter(|name| !name.is_empty());
        let secret_mounts = annotations.remove(SECRET_MOUNTS_ANNOTATION);

        if annotations.is_empty() {
            metadata.annotations = None;
        }

        let secret_mounts = match secret_mounts {
            Some(encoded) if !encoded.is_empty() => {
                serde_json::from_str(&encoded).map_err(ConversionError::DecodeSecretMounts)?
            }
            _ => Vec::new(),
        };

        Ok(Self {
            preserved_git_repo_name,
            secret_mounts,
        })
    }

    /// Writes the context back as annotations, leaving out empty values.
    pub fn apply(&self, metadata: &mut ObjectMeta) -> Result<(), ConversionError> {
        let mut annotations = metadata.annotations.take().unwrap_or_default();

        if let Some(name) = &self.preserved_git_repo_name {
            annotations.insert(GIT_REPO_NAME_ANNOTATION.to_string(), name.clone());
        }

        if !self.secret_mounts.is_empty() {
            let encoded = serde_json::to_string(&self.secret_mounts)
                .map_err(ConversionError::EncodeSecretMounts)?;
            annotations.insert(SECRET_MOUNTS_ANNOTATION.to_string(), encoded);
        }

        if !annotations.is_empty() {
            metadata.annotations = Some(annotations);
        }

        Ok(())
    }
}

/// Converts `function` to the version named by `desired_api_version`.
///
/// A function already at the desired version is returned unchanged.
pub async fn convert(
    function: VersionedFunction,
    desired_api_version: &str,
    repositories: &dyn GitRepositoryStore,
    fallback: DowngradeFallback,
) -> Result<VersionedFunction, ConversionError> {
    let to = Version::from_api_version(desired_api_version)
        .ok_or_else(|| ConversionError::UnsupportedDestination(desired_api_version.to_string()))?;
    let from = function.version();
    let name = function.metadata().name.clone().unwrap_or_default();

    let converted = match (function, to) {
        (VersionedFunction::V1Alpha1(function), Version::V1Alpha2) => {
            upgrade::upgrade(function, repositories)
                .await
                .map(VersionedFunction::V1Alpha2)
        }
        (VersionedFunction::V1Alpha2(function), Version::V1Alpha1) => {
            downgrade::downgrade(function, repositories, fallback)
                .await
                .map(VersionedFunction::V1Alpha1)
        }
        (unchanged, _) => Ok(unchanged),
    };

    converted.map_err(|error| ConversionError::Function {
        name,
        from,
        to,
        error: Box::new(error),
    })
}

/// Drops empty maps so converted objects compare equal to ones that never had them.
fn non_empty<K, V>(map: Option<BTreeMap<K, V>>) -> Option<BTreeMap<K, V>> {
    map.filter(|map| !map.is_empty())
}
