use k8s_openapi::{
    api::core::v1::{EnvVar, ResourceRequirements},
    apimachinery::pkg::apis::meta::v1::Time,
};
use kube::CustomResource;
use schemars::{gen::SchemaGenerator, schema::Schema, JsonSchema};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

pub const VERSION: &str = "v1alpha1";
pub const API_VERSION: &str = "serverless.operato.rs/v1alpha1";

#[derive(CustomResource, Serialize, Deserialize, Debug, PartialEq, Clone, Default, JsonSchema)]
#[kube(
    group = "serverless.operato.rs",
    version = "v1alpha1",
    kind = "Function",
    plural = "functions",
    derive = "PartialEq",
    derive = "Default",
    status = "FunctionStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    /// type selects how `source` is interpreted. Absent means inline code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<SourceType>,

    /// source is either the inline function code or, for `git` functions,
    /// the name of a GitRepository in the same namespace
    #[serde(default)]
    pub source: String,

    /// deps is the dependency manifest of an inline function
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub deps: String,

    #[serde(flatten)]
    pub repository: Repository,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,

    /// resources of the function pod
    #[serde(default)]
    pub resources: ResourceRequirements,

    /// buildResources of the image build job
    #[serde(default)]
    pub build_resources: ResourceRequirements,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Runtime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_image_override: Option<String>,

    /// labels are merged into the generated pod template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Raw,
    Git,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_dir: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reference: String,
}

/// Function runtimes known to v1alpha1.
///
/// Unknown values are kept verbatim so they survive a round trip through
/// this version and can be rejected by validation instead of by decoding.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(from = "String", into = "String")]
pub enum Runtime {
    NodeJs12,
    NodeJs14,
    NodeJs16,
    Python39,
    Unsupported(String),
}

impl Runtime {
    pub fn as_str(&self) -> &str {
        match self {
            Runtime::NodeJs12 => "nodejs12",
            Runtime::NodeJs14 => "nodejs14",
            Runtime::NodeJs16 => "nodejs16",
            Runtime::Python39 => "python39",
            Runtime::Unsupported(value) => value,
        }
    }
}

impl From<String> for Runtime {
    fn from(value: String) -> Self {
        match value.as_str() {
            "nodejs12" => Runtime::NodeJs12,
            "nodejs14" => Runtime::NodeJs14,
            "nodejs16" => Runtime::NodeJs16,
            "python39" => Runtime::Python39,
            _ => Runtime::Unsupported(value),
        }
    }
}

impl From<Runtime> for String {
    fn from(value: Runtime) -> Self {
        match value {
            Runtime::Unsupported(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl JsonSchema for Runtime {
    fn schema_name() -> String {
        String::from("Runtime")
    }

    fn is_referenceable() -> bool {
        false
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunctionStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(flatten)]
    pub repository: Repository,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Runtime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_image_override: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(CustomResource, Serialize, Deserialize, Debug, PartialEq, Clone, Default, JsonSchema)]
#[kube(
    group = "serverless.operato.rs",
    version = "v1alpha1",
    kind = "GitRepository",
    plural = "gitrepositories",
    derive = "PartialEq",
    derive = "Default",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct GitRepositorySpec {
    /// url of the repository, either `https://...` or an ssh remote
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<RepositoryAuth>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryAuth {
    #[serde(rename = "type")]
    pub auth_type: RepositoryAuthType,
    pub secret_name: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(from = "String", into = "String")]
pub enum RepositoryAuthType {
    Basic,
    Key,
    Unsupported(String),
}

impl RepositoryAuthType {
    pub fn as_str(&self) -> &str {
        match self {
            RepositoryAuthType::Basic => "basic",
            RepositoryAuthType::Key => "key",
            RepositoryAuthType::Unsupported(value) => value,
        }
    }
}

impl From<String> for RepositoryAuthType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "basic" => RepositoryAuthType::Basic,
            "key" => RepositoryAuthType::Key,
            _ => RepositoryAuthType::Unsupported(value),
        }
    }
}

impl From<RepositoryAuthType> for String {
    fn from(value: RepositoryAuthType) -> Self {
        match value {
            RepositoryAuthType::Unsupported(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl JsonSchema for RepositoryAuthType {
    fn schema_name() -> String {
        String::from("RepositoryAuthType")
    }

    fn is_referenceable() -> bool {
        false
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        String::json_schema(gen)
    }
}

impl Function {
    pub fn is_git(&self) -> bool {
        self.spec.r#type == Some(SourceType::Git)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_runtime_survives_serde() {
        let runtime: Runtime = serde_json::from_str("\"nodejs18\"").unwrap();
        assert_eq!(runtime, Runtime::Unsupported(String::from("nodejs18")));
        assert_eq!(serde_json::to_string(&runtime).unwrap(), "\"nodejs18\"");
    }

    #[test]
    fn repository_fields_are_flattened_into_spec() {
        let spec: FunctionSpec = serde_json::from_value(serde_json::json!({
            "type": "git",
            "source": "my-repo",
            "baseDir": "/code",
            "reference": "main",
        }))
        .unwrap();

        assert_eq!(spec.r#type, Some(SourceType::Git));
        assert_eq!(spec.repository.base_dir, "/code");
        assert_eq!(spec.repository.reference, "main");
    }
}
