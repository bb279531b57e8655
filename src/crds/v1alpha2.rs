use k8s_openapi::{
    api::core::v1::{EnvVar, ResourceRequirements as CoreResources},
    apimachinery::pkg::apis::meta::v1::Time,
};
use kube::CustomResource;
use schemars::{gen::SchemaGenerator, schema::Schema, JsonSchema};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

pub const VERSION: &str = "v1alpha2";
pub const API_VERSION: &str = "serverless.operato.rs/v1alpha2";

#[derive(CustomResource, Serialize, Deserialize, Debug, PartialEq, Clone, Default, JsonSchema)]
#[kube(
    group = "serverless.operato.rs",
    version = "v1alpha2",
    kind = "Function",
    plural = "functions",
    derive = "PartialEq",
    derive = "Default",
    status = "FunctionStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Runtime>,

    /// runtimeImageOverride replaces the base image of the runtime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_image_override: Option<String>,

    #[serde(default)]
    pub source: Source,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_configuration: Option<ResourceConfiguration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_config: Option<ScaleConfig>,

    /// replicas is kept equal to `scaleConfig.minReplicas` once defaulted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Template>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_mounts: Vec<SecretMount>,
}

/// Source holds exactly one of `inline` or `gitRepository`.
///
/// Both are optional on the wire so that an object with none or both set can
/// still be decoded and rejected by validation. Use [`Source::kind`] for the
/// typed view.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<InlineSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_repository: Option<GitRepositorySource>,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum SourceKind<'a> {
    Inline(&'a InlineSource),
    Git(&'a GitRepositorySource),
    /// Neither or both variants are set.
    Unknown,
}

impl Source {
    pub fn kind(&self) -> SourceKind<'_> {
        match (&self.inline, &self.git_repository) {
            (Some(inline), None) => SourceKind::Inline(inline),
            (None, Some(git)) => SourceKind::Git(git),
            _ => SourceKind::Unknown,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InlineSource {
    pub source: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dependencies: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GitRepositorySource {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<RepositoryAuth>,

    #[serde(flatten)]
    pub repository: Repository,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_dir: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reference: String,
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

/// Function runtimes known to v1alpha2. Unknown values are kept verbatim.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(from = "String", into = "String")]
pub enum Runtime {
    NodeJs12,
    NodeJs14,
    NodeJs16,
    NodeJs18,
    Python39,
    Unsupported(String),
}

impl Runtime {
    pub fn as_str(&self) -> &str {
        match self {
            Runtime::NodeJs12 => "nodejs12",
            Runtime::NodeJs14 => "nodejs14",
            Runtime::NodeJs16 => "nodejs16",
            Runtime::NodeJs18 => "nodejs18",
            Runtime::Python39 => "python39",
            Runtime::Unsupported(value) => value,
        }
    }

    pub fn is_nodejs(&self) -> bool {
        matches!(
            self,
            Runtime::NodeJs12 | Runtime::NodeJs14 | Runtime::NodeJs16 | Runtime::NodeJs18
        )
    }

    pub fn is_python(&self) -> bool {
        matches!(self, Runtime::Python39)
    }
}

impl From<String> for Runtime {
    fn from(value: String) -> Self {
        match value.as_str() {
            "nodejs12" => Runtime::NodeJs12,
            "nodejs14" => Runtime::NodeJs14,
            "nodejs16" => Runtime::NodeJs16,
            "nodejs18" => Runtime::NodeJs18,
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
pub struct ResourceConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<ResourceRequirements>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<ResourceRequirements>,
}

/// Resources of one component.
///
/// `profile` records which preset the resources came from. `resources` holds
/// the effective values; both may be set at once.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<CoreResources>,
}

impl ResourceRequirements {
    /// The profile name, if one is set and non-empty.
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref().filter(|profile| !profile.is_empty())
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScaleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<i32>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretMount {
    pub secret_name: String,
    pub mount_path: String,
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

impl FunctionSpec {
    pub fn function_resources(&self) -> Option<&ResourceRequirements> {
        self.resource_configuration
            .as_ref()
            .and_then(|configuration| configuration.function.as_ref())
    }

    pub fn build_resources(&self) -> Option<&ResourceRequirements> {
        self.resource_configuration
            .as_ref()
            .and_then(|configuration| configuration.build.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(value: serde_json::Value) -> Source {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn source_kind_is_exclusive() {
        let inline = source(serde_json::json!({"inline": {"source": "code"}}));
        assert!(matches!(inline.kind(), SourceKind::Inline(_)));

        let git = source(serde_json::json!({
            "gitRepository": {
                "url": "https://github.com/org/repo.git",
                "baseDir": "/",
                "reference": "main"
            }
        }));
        match git.kind() {
            SourceKind::Git(git) => {
                assert_eq!(git.repository.base_dir, "/");
                assert_eq!(git.repository.reference, "main");
            }
            other => panic!("unexpected source kind: {other:?}"),
        }

        assert_eq!(Source::default().kind(), SourceKind::Unknown);

        let both = source(serde_json::json!({
            "inline": {"source": "code"},
            "gitRepository": {"url": "https://github.com/org/repo.git"}
        }));
        assert_eq!(both.kind(), SourceKind::Unknown);
    }

    #[test]
    fn empty_profile_is_no_profile() {
        let resources = ResourceRequirements {
            profile: Some(String::new()),
            resources: None,
        };
        assert_eq!(resources.profile(), None);
    }
}
