use super::{non_empty, ConversionContext, ConversionError, GitRepositoryStore};
use crate::{
    crds::{
        v1alpha1,
        v1alpha2::{
            Condition, Function, FunctionSpec, FunctionStatus, GitRepositorySource, InlineSource,
            Repository, RepositoryAuth, RepositoryAuthType, ResourceConfiguration,
            ResourceRequirements, Runtime, ScaleConfig, Source, Template,
        },
    },
    defaulting::PresetLabels,
};
use k8s_openapi::{
    api::core::v1::ResourceRequirements as CoreResources,
    apimachinery::pkg::api::resource::Quantity,
};
use std::collections::BTreeMap;

impl From<v1alpha1::Runtime> for Runtime {
    fn from(runtime: v1alpha1::Runtime) -> Self {
        Runtime::from(String::from(runtime))
    }
}

impl From<v1alpha1::RepositoryAuth> for RepositoryAuth {
    fn from(auth: v1alpha1::RepositoryAuth) -> Self {
        RepositoryAuth {
            auth_type: RepositoryAuthType::from(String::from(auth.auth_type)),
            secret_name: auth.secret_name,
        }
    }
}

impl From<v1alpha1::Repository> for Repository {
    fn from(repository: v1alpha1::Repository) -> Self {
        Repository {
            base_dir: repository.base_dir,
            reference: repository.reference,
        }
    }
}

impl From<&v1alpha1::Condition> for Condition {
    fn from(condition: &v1alpha1::Condition) -> Self {
        Condition {
            condition_type: condition.condition_type.clone(),
            status: condition.status.clone(),
            last_transition_time: condition.last_transition_time.clone(),
            reason: condition.reason.clone(),
            message: condition.message.clone(),
        }
    }
}

impl From<v1alpha1::FunctionStatus> for FunctionStatus {
    fn from(status: v1alpha1::FunctionStatus) -> Self {
        FunctionStatus {
            conditions: status.conditions.iter().map(Condition::from).collect(),
            repository: status.repository.into(),
            commit: status.commit,
            runtime: status.runtime.map(Runtime::from),
            runtime_image_override: status.runtime_image_override,
        }
    }
}

fn is_configured(resources: &CoreResources) -> bool {
    let has_values = |values: Option<&BTreeMap<String, Quantity>>| {
        values.map_or(false, |values| !values.is_empty())
    };

    has_values(resources.limits.as_ref()) || has_values(resources.requests.as_ref())
}

fn component(profile: Option<String>, resources: CoreResources) -> Option<ResourceRequirements> {
    let resources = Some(resources).filter(is_configured);

    if profile.is_none() && resources.is_none() {
        return None;
    }

    Some(ResourceRequirements { profile, resources })
}

fn resource_configuration(
    presets: PresetLabels,
    function: CoreResources,
    build: CoreResources,
) -> Option<ResourceConfiguration> {
    let function = component(presets.function, function);
    let build = component(presets.build, build);

    if function.is_none() && build.is_none() {
        return None;
    }

    Some(ResourceConfiguration { function, build })
}

async fn source(
    function: &v1alpha1::Function,
    repositories: &dyn GitRepositoryStore,
) -> Result<Source, ConversionError> {
    let spec = &function.spec;

    if !function.is_git() {
        return Ok(Source {
            inline: Some(InlineSource {
                source: spec.source.clone(),
                dependencies: spec.deps.clone(),
            }),
            git_repository: None,
        });
    }

    let namespace = function
        .metadata
        .namespace
        .clone()
        .ok_or_else(|| {
            ConversionError::MissingNamespace(function.metadata.name.clone().unwrap_or_default())
        })?;

    let repository = repositories
        .get(&namespace, &spec.source)
        .await
        .map_err(|error| ConversionError::GetGitRepository {
            namespace,
            name: spec.source.clone(),
            error,
        })?;

    Ok(Source {
        inline: None,
        git_repository: Some(GitRepositorySource {
            url: repository.spec.url,
            auth: repository.spec.auth.map(RepositoryAuth::from),
            repository: spec.repository.clone().into(),
        }),
    })
}

pub(super) async fn upgrade(
    function: v1alpha1::Function,
    repositories: &dyn GitRepositoryStore,
) -> Result<Function, ConversionError> {
    let source = source(&function, repositories).await?;
    let preserved_git_repo_name = function.is_git().then(|| function.spec.source.clone());

    let mut metadata = function.metadata;
    let carried = ConversionContext::take(&mut metadata)?;
    let presets = PresetLabels::take(&mut metadata);

    ConversionContext {
        preserved_git_repo_name,
        secret_mounts: Vec::new(),
    }
    .apply(&mut metadata)?;
    metadata.labels = non_empty(metadata.labels);

    let spec = function.spec;

    let scale_config = (spec.min_replicas.is_some() || spec.max_replicas.is_some()).then(|| {
        ScaleConfig {
            min_replicas: spec.min_replicas,
            max_replicas: spec.max_replicas,
        }
    });

    let template = non_empty(spec.labels).map(|labels| Template {
        labels: Some(labels),
    });

    Ok(Function {
        metadata,
        spec: FunctionSpec {
            runtime: spec.runtime.map(Runtime::from),
            runtime_image_override: spec.runtime_image_override,
            source,
            env: spec.env,
            resource_configuration: resource_configuration(
                presets,
                spec.resources,
                spec.build_resources,
            ),
            scale_config,
            replicas: spec.min_replicas,
            template,
            labels: None,
            annotations: None,
            secret_mounts: carried.secret_mounts,
        },
        status: function.status.map(FunctionStatus::from),
    })
}
