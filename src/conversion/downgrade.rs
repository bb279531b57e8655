use super::{non_empty, ConversionContext, ConversionError, DowngradeFallback, GitRepositoryStore};
use crate::{
    consts::{BUILD_RESOURCES_PRESET_LABEL, FUNCTION_RESOURCES_PRESET_LABEL},
    crds::{
        v1alpha1::{
            Condition, Function, FunctionSpec, FunctionStatus, GitRepositorySpec, Repository,
            RepositoryAuth, RepositoryAuthType, Runtime, SourceType,
        },
        v1alpha2,
    },
};
use k8s_openapi::{
    api::core::v1::ResourceRequirements as CoreResources,
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use tracing::info;

const SYNTHESIZED_REPOSITORY_SUFFIX: &str = "gitrepository";

impl From<v1alpha2::Runtime> for Runtime {
    fn from(runtime: v1alpha2::Runtime) -> Self {
        Runtime::from(String::from(runtime))
    }
}

impl From<&v1alpha2::RepositoryAuth> for RepositoryAuth {
    fn from(auth: &v1alpha2::RepositoryAuth) -> Self {
        RepositoryAuth {
            auth_type: RepositoryAuthType::from(String::from(auth.auth_type.clone())),
            secret_name: auth.secret_name.clone(),
        }
    }
}

impl From<&v1alpha2::Repository> for Repository {
    fn from(repository: &v1alpha2::Repository) -> Self {
        Repository {
            base_dir: repository.base_dir.clone(),
            reference: repository.reference.clone(),
        }
    }
}

impl From<&v1alpha2::Condition> for Condition {
    fn from(condition: &v1alpha2::Condition) -> Self {
        Condition {
            condition_type: condition.condition_type.clone(),
            status: condition.status.clone(),
            last_transition_time: condition.last_transition_time.clone(),
            reason: condition.reason.clone(),
            message: condition.message.clone(),
        }
    }
}

fn status(status: v1alpha2::FunctionStatus, source: &str) -> FunctionStatus {
    FunctionStatus {
        conditions: status.conditions.iter().map(Condition::from).collect(),
        repository: (&status.repository).into(),
        commit: status.commit,
        source: Some(source.to_string()).filter(|source| !source.is_empty()),
        runtime: status.runtime.map(Runtime::from),
        runtime_image_override: status.runtime_image_override,
    }
}

/// Writes resource profiles back as the preset labels v1alpha1 understands.
fn restore_preset_labels(metadata: &mut ObjectMeta, spec: &v1alpha2::FunctionSpec) {
    let profiles = [
        (
            FUNCTION_RESOURCES_PRESET_LABEL,
            spec.function_resources().and_then(|resources| resources.profile()),
        ),
        (
            BUILD_RESOURCES_PRESET_LABEL,
            spec.build_resources().and_then(|resources| resources.profile()),
        ),
    ];

    for (label, profile) in profiles {
        if let Some(profile) = profile {
            metadata
                .labels
                .get_or_insert_with(Default::default)
                .insert(label.to_string(), profile.to_string());
        }
    }
}

fn resources(resources: Option<&v1alpha2::ResourceRequirements>) -> CoreResources {
    resources
        .and_then(|resources| resources.resources.clone())
        .unwrap_or_default()
}

/// The v1alpha1 repository name of a git function without a preserved one.
async fn fallback_repository_name(
    metadata: &ObjectMeta,
    git: &v1alpha2::GitRepositorySource,
    repositories: &dyn GitRepositoryStore,
    fallback: DowngradeFallback,
) -> Result<String, ConversionError> {
    if fallback == DowngradeFallback::Leave {
        return Ok(String::new());
    }

    let function_name = metadata.name.clone().unwrap_or_default();
    let namespace = metadata
        .namespace
        .clone()
        .ok_or_else(|| ConversionError::MissingNamespace(function_name.clone()))?;
    let name = format!("{function_name}-{SYNTHESIZED_REPOSITORY_SUFFIX}");

    let spec = GitRepositorySpec {
        url: git.url.clone(),
        auth: git.auth.as_ref().map(RepositoryAuth::from),
    };

    repositories
        .apply(&namespace, &name, spec)
        .await
        .map_err(|error| ConversionError::ApplyGitRepository {
            namespace: namespace.clone(),
            name: name.clone(),
            error,
        })?;

    info!(%namespace, %name, function = %function_name, "Synthesized git repository.");

    Ok(name)
}

pub(super) async fn downgrade(
    function: v1alpha2::Function,
    repositories: &dyn GitRepositoryStore,
    fallback: DowngradeFallback,
) -> Result<Function, ConversionError> {
    let mut metadata = function.metadata;
    let carried = ConversionContext::take(&mut metadata)?;
    let spec = function.spec;

    let mut out = FunctionSpec {
        env: spec.env.clone(),
        runtime: spec.runtime.clone().map(Runtime::from),
        runtime_image_override: spec.runtime_image_override.clone(),
        resources: resources(spec.function_resources()),
        build_resources: resources(spec.build_resources()),
        labels: non_empty(spec.template.as_ref().and_then(|template| template.labels.clone())),
        ..FunctionSpec::default()
    };

    match (&spec.scale_config, spec.replicas) {
        (Some(scale_config), _) => {
            out.min_replicas = scale_config.min_replicas;
            out.max_replicas = scale_config.max_replicas;
        }
        (None, Some(replicas)) => {
            out.min_replicas = Some(replicas);
            out.max_replicas = Some(replicas);
        }
        (None, None) => {}
    }

    if let Some(inline) = &spec.source.inline {
        out.source = inline.source.clone();
        out.deps = inline.dependencies.clone();
    } else if let Some(git) = &spec.source.git_repository {
        out.r#type = Some(SourceType::Git);
        out.repository = (&git.repository).into();
        out.source = match carried.preserved_git_repo_name {
            Some(name) => name,
            None => fallback_repository_name(&metadata, git, repositories, fallback).await?,
        };
    }

    restore_preset_labels(&mut metadata, &spec);
    ConversionContext {
        preserved_git_repo_name: None,
        secret_mounts: spec.secret_mounts,
    }
    .apply(&mut metadata)?;

    let status = function.status.map(|function_status| status(function_status, &out.source));

    Ok(Function {
        metadata,
        spec: out,
        status,
    })
}
