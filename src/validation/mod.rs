//! Validation of v1alpha2 functions.
//!
//! Every check runs, and all violations are reported together in one
//! [`Violations`] error.

pub mod field;
pub mod names;

use crate::{
    config::{MinResourcesValues, ValidationConfig},
    consts::{GROUP, RESERVED_LABEL_PREFIX},
    crds::v1alpha2::{
        Function, FunctionSpec, GitRepositorySource, InlineSource, RepositoryAuthType, Runtime,
        SourceKind,
    },
    quantity,
};
use field::FieldError;
use k8s_openapi::api::core::v1::ResourceRequirements;
use regex::Regex;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::OnceLock,
};
use thiserror::Error as ThisError;

const TOTAL_ANNOTATION_SIZE_LIMIT: usize = 256 * 1024;

const SSH_URL_FMT: &str = r"((git|ssh?)|(git@[\w.]+))(:(//)?)([\w.@:/\-~]+)(/)?";
static SSH_URL: OnceLock<Regex> = OnceLock::new();

pub const UNKNOWN_SOURCE_TYPE: &str = "unknown function source type";

/// All violations found in a run, rendered as `prefix: [a b ...]`.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub struct Violations {
    prefix: String,
    messages: Vec<String>,
}

impl Violations {
    /// `Ok` if there is nothing to report.
    pub fn check(prefix: &str, messages: Vec<String>) -> Result<(), Violations> {
        if messages.is_empty() {
            return Ok(());
        }

        Err(Violations {
            prefix: prefix.to_string(),
            messages,
        })
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.prefix.is_empty() {
            write!(f, "{}: ", self.prefix)?;
        }
        write!(f, "[{}]", self.messages.join(" "))
    }
}

fn collect(prefix: &str, messages: Vec<String>) -> Result<(), String> {
    Violations::check(prefix, messages).map_err(|violations| violations.to_string())
}

type Check = fn(&Function, &ValidationConfig) -> Result<(), String>;

const BASIC_CHECKS: [Check; 10] = [
    validate_object_meta,
    validate_runtime,
    validate_env,
    validate_labels,
    validate_annotations,
    validate_replicas,
    validate_function_resources,
    validate_build_resources,
    validate_sources,
    validate_secret_mounts,
];

pub fn validate(function: &Function, config: &ValidationConfig) -> Result<(), Violations> {
    let mut checks: Vec<Check> = BASIC_CHECKS.to_vec();

    match function.spec.source.kind() {
        SourceKind::Inline(_) => {
            checks.extend([validate_inline_source as Check, validate_inline_dependencies]);
        }
        SourceKind::Git(git) => {
            checks.push(validate_repository);
            if git.auth.is_some() {
                checks.extend([
                    validate_git_auth_type as Check,
                    validate_git_auth_secret_name,
                    validate_git_repository_url,
                ]);
            }
        }
        SourceKind::Unknown => checks.push(unknown_source_type),
    }

    let messages = checks
        .into_iter()
        .filter_map(|check| check(function, config).err())
        .collect();

    Violations::check("", messages)
}

fn unknown_source_type(_: &Function, _: &ValidationConfig) -> Result<(), String> {
    Err(String::from(UNKNOWN_SOURCE_TYPE))
}

fn validate_object_meta(function: &Function, _: &ValidationConfig) -> Result<(), String> {
    let metadata = &function.metadata;
    let mut errors = Vec::new();

    let generate_name = metadata.generate_name.as_deref().unwrap_or_default();
    match metadata.name.as_deref() {
        Some(name) if !name.is_empty() => {
            for message in names::is_dns1035_label(name) {
                errors.push(FieldError::invalid("metadata.name", name, message));
            }
        }
        _ if generate_name.is_empty() => errors.push(FieldError::required(
            "metadata.name",
            Some("name or generateName is required"),
        )),
        _ => {}
    }

    if !generate_name.is_empty() {
        let masked = generate_name.strip_suffix('-').unwrap_or(generate_name);
        for message in names::is_dns1035_label(masked) {
            errors.push(FieldError::invalid(
                "metadata.generateName",
                generate_name,
                message,
            ));
        }
    }

    match metadata.namespace.as_deref() {
        Some(namespace) if !namespace.is_empty() => {
            for message in names::is_dns1123_label(namespace) {
                errors.push(FieldError::invalid("metadata.namespace", namespace, message));
            }
        }
        _ => errors.push(FieldError::required("metadata.namespace", None)),
    }

    if let Some(labels) = &metadata.labels {
        errors.extend(label_errors(labels, "metadata.labels"));
    }
    if let Some(annotations) = &metadata.annotations {
        errors.extend(annotation_errors(annotations, "metadata.annotations"));
    }

    field::aggregate(errors)
}

fn validate_runtime(function: &Function, _: &ValidationConfig) -> Result<(), String> {
    match function.spec.runtime {
        Some(Runtime::Python39 | Runtime::NodeJs16 | Runtime::NodeJs18) => Ok(()),
        _ => Err(String::from("spec.runtime contains unsupported value")),
    }
}

fn validate_env(function: &Function, config: &ValidationConfig) -> Result<(), String> {
    let mut messages = Vec::new();

    for env in function.spec.env.iter() {
        messages.extend(names::is_env_var_name(&env.name));
        if config.reserved_envs.iter().any(|reserved| reserved == &env.name) {
            messages.push(String::from("env name is reserved for the serverless domain"));
        }
    }

    collect("invalid spec.env keys/values", messages)
}

fn validate_labels(function: &Function, _: &ValidationConfig) -> Result<(), String> {
    let spec = &function.spec;
    let empty = BTreeMap::new();
    let labels = spec.labels.as_ref().unwrap_or(&empty);
    let template_labels = spec
        .template
        .as_ref()
        .and_then(|template| template.labels.as_ref())
        .unwrap_or(&empty);

    let mut errors = Vec::new();
    errors.extend(function_label_errors(labels, "spec.labels"));
    errors.extend(function_label_errors(template_labels, "spec.template.labels"));

    if labels_conflict(template_labels, labels) {
        errors.push(FieldError::invalid(
            "spec.template.labels",
            "spec.labels",
            "conflict between labels",
        ));
    }

    field::aggregate(errors)
}

fn function_label_errors(labels: &BTreeMap<String, String>, path: &str) -> Vec<FieldError> {
    let mut errors = label_errors(labels, path);

    let forbidden = format!("label from domain {GROUP} is not allowed");
    errors.extend(
        labels
            .keys()
            .filter(|key| key.starts_with(RESERVED_LABEL_PREFIX))
            .map(|key| FieldError::invalid(path, key, forbidden.as_str())),
    );

    errors
}

fn label_errors(labels: &BTreeMap<String, String>, path: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();

    for (key, value) in labels.iter() {
        for message in names::is_qualified_name(key) {
            errors.push(FieldError::invalid(path, key, message));
        }
        for message in names::is_valid_label_value(value) {
            errors.push(FieldError::invalid(path, value, message));
        }
    }

    errors
}

/// Two label sets conflict when they set the same key to different values.
fn labels_conflict(first: &BTreeMap<String, String>, second: &BTreeMap<String, String>) -> bool {
    first
        .iter()
        .any(|(key, value)| matches!(second.get(key), Some(other) if other != value))
}

fn validate_annotations(function: &Function, _: &ValidationConfig) -> Result<(), String> {
    match &function.spec.annotations {
        Some(annotations) => field::aggregate(annotation_errors(annotations, "spec.annotations")),
        None => Ok(()),
    }
}

fn annotation_errors(annotations: &BTreeMap<String, String>, path: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let mut total_size = 0;

    for (key, value) in annotations.iter() {
        for message in names::is_qualified_name(&key.to_lowercase()) {
            errors.push(FieldError::invalid(path, key, message));
        }
        total_size += key.len() + value.len();
    }

    if total_size > TOTAL_ANNOTATION_SIZE_LIMIT {
        errors.push(FieldError::TooLong {
            path: path.to_string(),
            max: TOTAL_ANNOTATION_SIZE_LIMIT,
        });
    }

    errors
}

fn validate_replicas(function: &Function, config: &ValidationConfig) -> Result<(), String> {
    let spec = &function.spec;
    let min_value = config.function.replicas.min_value;
    let mut messages = Vec::new();

    let scale_config = match (spec.replicas, &spec.scale_config) {
        (None, None) => {
            messages.push(String::from(
                "spec.replicas and spec.scaleConfig are empty at the same time",
            ));
            None
        }
        (Some(replicas), Some(scale_config)) if scale_config.min_replicas != Some(replicas) => {
            messages.push(format!(
                "spec.replicas({replicas}) and spec.scaleConfig are set at the same time with different values"
            ));
            Some(scale_config)
        }
        (_, scale_config) => scale_config.as_ref(),
    };

    if let Some(scale_config) = scale_config {
        if let (Some(min), Some(max)) = (scale_config.min_replicas, scale_config.max_replicas) {
            if min > max {
                messages.push(format!(
                    "spec.maxReplicas({max}) is less than spec.minReplicas({min})"
                ));
            }
        }
        if let Some(min) = scale_config.min_replicas.filter(|min| *min < min_value) {
            messages.push(format!(
                "spec.minReplicas({min}) is less than the smallest allowed value({min_value})"
            ));
        }
        if let Some(max) = scale_config.max_replicas.filter(|max| *max < min_value) {
            messages.push(format!(
                "spec.maxReplicas({max}) is less than the smallest allowed value({min_value})"
            ));
        }
    }

    collect("invalid values", messages)
}

fn validate_function_resources(
    function: &Function,
    config: &ValidationConfig,
) -> Result<(), String> {
    match function
        .spec
        .function_resources()
        .and_then(|resources| resources.resources.as_ref())
    {
        Some(resources) => validate_resources(
            resources,
            &config.function.resources,
            "spec.resourceConfiguration.function.resources",
        ),
        None => Ok(()),
    }
}

fn validate_build_resources(function: &Function, config: &ValidationConfig) -> Result<(), String> {
    match function
        .spec
        .build_resources()
        .and_then(|resources| resources.resources.as_ref())
    {
        Some(resources) => validate_resources(
            resources,
            &config.build_job.resources,
            "spec.resourceConfiguration.build.resources",
        ),
        None => Ok(()),
    }
}

fn validate_resources(
    resources: &ResourceRequirements,
    minimum: &MinResourcesValues,
    parent: &str,
) -> Result<(), String> {
    let mut messages = Vec::new();

    let floors = [
        ("cpu", &minimum.min_request_cpu),
        ("memory", &minimum.min_request_memory),
    ];

    for (kind, list) in [("requests", &resources.requests), ("limits", &resources.limits)] {
        let Some(list) = list else {
            continue;
        };

        for (resource, floor) in floors {
            let Some(value) = list.get(resource) else {
                continue;
            };
            match quantity::is_less(value, floor) {
                Ok(false) => {}
                Ok(true) => messages.push(format!(
                    "{parent}.{kind}.{resource}({}) should be higher than minimal value ({})",
                    value.0, floor.0
                )),
                Err(error) => messages.push(format!("{parent}.{kind}.{resource}: {error}")),
            }
        }
    }

    if let (Some(requests), Some(limits)) = (&resources.requests, &resources.limits) {
        for resource in ["cpu", "memory"] {
            if let (Some(request), Some(limit)) = (requests.get(resource), limits.get(resource)) {
                if let Ok(true) = quantity::is_less(limit, request) {
                    messages.push(format!(
                        "{parent}.limits.{resource}({}) should be higher than {parent}.requests.{resource}({})",
                        limit.0, request.0
                    ));
                }
            }
        }
    }

    collect("invalid function resources", messages)
}

fn validate_sources(function: &Function, _: &ValidationConfig) -> Result<(), String> {
    match function.spec.source.kind() {
        SourceKind::Unknown => Err(String::from(
            "spec.source should contains only 1 configuration of function",
        )),
        _ => Ok(()),
    }
}

fn validate_secret_mounts(function: &Function, _: &ValidationConfig) -> Result<(), String> {
    let secret_mounts = &function.spec.secret_mounts;
    let mut messages = Vec::new();

    for secret_mount in secret_mounts.iter() {
        messages.extend(names::is_dns1123_subdomain(&secret_mount.secret_name));
    }

    let unique: BTreeSet<&str> = secret_mounts
        .iter()
        .map(|secret_mount| secret_mount.secret_name.as_str())
        .collect();
    if unique.len() != secret_mounts.len() {
        messages.push(String::from("secretNames should be unique"));
    }

    if secret_mounts
        .iter()
        .any(|secret_mount| secret_mount.mount_path.is_empty())
    {
        messages.push(String::from("mountPath should not be empty"));
    }

    collect("invalid spec.secretMounts", messages)
}

fn inline_source(spec: &FunctionSpec) -> Option<&InlineSource> {
    spec.source.inline.as_ref()
}

fn git_source(spec: &FunctionSpec) -> Option<&GitRepositorySource> {
    spec.source.git_repository.as_ref()
}

fn validate_inline_source(function: &Function, _: &ValidationConfig) -> Result<(), String> {
    match inline_source(&function.spec) {
        Some(inline) if !inline.source.is_empty() => Ok(()),
        _ => Err(String::from("empty source.inline.source value")),
    }
}

fn validate_inline_dependencies(function: &Function, _: &ValidationConfig) -> Result<(), String> {
    let dependencies = inline_source(&function.spec)
        .map(|inline| inline.dependencies.as_str())
        .unwrap_or_default();

    validate_dependencies(function.spec.runtime.as_ref(), dependencies)
        .map_err(|error| format!("invalid source.inline.dependencies value: {error}"))
}

/// Node.js manifests must be a JSON object, Python requirements are free form.
pub fn validate_dependencies(runtime: Option<&Runtime>, dependencies: &str) -> Result<(), String> {
    match runtime {
        Some(runtime) if runtime.is_nodejs() => {
            let dependencies = dependencies.trim();
            if dependencies.is_empty()
                || (dependencies.starts_with('{') && dependencies.ends_with('}'))
            {
                return Ok(());
            }
            Err(String::from("deps should start with '{' and end with '}'"))
        }
        Some(runtime) if runtime.is_python() => Ok(()),
        Some(runtime) => Err(format!("cannot find runtime: {runtime}")),
        None => Err(String::from("cannot find runtime: ")),
    }
}

fn validate_repository(function: &Function, _: &ValidationConfig) -> Result<(), String> {
    let Some(git) = git_source(&function.spec) else {
        return Ok(());
    };

    let messages = [
        ("spec.source.gitRepository.baseDir", &git.repository.base_dir),
        ("spec.source.gitRepository.reference", &git.repository.reference),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| format!("{name} is required"))
    .collect();

    collect("", messages)
}

fn validate_git_auth_type(function: &Function, _: &ValidationConfig) -> Result<(), String> {
    let auth = git_source(&function.spec).and_then(|git| git.auth.as_ref());
    match auth.map(|auth| &auth.auth_type) {
        Some(RepositoryAuthType::Basic | RepositoryAuthType::Key) | None => Ok(()),
        Some(RepositoryAuthType::Unsupported(_)) => Err(String::from(
            "invalid git repository authentication type",
        )),
    }
}

fn validate_git_auth_secret_name(function: &Function, _: &ValidationConfig) -> Result<(), String> {
    let auth = git_source(&function.spec).and_then(|git| git.auth.as_ref());
    match auth {
        Some(auth) if auth.secret_name.trim().is_empty() => Err(String::from(
            "spec.source.gitRepository.auth.secretName is required",
        )),
        _ => Ok(()),
    }
}

fn validate_git_repository_url(function: &Function, _: &ValidationConfig) -> Result<(), String> {
    match git_source(&function.spec) {
        Some(git) => validate_git_url(&git.url),
        None => Ok(()),
    }
}

/// Accepts ssh remotes (`git@host:path`, `ssh://...`) and http(s) URLs with a host.
pub fn validate_git_url(repository_url: &str) -> Result<(), String> {
    let ssh = SSH_URL
        .get_or_init(|| Regex::new(SSH_URL_FMT).expect("ssh url format is a valid regex"));
    if ssh.is_match(repository_url) {
        return Ok(());
    }

    let url = url::Url::parse(repository_url)
        .map_err(|error| format!("invalid source.gitRepository.URL value: {error}"))?;

    match (url.scheme(), url.host_str()) {
        ("http" | "https", Some(_)) => Ok(()),
        _ => Err(format!(
            "invalid source.gitRepository.URL value: {repository_url} is not an http(s) or ssh URL"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crds::v1alpha2::{
        FunctionSpec, RepositoryAuth, ResourceConfiguration, ResourceRequirements as Resources,
        ScaleConfig, SecretMount, Source, Template,
    };
    use k8s_openapi::{
        api::core::v1::EnvVar,
        apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::ObjectMeta},
    };

    fn quantities(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
        BTreeMap::from([
            (String::from("cpu"), Quantity(cpu.to_string())),
            (String::from("memory"), Quantity(memory.to_string())),
        ])
    }

    fn inline_function() -> Function {
        Function {
            metadata: ObjectMeta {
                name: Some(String::from("my-function")),
                namespace: Some(String::from("default")),
                ..ObjectMeta::default()
            },
            spec: FunctionSpec {
                runtime: Some(Runtime::NodeJs18),
                source: Source {
                    inline: Some(InlineSource {
                        source: String::from("module.exports = { main: () => 'ok' }"),
                        dependencies: String::from("{}"),
                    }),
                    git_repository: None,
                },
                replicas: Some(1),
                ..FunctionSpec::default()
            },
            status: None,
        }
    }

    fn git_function(url: &str, auth: Option<RepositoryAuth>) -> Function {
        let mut function = inline_function();
        function.spec.source = Source {
            inline: None,
            git_repository: Some(GitRepositorySource {
                url: url.to_string(),
                auth,
                repository: crate::crds::v1alpha2::Repository {
                    base_dir: String::from("/"),
                    reference: String::from("main"),
                },
            }),
        };
        function
    }

    fn basic_auth() -> Option<RepositoryAuth> {
        Some(RepositoryAuth {
            auth_type: RepositoryAuthType::Basic,
            secret_name: String::from("git-creds"),
        })
    }

    #[test]
    fn valid_inline_function_passes() {
        validate(&inline_function(), &ValidationConfig::default()).unwrap();
    }

    #[test]
    fn reports_every_missing_metadata_field() {
        let mut function = inline_function();
        function.metadata = ObjectMeta::default();

        let error = validate(&function, &ValidationConfig::default()).unwrap_err();
        let message = error.to_string();

        assert!(message.contains("metadata.name"));
        assert!(message.contains("metadata.namespace"));
    }

    #[test]
    fn aggregates_unrelated_violations() {
        let mut function = inline_function();
        function.spec.runtime = Some(Runtime::Unsupported(String::from("cobol85")));
        function.spec.env = vec![EnvVar {
            name: String::from("FUNC_HANDLER"),
            ..EnvVar::default()
        }];

        let error = validate(&function, &ValidationConfig::default()).unwrap_err();

        assert!(error
            .messages()
            .iter()
            .any(|message| message == "spec.runtime contains unsupported value"));
        assert!(error
            .messages()
            .iter()
            .any(|message| message.contains("env name is reserved for the serverless domain")));
        assert!(error
            .messages()
            .iter()
            .any(|message| message.contains("cannot find runtime: cobol85")));
    }

    #[test]
    fn unknown_source_type_stops_branch_checks() {
        let mut function = inline_function();
        function.spec.source = Source::default();

        let error = validate(&function, &ValidationConfig::default()).unwrap_err();
        assert_eq!(
            error.messages(),
            &[
                String::from("spec.source should contains only 1 configuration of function"),
                String::from(UNKNOWN_SOURCE_TYPE),
            ]
        );
    }

    #[test]
    fn inline_source_must_not_be_empty() {
        let mut function = inline_function();
        if let Some(inline) = function.spec.source.inline.as_mut() {
            inline.source.clear();
            inline.dependencies = String::from("left-pad");
        }

        let error = validate(&function, &ValidationConfig::default()).unwrap_err();
        assert!(error
            .messages()
            .contains(&String::from("empty source.inline.source value")));
        assert!(error.messages().iter().any(|message| message
            .starts_with("invalid source.inline.dependencies value")));
    }

    #[test]
    fn python_dependencies_are_free_form() {
        assert!(validate_dependencies(Some(&Runtime::Python39), "requests==2.31.0").is_ok());
        assert!(validate_dependencies(Some(&Runtime::NodeJs16), "  ").is_ok());
        assert!(validate_dependencies(Some(&Runtime::NodeJs16), "left-pad").is_err());
    }

    #[test]
    fn git_urls() {
        assert!(validate_git_url("git@github.com:org/repo.git").is_ok());
        assert!(validate_git_url("git@github.com:org/repo").is_ok());
        assert!(validate_git_url("https://github.com/org/repo.git").is_ok());
        assert!(validate_git_url("ssh://git@github.com/org/repo.git").is_ok());
        assert!(validate_git_url("github.com/org/repo.git").is_err());
        assert!(validate_git_url("g0t@github.com:org/repo").is_err());
        assert!(validate_git_url("http://git.example.com/repo").is_ok());
        assert!(validate_git_url("mailto:x").is_err());
        assert!(validate_git_url("file:repo").is_err());
        assert!(validate_git_url("file:///srv/repo.git").is_err());
    }

    #[test]
    fn git_url_is_only_checked_with_auth() {
        let config = ValidationConfig::default();

        validate(&git_function("github.com/org/repo.git", None), &config).unwrap();

        let error = validate(&git_function("github.com/org/repo.git", basic_auth()), &config)
            .unwrap_err();
        assert_eq!(error.messages().len(), 1);
        assert!(error.messages()[0].starts_with("invalid source.gitRepository.URL value"));
    }

    #[test]
    fn git_auth_fields() {
        let auth = Some(RepositoryAuth {
            auth_type: RepositoryAuthType::Unsupported(String::from("token")),
            secret_name: String::from(" "),
        });

        let error = validate(
            &git_function("https://github.com/org/repo.git", auth),
            &ValidationConfig::default(),
        )
        .unwrap_err();

        assert_eq!(
            error.messages(),
            &[
                String::from("invalid git repository authentication type"),
                String::from("spec.source.gitRepository.auth.secretName is required"),
            ]
        );
    }

    #[test]
    fn git_repository_requires_base_dir_and_reference() {
        let mut function = git_function("https://github.com/org/repo.git", None);
        if let Some(git) = function.spec.source.git_repository.as_mut() {
            git.repository.base_dir.clear();
            git.repository.reference.clear();
        }

        let error = validate(&function, &ValidationConfig::default()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "[[spec.source.gitRepository.baseDir is required spec.source.gitRepository.reference is required]]"
        );
    }

    #[test]
    fn replicas_bounds() {
        let mut function = inline_function();
        function.spec.replicas = Some(3);
        function.spec.scale_config = Some(ScaleConfig {
            min_replicas: Some(3),
            max_replicas: Some(2),
        });
        let error = validate(&function, &ValidationConfig::default()).unwrap_err();
        assert_eq!(
            error.messages(),
            &[String::from(
                "invalid values: [spec.maxReplicas(2) is less than spec.minReplicas(3)]"
            )]
        );

        function.spec.scale_config = Some(ScaleConfig {
            min_replicas: Some(0),
            max_replicas: Some(0),
        });
        function.spec.replicas = Some(0);
        let error = validate(&function, &ValidationConfig::default()).unwrap_err();
        assert_eq!(error.messages().len(), 1);
        assert!(error.messages()[0]
            .contains("spec.minReplicas(0) is less than the smallest allowed value(1)"));
        assert!(error.messages()[0]
            .contains("spec.maxReplicas(0) is less than the smallest allowed value(1)"));
    }

    #[test]
    fn replicas_and_scale_config_must_agree() {
        let mut function = inline_function();
        function.spec.replicas = None;
        let error = validate(&function, &ValidationConfig::default()).unwrap_err();
        assert!(error.messages()[0].contains("empty at the same time"));

        function.spec.replicas = Some(2);
        function.spec.scale_config = Some(ScaleConfig {
            min_replicas: Some(1),
            max_replicas: Some(3),
        });
        let error = validate(&function, &ValidationConfig::default()).unwrap_err();
        assert!(error.messages()[0].contains("set at the same time"));
    }

    #[test]
    fn resources_below_floor_and_inverted() {
        let mut function = inline_function();
        function.spec.resource_configuration = Some(ResourceConfiguration {
            function: Some(Resources {
                profile: None,
                resources: Some(ResourceRequirements {
                    requests: Some(quantities("5m", "64Mi")),
                    limits: Some(quantities("100m", "32Mi")),
                    ..ResourceRequirements::default()
                }),
            }),
            build: None,
        });

        let error = validate(&function, &ValidationConfig::default()).unwrap_err();
        assert_eq!(
            error.messages(),
            &[String::from(
                "invalid function resources: [\
                spec.resourceConfiguration.function.resources.requests.cpu(5m) \
                should be higher than minimal value (10m) \
                spec.resourceConfiguration.function.resources.limits.memory(32Mi) \
                should be higher than \
                spec.resourceConfiguration.function.resources.requests.memory(64Mi)]"
            )]
        );
    }

    #[test]
    fn build_floor_is_separate() {
        let mut function = inline_function();
        function.spec.resource_configuration = Some(ResourceConfiguration {
            function: None,
            build: Some(Resources {
                profile: Some(String::from("custom")),
                resources: Some(ResourceRequirements {
                    requests: Some(quantities("100m", "100Mi")),
                    ..ResourceRequirements::default()
                }),
            }),
        });

        let error = validate(&function, &ValidationConfig::default()).unwrap_err();
        let message = &error.messages()[0];
        assert!(message.contains(
            "build.resources.requests.cpu(100m) should be higher than minimal value (200m)"
        ));
        assert!(message.contains(
            "build.resources.requests.memory(100Mi) should be higher than minimal value (200Mi)"
        ));
    }

    #[test]
    fn label_rules() {
        let mut function = inline_function();
        function.spec.labels = Some(BTreeMap::from([
            (String::from("app"), String::from("one")),
            (String::from("serverless.operato.rs/owned"), String::from("true")),
        ]));
        function.spec.template = Some(Template {
            labels: Some(BTreeMap::from([(String::from("app"), String::from("two"))])),
        });

        let error = validate(&function, &ValidationConfig::default()).unwrap_err();
        let message = &error.messages()[0];
        assert!(message.contains("label from domain serverless.operato.rs is not allowed"));
        assert!(message.contains("conflict between labels"));

        function.spec.template = Some(Template {
            labels: Some(BTreeMap::from([(String::from("app"), String::from("one"))])),
        });
        function.spec.labels = Some(BTreeMap::from([(String::from("app"), String::from("one"))]));
        validate(&function, &ValidationConfig::default()).unwrap();
    }

    #[test]
    fn annotation_keys_must_be_qualified() {
        let mut function = inline_function();
        function.spec.annotations = Some(BTreeMap::from([(
            String::from("bad key"),
            String::from("value"),
        )]));

        let error = validate(&function, &ValidationConfig::default()).unwrap_err();
        assert!(error.messages()[0].starts_with("spec.annotations: Invalid value: \"bad key\""));
    }

    #[test]
    fn secret_mount_rules() {
        let mut function = inline_function();
        function.spec.secret_mounts = vec![
            SecretMount {
                secret_name: String::from("creds"),
                mount_path: String::from("/creds"),
            },
            SecretMount {
                secret_name: String::from("creds"),
                mount_path: String::new(),
            },
        ];

        let error = validate(&function, &ValidationConfig::default()).unwrap_err();
        assert_eq!(
            error.messages(),
            &[String::from(
                "invalid spec.secretMounts: [secretNames should be unique mountPath should not be empty]"
            )]
        );
    }
}
