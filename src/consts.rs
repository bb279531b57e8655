use const_format::concatcp;

pub const GROUP: &str = "serverless.operato.rs";

pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

pub const DISPLAY_NAME: &str = "Serverless OperatoRS";

pub const CONFIG_PATH_ENV_VAR: &str = "SERVERLESS_CONFIG_PATH";

pub const WEBHOOK_ADDRESS_ENV_VAR: &str = "SERVERLESS_WEBHOOK_ADDRESS";
pub const WEBHOOK_DEFAULT_ADDRESS: &str = "0.0.0.0:8443";

pub const WEBHOOK_TLS_CERT_ENV_VAR: &str = "SERVERLESS_WEBHOOK_TLS_CERT";
pub const WEBHOOK_TLS_KEY_ENV_VAR: &str = "SERVERLESS_WEBHOOK_TLS_KEY";

pub const WEBHOOK_SERVICE_ENV_VAR: &str = "SERVERLESS_WEBHOOK_SERVICE";
pub const WEBHOOK_NAMESPACE_ENV_VAR: &str = "SERVERLESS_WEBHOOK_NAMESPACE";
pub const WEBHOOK_DEFAULT_NAMESPACE: &str = "serverless-system";

pub const CONVERT_PATH: &str = "/convert";
pub const DEFAULTING_PATH: &str = "/defaulting";
pub const VALIDATION_PATH: &str = "/validation";
pub const HEALTH_PATH: &str = "/healthz";

/// Name of the v1alpha1 GitRepository a v1alpha2 Function was upgraded from.
pub const GIT_REPO_NAME_ANNOTATION: &str = concatcp!(GROUP, "/v1alpha1GitRepoName");

/// JSON encoded secret mounts carried by a v1alpha1 Function.
pub const SECRET_MOUNTS_ANNOTATION: &str = concatcp!(GROUP, "/v1alpha2SecretMounts");

/// Deprecated preset labels. Consumed by conversion and defaulting.
pub const FUNCTION_RESOURCES_PRESET_LABEL: &str = concatcp!(GROUP, "/function-resources-preset");
pub const BUILD_RESOURCES_PRESET_LABEL: &str = concatcp!(GROUP, "/build-resources-preset");

pub const RESERVED_LABEL_PREFIX: &str = concatcp!(GROUP, "/");
