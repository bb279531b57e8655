use crate::quantity::{self, QuantityError};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path};
use thiserror::Error as ThisError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub validation: ValidationConfig,
    pub defaulting: DefaultingConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationConfig {
    /// Environment variable names a function may not set.
    pub reserved_envs: Vec<String>,
    pub function: MinFunctionValues,
    pub build_job: MinBuildJobValues,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MinFunctionValues {
    pub replicas: MinReplicasValues,
    pub resources: MinResourcesValues,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MinBuildJobValues {
    pub resources: MinResourcesValues,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct MinReplicasValues {
    pub min_value: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MinResourcesValues {
    #[serde(rename = "minRequestCPU")]
    pub min_request_cpu: Quantity,
    #[serde(rename = "minRequestMemory")]
    pub min_request_memory: Quantity,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultingConfig {
    pub function: FunctionDefaulting,
    pub build_job: BuildJobDefaulting,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FunctionDefaulting {
    pub replicas: ReplicasDefaulting,
    pub resources: FunctionResourcesDefaulting,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildJobDefaulting {
    pub resources: ResourcesDefaulting,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplicasDefaulting {
    pub default_preset: String,
    pub presets: BTreeMap<String, ReplicasPreset>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReplicasPreset {
    pub min: i32,
    pub max: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FunctionResourcesDefaulting {
    pub default_preset: String,
    pub presets: BTreeMap<String, ResourcesPreset>,
    /// Maps a runtime name to the preset used when nothing else is set.
    pub runtime_presets: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourcesDefaulting {
    pub default_preset: String,
    pub presets: BTreeMap<String, ResourcesPreset>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesPreset {
    pub request_cpu: Quantity,
    pub request_memory: Quantity,
    pub limit_cpu: Quantity,
    pub limit_memory: Quantity,
}

impl ResourcesPreset {
    fn new(request_cpu: &str, request_memory: &str, limit_cpu: &str, limit_memory: &str) -> Self {
        Self {
            request_cpu: Quantity(request_cpu.to_string()),
            request_memory: Quantity(request_memory.to_string()),
            limit_cpu: Quantity(limit_cpu.to_string()),
            limit_memory: Quantity(limit_memory.to_string()),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            reserved_envs: [
                "FUNC_RUNTIME",
                "FUNC_HANDLER",
                "FUNC_PORT",
                "FUNC_TIMEOUT",
                "MOD_NAME",
                "NODE_PATH",
                "PYTHONPATH",
                "KUBELESS_INSTALL_VOLUME",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            function: MinFunctionValues::default(),
            build_job: MinBuildJobValues::default(),
        }
    }
}

impl Default for MinFunctionValues {
    fn default() -> Self {
        Self {
            replicas: MinReplicasValues::default(),
            resources: MinResourcesValues {
                min_request_cpu: Quantity(String::from("10m")),
                min_request_memory: Quantity(String::from("16Mi")),
            },
        }
    }
}

impl Default for MinBuildJobValues {
    fn default() -> Self {
        Self {
            resources: MinResourcesValues {
                min_request_cpu: Quantity(String::from("200m")),
                min_request_memory: Quantity(String::from("200Mi")),
            },
        }
    }
}

impl Default for MinReplicasValues {
    fn default() -> Self {
        Self { min_value: 1 }
    }
}

impl Default for MinResourcesValues {
    fn default() -> Self {
        MinFunctionValues::default().resources
    }
}

impl Default for ReplicasDefaulting {
    fn default() -> Self {
        let presets = [
            ("S", ReplicasPreset { min: 1, max: 1 }),
            ("M", ReplicasPreset { min: 1, max: 5 }),
            ("L", ReplicasPreset { min: 1, max: 10 }),
        ]
        .into_iter()
        .map(|(name, preset)| (name.to_string(), preset))
        .collect();

        Self {
            default_preset: String::from("S"),
            presets,
        }
    }
}

impl Default for FunctionResourcesDefaulting {
    fn default() -> Self {
        let presets = [
            ("XS", ResourcesPreset::new("10m", "16Mi", "25m", "32Mi")),
            ("S", ResourcesPreset::new("25m", "32Mi", "50m", "64Mi")),
            ("M", ResourcesPreset::new("50m", "64Mi", "100m", "128Mi")),
            ("L", ResourcesPreset::new("100m", "128Mi", "200m", "256Mi")),
            ("XL", ResourcesPreset::new("200m", "256Mi", "400m", "512Mi")),
        ]
        .into_iter()
        .map(|(name, preset)| (name.to_string(), preset))
        .collect();

        Self {
            default_preset: String::from("M"),
            presets,
            runtime_presets: BTreeMap::new(),
        }
    }
}

impl Default for ResourcesDefaulting {
    fn default() -> Self {
        let presets = [
            ("slow", ResourcesPreset::new("350m", "350Mi", "700m", "700Mi")),
            ("normal", ResourcesPreset::new("700m", "700Mi", "1100m", "1100Mi")),
            ("fast", ResourcesPreset::new("1100m", "1100Mi", "1800m", "1800Mi")),
        ]
        .into_iter()
        .map(|(name, preset)| (name.to_string(), preset))
        .collect();

        Self {
            default_preset: String::from("normal"),
            presets,
        }
    }
}

#[derive(ThisError, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[source] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[source] serde_yaml::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(#[source] VerifyError),
}

#[derive(ThisError, Debug)]
pub enum VerifyError {
    #[error("{path}: {error}")]
    Quantity {
        path: String,
        #[source]
        error: QuantityError,
    },
    #[error("{path}: unknown preset {preset:?}")]
    UnknownPreset { path: String, preset: String },
    #[error("{path}: min ({min}) is greater than max ({max})")]
    ReplicasBounds { path: String, min: i32, max: i32 },
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(ConfigError::Read)?;

        Self::from_yaml(&content)
    }

    /// Parses and verifies a configuration document.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content).map_err(ConfigError::Parse)?;
        config.verify().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(ConfigError::Serialize)
    }

    /// Checks every quantity and preset reference so that defaulting and
    /// validation never meet a broken configuration at request time.
    pub fn verify(&self) -> Result<(), VerifyError> {
        let validation = &self.validation;
        verify_min_resources(
            &validation.function.resources,
            "validation.function.resources",
        )?;
        verify_min_resources(
            &validation.build_job.resources,
            "validation.buildJob.resources",
        )?;

        let replicas = &self.defaulting.function.replicas;
        for (name, preset) in replicas.presets.iter() {
            if preset.min > preset.max {
                return Err(VerifyError::ReplicasBounds {
                    path: format!("defaulting.function.replicas.presets.{name}"),
                    min: preset.min,
                    max: preset.max,
                });
            }
        }
        verify_preset_name(
            &replicas.presets,
            &replicas.default_preset,
            "defaulting.function.replicas.defaultPreset",
        )?;

        let function = &self.defaulting.function.resources;
        verify_resource_presets(&function.presets, "defaulting.function.resources.presets")?;
        verify_preset_name(
            &function.presets,
            &function.default_preset,
            "defaulting.function.resources.defaultPreset",
        )?;
        for (runtime, preset) in function.runtime_presets.iter() {
            verify_preset_name(
                &function.presets,
                preset,
                &format!("defaulting.function.resources.runtimePresets.{runtime}"),
            )?;
        }

        let build = &self.defaulting.build_job.resources;
        verify_resource_presets(&build.presets, "defaulting.buildJob.resources.presets")?;
        verify_preset_name(
            &build.presets,
            &build.default_preset,
            "defaulting.buildJob.resources.defaultPreset",
        )?;

        Ok(())
    }
}

fn verify_quantity(quantity: &Quantity, path: String) -> Result<(), VerifyError> {
    quantity::parse(quantity)
        .map(|_| ())
        .map_err(|error| VerifyError::Quantity { path, error })
}

fn verify_min_resources(values: &MinResourcesValues, path: &str) -> Result<(), VerifyError> {
    verify_quantity(&values.min_request_cpu, format!("{path}.minRequestCPU"))?;
    verify_quantity(&values.min_request_memory, format!("{path}.minRequestMemory"))
}

fn verify_resource_presets(
    presets: &BTreeMap<String, ResourcesPreset>,
    path: &str,
) -> Result<(), VerifyError> {
    for (name, preset) in presets.iter() {
        verify_quantity(&preset.request_cpu, format!("{path}.{name}.requestCpu"))?;
        verify_quantity(&preset.request_memory, format!("{path}.{name}.requestMemory"))?;
        verify_quantity(&preset.limit_cpu, format!("{path}.{name}.limitCpu"))?;
        verify_quantity(&preset.limit_memory, format!("{path}.{name}.limitMemory"))?;
    }

    Ok(())
}

fn verify_preset_name<T>(
    presets: &BTreeMap<String, T>,
    preset: &str,
    path: &str,
) -> Result<(), VerifyError> {
    if presets.contains_key(preset) {
        return Ok(());
    }

    Err(VerifyError::UnknownPreset {
        path: path.to_string(),
        preset: preset.to_string(),
    })
}
