//! Defaulting of v1alpha2 functions.
//!
//! Defaulting never fails. Presets are looked up by name and a missing preset
//! leaves the affected fields untouched; [`Config::verify`](crate::config::Config::verify)
//! rejects such configurations at startup.

use crate::{
    config::{DefaultingConfig, ReplicasDefaulting, ResourcesPreset},
    consts::{BUILD_RESOURCES_PRESET_LABEL, FUNCTION_RESOURCES_PRESET_LABEL},
    crds::v1alpha2::{Function, FunctionSpec, ResourceRequirements},
    quantity,
};
use k8s_openapi::{
    api::core::v1::ResourceRequirements as CoreResources,
    apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::ObjectMeta},
};
use std::collections::BTreeMap;

/// Deprecated preset labels, removed from the object once read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresetLabels {
    pub function: Option<String>,
    pub build: Option<String>,
}

impl PresetLabels {
    /// Removes both preset labels from `metadata` and returns their values.
    pub fn take(metadata: &mut ObjectMeta) -> Self {
        let Some(labels) = metadata.labels.as_mut() else {
            return Self::default();
        };

        let taken = Self {
            function: labels.remove(FUNCTION_RESOURCES_PRESET_LABEL),
            build: labels.remove(BUILD_RESOURCES_PRESET_LABEL),
        };

        if taken != Self::default() && labels.is_empty() {
            metadata.labels = None;
        }

        taken
    }
}

/// Where the effective resources of a component come from, highest precedence first.
#[derive(Debug)]
enum Resolution<'a> {
    /// `resourceConfiguration.<component>.profile` names a known preset.
    Profile(&'a ResourcesPreset),
    /// The deprecated preset label names a known preset.
    Label(&'a ResourcesPreset),
    /// Explicit resources, completed from the fallback preset.
    Explicit(&'a CoreResources, Option<&'a ResourcesPreset>),
    /// Runtime or global default preset.
    Fallback(&'a ResourcesPreset),
    Unresolved,
}

impl Resolution<'_> {
    fn into_resources(self) -> Option<CoreResources> {
        match self {
            Resolution::Profile(preset)
            | Resolution::Label(preset)
            | Resolution::Fallback(preset) => Some(CoreResources::from(preset)),
            Resolution::Explicit(explicit, Some(fallback)) => Some(complete(explicit, fallback)),
            Resolution::Explicit(explicit, None) => Some(explicit.clone()),
            Resolution::Unresolved => None,
        }
    }
}

impl From<&ResourcesPreset> for CoreResources {
    fn from(preset: &ResourcesPreset) -> Self {
        CoreResources {
            requests: Some(BTreeMap::from([
                (String::from("cpu"), preset.request_cpu.clone()),
                (String::from("memory"), preset.request_memory.clone()),
            ])),
            limits: Some(BTreeMap::from([
                (String::from("cpu"), preset.limit_cpu.clone()),
                (String::from("memory"), preset.limit_memory.clone()),
            ])),
            ..CoreResources::default()
        }
    }
}

pub fn set_defaults(function: &mut Function, config: &DefaultingConfig) {
    let labels = PresetLabels::take(&mut function.metadata);
    let spec = &mut function.spec;

    default_scaling(spec, &config.function.replicas);
    default_function_resources(spec, labels.function.as_deref(), config);
    default_build_resources(spec, labels.build.as_deref(), config);
}

fn default_scaling(spec: &mut FunctionSpec, config: &ReplicasDefaulting) {
    let Some(preset) = config.presets.get(&config.default_preset) else {
        return;
    };

    if spec.replicas.is_none() {
        spec.replicas = Some(preset.min);
    }

    let Some(scale_config) = spec.scale_config.as_mut() else {
        return;
    };

    let min = match (scale_config.min_replicas, scale_config.max_replicas) {
        (Some(min), _) => min,
        (None, Some(max)) => preset.min.min(max),
        (None, None) => preset.min,
    };
    scale_config.min_replicas = Some(min);
    spec.replicas = Some(min);

    if scale_config.max_replicas.is_none() {
        scale_config.max_replicas = Some(preset.max.max(min));
    }
}

fn has_explicit(resources: Option<&CoreResources>) -> bool {
    resources.is_some_and(|resources| resources.limits.is_some() || resources.requests.is_some())
}

fn resolve<'a>(
    component: &'a ResourceRequirements,
    label: Option<&str>,
    presets: &'a BTreeMap<String, ResourcesPreset>,
    fallback: Option<&str>,
) -> Resolution<'a> {
    if let Some(preset) = component.profile().and_then(|profile| presets.get(profile)) {
        return Resolution::Profile(preset);
    }

    if let Some(preset) = label.and_then(|label| presets.get(label)) {
        return Resolution::Label(preset);
    }

    let fallback = fallback.and_then(|fallback| presets.get(fallback));
    match (component.resources.as_ref(), fallback) {
        (Some(explicit), fallback) if has_explicit(Some(explicit)) => {
            Resolution::Explicit(explicit, fallback)
        }
        (_, Some(fallback)) => Resolution::Fallback(fallback),
        (_, None) => Resolution::Unresolved,
    }
}

fn default_function_resources(
    spec: &mut FunctionSpec,
    label: Option<&str>,
    config: &DefaultingConfig,
) {
    let defaulting = &config.function.resources;

    let fallback = spec
        .runtime
        .as_ref()
        .and_then(|runtime| defaulting.runtime_presets.get(runtime.as_str()))
        .unwrap_or(&defaulting.default_preset);

    let component = spec
        .resource_configuration
        .get_or_insert_with(Default::default)
        .function
        .get_or_insert_with(Default::default);

    let resolved = resolve(component, label, &defaulting.presets, Some(fallback)).into_resources();
    if let Some(resources) = resolved {
        component.resources = Some(resources);
    }
}

fn default_build_resources(
    spec: &mut FunctionSpec,
    label: Option<&str>,
    config: &DefaultingConfig,
) {
    let defaulting = &config.build_job.resources;

    let Some(configuration) = spec.resource_configuration.as_mut() else {
        return;
    };
    if configuration.build.is_none() && label.is_some() {
        configuration.build = Some(ResourceRequirements::default());
    }
    let Some(component) = configuration.build.as_mut() else {
        return;
    };

    let touched = label.is_some()
        || component.profile().is_some()
        || has_explicit(component.resources.as_ref());
    if !touched {
        return;
    }

    let resolved = resolve(
        component,
        label,
        &defaulting.presets,
        Some(&defaulting.default_preset),
    )
    .into_resources();
    if let Some(resources) = resolved {
        component.resources = Some(resources);
    }
}

/// Fills the cpu and memory entries missing from `explicit` with the preset's.
///
/// A filled request never exceeds an explicit limit and a filled limit is
/// never below an explicit request.
fn complete(explicit: &CoreResources, preset: &ResourcesPreset) -> CoreResources {
    let mut requests = explicit.requests.clone().unwrap_or_default();
    let mut limits = explicit.limits.clone().unwrap_or_default();

    let components = [
        ("cpu", &preset.request_cpu, &preset.limit_cpu),
        ("memory", &preset.request_memory, &preset.limit_memory),
    ];

    for (resource, preset_request, preset_limit) in components {
        match (requests.get(resource), limits.get(resource)) {
            (Some(_), Some(_)) => {}
            (Some(request), None) => {
                let limit = larger(preset_limit, request).clone();
                limits.insert(resource.to_string(), limit);
            }
            (None, Some(limit)) => {
                let request = smaller(preset_request, limit).clone();
                requests.insert(resource.to_string(), request);
            }
            (None, None) => {
                requests.insert(resource.to_string(), preset_request.clone());
                limits.insert(resource.to_string(), preset_limit.clone());
            }
        }
    }

    CoreResources {
        requests: Some(requests),
        limits: Some(limits),
        ..explicit.clone()
    }
}

/// `preset` unless `bound` is larger. Unparseable quantities keep `preset`.
fn larger<'a>(preset: &'a Quantity, bound: &'a Quantity) -> &'a Quantity {
    match quantity::is_less(preset, bound) {
        Ok(true) => bound,
        _ => preset,
    }
}

/// `preset` unless `bound` is smaller. Unparseable quantities keep `preset`.
fn smaller<'a>(preset: &'a Quantity, bound: &'a Quantity) -> &'a Quantity {
    match quantity::is_less(bound, preset) {
        Ok(true) => bound,
        _ => preset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ReplicasPreset,
        crds::v1alpha2::{ResourceConfiguration, Runtime, ScaleConfig},
    };

    fn preset(
        request_cpu: &str,
        request_memory: &str,
        limit_cpu: &str,
        limit_memory: &str,
    ) -> ResourcesPreset {
        ResourcesPreset {
            request_cpu: Quantity(request_cpu.to_string()),
            request_memory: Quantity(request_memory.to_string()),
            limit_cpu: Quantity(limit_cpu.to_string()),
            limit_memory: Quantity(limit_memory.to_string()),
        }
    }

    fn config() -> DefaultingConfig {
        let mut config = DefaultingConfig::default();

        config.function.replicas.default_preset = String::from("S");
        config.function.replicas.presets =
            BTreeMap::from([(String::from("S"), ReplicasPreset { min: 1, max: 1 })]);

        config.function.resources.default_preset = String::from("M");
        config.function.resources.presets = BTreeMap::from([
            (String::from("S"), preset("25m", "32Mi", "50m", "64Mi")),
            (String::from("M"), preset("50m", "64Mi", "100m", "128Mi")),
            (String::from("L"), preset("100m", "128Mi", "200m", "256Mi")),
        ]);
        config.function.resources.runtime_presets =
            BTreeMap::from([(String::from("python39"), String::from("L"))]);

        config.build_job.resources.default_preset = String::from("normal");
        config.build_job.resources.presets = BTreeMap::from([
            (String::from("slow"), preset("350m", "350Mi", "700m", "700Mi")),
            (String::from("normal"), preset("700m", "700Mi", "1100m", "1100Mi")),
            (String::from("fast"), preset("1100m", "1100Mi", "1800m", "1800Mi")),
        ]);

        config
    }

    fn resources(requests: Option<(&str, &str)>, limits: Option<(&str, &str)>) -> CoreResources {
        let list = |(cpu, memory): (&str, &str)| {
            BTreeMap::from([
                (String::from("cpu"), Quantity(cpu.to_string())),
                (String::from("memory"), Quantity(memory.to_string())),
            ])
        };

        CoreResources {
            requests: requests.map(list),
            limits: limits.map(list),
            ..CoreResources::default()
        }
    }

    fn component(
        profile: Option<&str>,
        resources: Option<CoreResources>,
    ) -> Option<ResourceRequirements> {
        Some(ResourceRequirements {
            profile: profile.map(String::from),
            resources,
        })
    }

    fn preset_labels(
        function: Option<&str>,
        build: Option<&str>,
    ) -> Option<BTreeMap<String, String>> {
        let mut labels = BTreeMap::new();
        if let Some(function) = function {
            labels.insert(FUNCTION_RESOURCES_PRESET_LABEL.to_string(), function.to_string());
        }
        if let Some(build) = build {
            labels.insert(BUILD_RESOURCES_PRESET_LABEL.to_string(), build.to_string());
        }
        Some(labels)
    }

    fn m_resources() -> CoreResources {
        resources(Some(("50m", "64Mi")), Some(("100m", "128Mi")))
    }

    #[test]
    fn minimal_function() {
        let mut function = Function::default();

        set_defaults(&mut function, &config());

        assert_eq!(function.spec.replicas, Some(1));
        assert_eq!(function.spec.scale_config, None);
        assert_eq!(
            function.spec.resource_configuration,
            Some(ResourceConfiguration {
                function: component(None, Some(m_resources())),
                build: None,
            })
        );
    }

    #[test]
    fn fully_specified_function_is_untouched() {
        let mut function = Function::default();
        function.spec.runtime = Some(Runtime::Python39);
        function.spec.resource_configuration = Some(ResourceConfiguration {
            function: component(
                None,
                Some(resources(Some(("90m", "84Mi")), Some(("150m", "158Mi")))),
            ),
            build: component(
                None,
                Some(resources(Some(("374m", "300Mi")), Some(("400m", "321Mi")))),
            ),
        });
        function.spec.scale_config = Some(ScaleConfig {
            min_replicas: Some(2),
            max_replicas: Some(2),
        });

        let mut expected = function.clone();
        expected.spec.replicas = Some(2);

        set_defaults(&mut function, &config());
        assert_eq!(function, expected);
    }

    #[test]
    fn scale_config_is_clamped() {
        let mut function = Function::default();
        function.spec.scale_config = Some(ScaleConfig {
            min_replicas: None,
            max_replicas: Some(0),
        });

        set_defaults(&mut function, &config());
        assert_eq!(
            function.spec.scale_config,
            Some(ScaleConfig {
                min_replicas: Some(0),
                max_replicas: Some(0),
            })
        );
        assert_eq!(function.spec.replicas, Some(0));

        let mut function = Function::default();
        function.spec.scale_config = Some(ScaleConfig {
            min_replicas: Some(2),
            max_replicas: None,
        });

        set_defaults(&mut function, &config());
        assert_eq!(
            function.spec.scale_config,
            Some(ScaleConfig {
                min_replicas: Some(2),
                max_replicas: Some(2),
            })
        );
        assert_eq!(function.spec.replicas, Some(2));
    }

    #[test]
    fn profile_wins_over_explicit_resources() {
        let mut function = Function::default();
        function.spec.runtime = Some(Runtime::NodeJs16);
        function.spec.resource_configuration = Some(ResourceConfiguration {
            function: component(Some("S"), Some(resources(Some(("15m", "15Mi")), None))),
            build: component(Some("slow"), Some(resources(Some(("250m", "250Mi")), None))),
        });

        set_defaults(&mut function, &config());

        assert_eq!(
            function.spec.resource_configuration,
            Some(ResourceConfiguration {
                function: component(
                    Some("S"),
                    Some(resources(Some(("25m", "32Mi")), Some(("50m", "64Mi"))))
                ),
                build: component(
                    Some("slow"),
                    Some(resources(Some(("350m", "350Mi")), Some(("700m", "700Mi"))))
                ),
            })
        );
    }

    #[test]
    fn profile_wins_over_preset_label() {
        let mut function = Function::default();
        function.metadata.labels = preset_labels(Some("L"), Some("fast"));
        function.spec.resource_configuration = Some(ResourceConfiguration {
            function: component(Some("S"), None),
            build: component(Some("slow"), None),
        });

        set_defaults(&mut function, &config());

        assert_eq!(function.metadata.labels, None);
        assert_eq!(
            function.spec.function_resources(),
            component(Some("S"), Some(resources(Some(("25m", "32Mi")), Some(("50m", "64Mi")))))
                .as_ref()
        );
        assert_eq!(
            function.spec.build_resources(),
            component(
                Some("slow"),
                Some(resources(Some(("350m", "350Mi")), Some(("700m", "700Mi"))))
            )
            .as_ref()
        );
    }

    #[test]
    fn preset_labels_are_consumed() {
        let mut function = Function::default();
        function.metadata.labels = preset_labels(Some("S"), Some("slow"));
        function.spec.resource_configuration = Some(ResourceConfiguration {
            function: component(None, Some(resources(Some(("15m", "15Mi")), None))),
            build: None,
        });

        set_defaults(&mut function, &config());

        assert_eq!(function.metadata.labels, None);
        assert_eq!(
            function.spec.resource_configuration,
            Some(ResourceConfiguration {
                function: component(
                    None,
                    Some(resources(Some(("25m", "32Mi")), Some(("50m", "64Mi"))))
                ),
                build: component(
                    None,
                    Some(resources(Some(("350m", "350Mi")), Some(("700m", "700Mi"))))
                ),
            })
        );
    }

    #[test]
    fn other_labels_survive_preset_label_removal() {
        let mut metadata = ObjectMeta {
            labels: preset_labels(Some("S"), None),
            ..ObjectMeta::default()
        };
        if let Some(labels) = metadata.labels.as_mut() {
            labels.insert(String::from("app"), String::from("demo"));
        }

        let taken = PresetLabels::take(&mut metadata);

        assert_eq!(taken.function.as_deref(), Some("S"));
        assert_eq!(taken.build, None);
        assert_eq!(
            metadata.labels,
            Some(BTreeMap::from([(String::from("app"), String::from("demo"))]))
        );
    }

    #[test]
    fn runtime_preset_is_used_when_nothing_else_is_set() {
        let mut function = Function::default();
        function.spec.runtime = Some(Runtime::Python39);

        set_defaults(&mut function, &config());

        assert_eq!(
            function.spec.function_resources(),
            component(
                None,
                Some(resources(Some(("100m", "128Mi")), Some(("200m", "256Mi"))))
            )
            .as_ref()
        );
    }

    #[test]
    fn explicit_profile_beats_runtime_preset() {
        let mut function = Function::default();
        function.spec.runtime = Some(Runtime::Python39);
        function.spec.resource_configuration = Some(ResourceConfiguration {
            function: component(Some("M"), None),
            build: None,
        });

        set_defaults(&mut function, &config());

        assert_eq!(
            function.spec.function_resources(),
            component(Some("M"), Some(m_resources())).as_ref()
        );
    }

    #[test]
    fn build_resources_are_skipped_when_untouched() {
        let mut function = Function::default();
        function.spec.runtime = Some(Runtime::NodeJs18);
        function.spec.resource_configuration = Some(ResourceConfiguration {
            function: None,
            build: component(None, None),
        });

        set_defaults(&mut function, &config());

        assert_eq!(function.spec.build_resources(), component(None, None).as_ref());
    }

    #[test]
    fn partial_build_requests_are_completed() {
        let mut function = Function::default();
        function.spec.resource_configuration = Some(ResourceConfiguration {
            function: None,
            build: component(None, Some(resources(Some(("1200m", "500Mi")), None))),
        });

        set_defaults(&mut function, &config());

        assert_eq!(
            function.spec.build_resources(),
            component(
                None,
                Some(resources(Some(("1200m", "500Mi")), Some(("1200m", "1100Mi"))))
            )
            .as_ref()
        );
    }

    #[test]
    fn partial_function_limits_clamp_requests() {
        let mut function = Function::default();
        function.spec.resource_configuration = Some(ResourceConfiguration {
            function: component(None, Some(resources(None, Some(("15m", "15Mi"))))),
            build: None,
        });

        set_defaults(&mut function, &config());

        assert_eq!(
            function.spec.function_resources(),
            component(None, Some(resources(Some(("15m", "15Mi")), Some(("15m", "15Mi"))))).as_ref()
        );
    }

    #[test]
    fn defaulting_is_idempotent() {
        let mut function = Function::default();
        function.metadata.labels = preset_labels(Some("L"), Some("fast"));
        function.spec.runtime = Some(Runtime::NodeJs18);
        function.spec.scale_config = Some(ScaleConfig {
            min_replicas: None,
            max_replicas: Some(3),
        });
        function.spec.resource_configuration = Some(ResourceConfiguration {
            function: None,
            build: component(None, Some(resources(None, Some(("900m", "2Gi"))))),
        });

        set_defaults(&mut function, &config());
        let once = function.clone();
        set_defaults(&mut function, &config());

        assert_eq!(function, once);
    }
}
