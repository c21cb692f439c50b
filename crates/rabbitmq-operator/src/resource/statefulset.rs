//! Broker StatefulSet (`<name>-server`)
//!
//! `build` carries the fields Kubernetes refuses to change after creation
//! (selector, service name, volume claim templates). `update` patches the
//! pod template in place: the `rabbitmq` container is located by name and
//! only the fields set here are overwritten, so values defaulted by the API
//! server and annotations written by others survive.
//!
//! The pod template also carries the fingerprint of the server configuration
//! the pods run with. A changed fingerprint changes the template, and the
//! StatefulSet controller rolls every pod once. Since the fingerprint lives on
//! the object, a pass that fails after writing new configuration still rolls
//! the pods on the next pass.

use super::headless_service::EPMD_PORT;
use super::ingress_service::client_ports;
use super::server_configmap::{
    ADVANCED_CONFIG_KEY, ENV_CONFIG_KEY, OPERATOR_DEFAULTS_KEY, USER_CONFIGURATION_KEY,
};
use super::{
    RabbitmqResourceBuilder, ResourceBuilder, ADMIN_SECRET_SUFFIX, ERLANG_COOKIE_SUFFIX,
    HEADLESS_SERVICE_SUFFIX, SERVER_CONFIG_MAP_SUFFIX, SERVER_SUFFIX,
};
use crate::error::Result;
use crate::metadata;
use crate::resource::erlang_cookie::COOKIE_KEY;
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, ContainerPort, EnvVar, EnvVarSource, KeyToPath,
    LocalObjectReference, ObjectFieldSelector, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PodSecurityContext, PodSpec, Probe, ProjectedVolumeSource,
    ResourceRequirements, SecretProjection, SecretVolumeSource, TCPSocketAction, Volume,
    VolumeMount, VolumeProjection, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Pod template annotation carrying the restart-relevant configuration hash
pub const CONFIG_FINGERPRINT_ANNOTATION: &str = "rabbitmq.com/config-fingerprint";

const CONTAINER_NAME: &str = "rabbitmq";
const PERSISTENCE_VOLUME: &str = "persistence";
const RABBITMQ_UID: i64 = 999;

/// Plugins every broker runs
const DEFAULT_PLUGINS: [&str; 2] = ["rabbitmq_management", "rabbitmq_prometheus"];

const SECRET_MODE: i32 = 0o400;
const FILE_MODE: i32 = 0o644;

fn field_env(name: &str, field_path: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value_from: Some(EnvVarSource {
            field_ref: Some(ObjectFieldSelector {
                api_version: Some("v1".to_string()),
                field_path: field_path.to_string(),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn value_env(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.into()),
        ..Default::default()
    }
}

fn key_to_path(key: &str, path: &str) -> KeyToPath {
    KeyToPath {
        key: key.to_string(),
        path: path.to_string(),
        mode: None,
    }
}

fn mount(name: &str, mount_path: &str, sub_path: Option<&str>) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: mount_path.to_string(),
        sub_path: sub_path.map(str::to_string),
        ..Default::default()
    }
}

fn default_resources() -> ResourceRequirements {
    let quantities = |cpu: &str, memory: &str| {
        BTreeMap::from([
            ("cpu".to_string(), Quantity(cpu.to_string())),
            ("memory".to_string(), Quantity(memory.to_string())),
        ])
    };
    ResourceRequirements {
        requests: Some(quantities("1000m", "2Gi")),
        limits: Some(quantities("2000m", "2Gi")),
        ..Default::default()
    }
}

/// Stamp `fingerprint` on the pod template; true when the value changed
fn stamp_fingerprint(statefulset: &mut StatefulSet, fingerprint: &str) -> bool {
    let annotations = statefulset
        .spec
        .get_or_insert_with(StatefulSetSpec::default)
        .template
        .metadata
        .get_or_insert_with(ObjectMeta::default)
        .annotations
        .get_or_insert_with(BTreeMap::new);
    let previous = annotations.insert(
        CONFIG_FINGERPRINT_ANNOTATION.to_string(),
        fingerprint.to_string(),
    );
    previous.as_deref() != Some(fingerprint)
}

/// Builder for the broker StatefulSet
#[derive(Debug)]
pub struct StatefulSetBuilder<'a> {
    base: RabbitmqResourceBuilder<'a>,
    config_fingerprint: Option<String>,
    rolls_pods: bool,
}

impl<'a> StatefulSetBuilder<'a> {
    pub fn new(base: RabbitmqResourceBuilder<'a>) -> Self {
        Self {
            base,
            config_fingerprint: None,
            rolls_pods: false,
        }
    }

    /// Fingerprint of the server configuration the pods should run with
    pub fn set_config_fingerprint(&mut self, fingerprint: Option<String>) {
        self.config_fingerprint = fingerprint;
    }

    /// Whether the last update changed the configuration fingerprint on the
    /// pod template. On an existing StatefulSet this rolls every pod.
    pub fn rolls_pods(&self) -> bool {
        self.rolls_pods
    }

    fn image(&self) -> String {
        self.base
            .instance
            .spec
            .image
            .clone()
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| self.base.config.image.clone())
    }

    fn enabled_plugins(&self) -> String {
        let mut plugins: Vec<&str> = DEFAULT_PLUGINS.to_vec();
        for plugin in &self.base.instance.spec.rabbitmq.additional_plugins {
            if !plugins.contains(&plugin.as_str()) {
                plugins.push(plugin.as_str());
            }
        }
        plugins.join(",")
    }

    fn persistence_claim(&self) -> PersistentVolumeClaim {
        let spec = &self.base.instance.spec.persistence;
        let config = &self.base.config.persistence;
        let storage = spec
            .storage
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| config.storage.clone());

        PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(PERSISTENCE_VOLUME.to_string()),
                labels: Some(self.base.labels()),
                ..Default::default()
            },
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec!["ReadWriteOnce".to_string()]),
                storage_class_name: spec
                    .storage_class_name
                    .clone()
                    .filter(|s| !s.is_empty())
                    .or_else(|| config.storage_class_name.clone()),
                resources: Some(VolumeResourceRequirements {
                    requests: Some(BTreeMap::from([(
                        "storage".to_string(),
                        Quantity(storage),
                    )])),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn volumes(&self) -> Vec<Volume> {
        let spec = &self.base.instance.spec;
        let config_map = self.base.name(SERVER_CONFIG_MAP_SUFFIX);

        let mut volumes = vec![
            Volume {
                name: "server-conf".to_string(),
                config_map: Some(ConfigMapVolumeSource {
                    name: config_map.clone(),
                    items: Some(vec![
                        key_to_path(OPERATOR_DEFAULTS_KEY, OPERATOR_DEFAULTS_KEY),
                        key_to_path(USER_CONFIGURATION_KEY, USER_CONFIGURATION_KEY),
                    ]),
                    default_mode: Some(FILE_MODE),
                    optional: None,
                }),
                ..Default::default()
            },
            // optional keys: both files may be absent
            Volume {
                name: "server-extra-conf".to_string(),
                config_map: Some(ConfigMapVolumeSource {
                    name: config_map,
                    items: Some(vec![
                        key_to_path(ADVANCED_CONFIG_KEY, ADVANCED_CONFIG_KEY),
                        key_to_path(ENV_CONFIG_KEY, ENV_CONFIG_KEY),
                    ]),
                    default_mode: Some(FILE_MODE),
                    optional: Some(true),
                }),
                ..Default::default()
            },
            Volume {
                name: "erlang-cookie".to_string(),
                secret: Some(SecretVolumeSource {
                    secret_name: Some(self.base.name(ERLANG_COOKIE_SUFFIX)),
                    default_mode: Some(SECRET_MODE),
                    ..Default::default()
                }),
                ..Default::default()
            },
            Volume {
                name: "rabbitmq-admin".to_string(),
                secret: Some(SecretVolumeSource {
                    secret_name: Some(self.base.name(ADMIN_SECRET_SUFFIX)),
                    default_mode: Some(SECRET_MODE),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ];

        if let Some(tls_secret) = spec.tls.secret_name.as_ref().filter(|_| spec.tls_enabled()) {
            let mut sources = vec![VolumeProjection {
                secret: Some(SecretProjection {
                    name: tls_secret.clone(),
                    items: Some(vec![
                        key_to_path("tls.crt", "tls.crt"),
                        key_to_path("tls.key", "tls.key"),
                    ]),
                    optional: Some(false),
                }),
                ..Default::default()
            }];
            if spec.mutual_tls_enabled() {
                if let Some(ca_secret) = &spec.tls.ca_secret_name {
                    sources.push(VolumeProjection {
                        secret: Some(SecretProjection {
                            name: ca_secret.clone(),
                            items: Some(vec![key_to_path("ca.crt", "ca.crt")]),
                            optional: Some(false),
                        }),
                        ..Default::default()
                    });
                }
            }
            volumes.push(Volume {
                name: "rabbitmq-tls".to_string(),
                projected: Some(ProjectedVolumeSource {
                    sources: Some(sources),
                    default_mode: Some(SECRET_MODE),
                }),
                ..Default::default()
            });
        }
        volumes
    }

    fn volume_mounts(&self) -> Vec<VolumeMount> {
        let mut mounts = vec![
            mount("server-conf", "/etc/rabbitmq/conf.d/", None),
            mount("server-extra-conf", "/etc/rabbitmq/extra/", None),
            mount(
                "erlang-cookie",
                "/var/lib/rabbitmq/.erlang.cookie",
                Some(COOKIE_KEY),
            ),
            mount("rabbitmq-admin", "/opt/rabbitmq-secret/", None),
            mount(PERSISTENCE_VOLUME, "/var/lib/rabbitmq/mnesia/", None),
        ];
        if self.base.instance.spec.tls_enabled() {
            mounts.push(mount("rabbitmq-tls", "/etc/rabbitmq-tls/", None));
        }
        mounts
    }

    fn env(&self) -> Vec<EnvVar> {
        let headless = self.base.name(HEADLESS_SERVICE_SUFFIX);
        vec![
            field_env("MY_POD_NAME", "metadata.name"),
            field_env("MY_POD_NAMESPACE", "metadata.namespace"),
            value_env("RABBITMQ_USE_LONGNAME", "true"),
            value_env("K8S_SERVICE_NAME", headless),
            value_env(
                "RABBITMQ_NODENAME",
                "rabbit@$(MY_POD_NAME).$(K8S_SERVICE_NAME).$(MY_POD_NAMESPACE)",
            ),
            value_env(
                "K8S_HOSTNAME_SUFFIX",
                ".$(K8S_SERVICE_NAME).$(MY_POD_NAMESPACE)",
            ),
            value_env("RABBITMQ_ENABLED_PLUGINS", self.enabled_plugins()),
            value_env(
                "RABBITMQ_ADVANCED_CONFIG_FILE",
                format!("/etc/rabbitmq/extra/{}", ADVANCED_CONFIG_KEY),
            ),
            value_env(
                "RABBITMQ_CONF_ENV_FILE",
                format!("/etc/rabbitmq/extra/{}", ENV_CONFIG_KEY),
            ),
        ]
    }

    fn ports(&self) -> Vec<ContainerPort> {
        std::iter::once(("epmd", EPMD_PORT))
            .chain(client_ports(&self.base.instance.spec))
            .map(|(name, port)| ContainerPort {
                name: Some(name.to_string()),
                container_port: port,
                protocol: Some("TCP".to_string()),
                ..Default::default()
            })
            .collect()
    }

    fn readiness_probe(&self) -> Probe {
        let port = if self.base.instance.spec.tls_enabled()
            && self.base.instance.spec.disable_non_tls_listeners()
        {
            "amqps"
        } else {
            "amqp"
        };
        Probe {
            tcp_socket: Some(TCPSocketAction {
                port: IntOrString::String(port.to_string()),
                host: None,
            }),
            initial_delay_seconds: Some(10),
            period_seconds: Some(10),
            timeout_seconds: Some(5),
            success_threshold: Some(1),
            failure_threshold: Some(3),
            ..Default::default()
        }
    }

    fn update_container(&self, container: &mut Container) {
        container.image = Some(self.image());
        container.env = Some(self.env());
        container.ports = Some(self.ports());
        container.resources = Some(
            self.base
                .instance
                .spec
                .resources
                .clone()
                .unwrap_or_else(default_resources),
        );
        container.volume_mounts = Some(self.volume_mounts());
        container.readiness_probe = Some(self.readiness_probe());
    }

    fn update_pod_spec(&self, pod_spec: &mut PodSpec) {
        pod_spec.service_account_name = Some(self.base.name(SERVER_SUFFIX));

        let pull_secrets: Vec<LocalObjectReference> = self
            .base
            .image_pull_secret_names()
            .into_iter()
            .map(|name| LocalObjectReference { name })
            .collect();
        pod_spec.image_pull_secrets = (!pull_secrets.is_empty()).then_some(pull_secrets);

        let security = pod_spec
            .security_context
            .get_or_insert_with(PodSecurityContext::default);
        security.fs_group = Some(RABBITMQ_UID);
        security.run_as_user = Some(RABBITMQ_UID);
        security.run_as_group = Some(RABBITMQ_UID);

        pod_spec.volumes = Some(self.volumes());

        match pod_spec
            .containers
            .iter_mut()
            .find(|c| c.name == CONTAINER_NAME)
        {
            Some(container) => self.update_container(container),
            None => {
                let mut container = Container {
                    name: CONTAINER_NAME.to_string(),
                    ..Default::default()
                };
                self.update_container(&mut container);
                pod_spec.containers.push(container);
            }
        }
    }
}

impl ResourceBuilder for StatefulSetBuilder<'_> {
    type Object = StatefulSet;

    fn build(&self) -> Result<StatefulSet> {
        let instance = self.base.instance;
        Ok(StatefulSet {
            metadata: self.base.object_meta(SERVER_SUFFIX),
            spec: Some(StatefulSetSpec {
                service_name: self.base.name(HEADLESS_SERVICE_SUFFIX),
                selector: LabelSelector {
                    match_labels: Some(metadata::label_selector(&instance.name_any())),
                    ..Default::default()
                },
                volume_claim_templates: Some(vec![self.persistence_claim()]),
                pod_management_policy: Some("Parallel".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn update(&mut self, statefulset: &mut StatefulSet) -> Result<()> {
        self.base.update_metadata(&mut statefulset.metadata)?;

        let spec = statefulset
            .spec
            .get_or_insert_with(StatefulSetSpec::default);
        spec.replicas = Some(self.base.instance.spec.replicas);

        let template = spec.template.metadata.get_or_insert_with(ObjectMeta::default);
        template.labels = Some(metadata::reconcile_labels(
            template.labels.as_ref(),
            self.base.labels(),
        ));

        self.update_pod_spec(
            spec.template
                .spec
                .get_or_insert_with(PodSpec::default),
        );

        self.rolls_pods = match self.config_fingerprint.as_deref() {
            Some(fingerprint) => stamp_fingerprint(statefulset, fingerprint),
            None => false,
        };
        Ok(())
    }
}

/// The broker container of `statefulset`, if present
pub fn rabbitmq_container(statefulset: &StatefulSet) -> Option<&Container> {
    statefulset
        .spec
        .as_ref()?
        .template
        .spec
        .as_ref()?
        .containers
        .iter()
        .find(|c| c.name == CONTAINER_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OperatorConfig;
    use crate::crd::RabbitmqClusterSpec;
    use crate::resource::test_support::cluster;

    fn reconcile(spec: RabbitmqClusterSpec, config: &OperatorConfig) -> StatefulSet {
        let rmq = cluster("rabbit", spec);
        let base = RabbitmqResourceBuilder::new(&rmq, config).unwrap();
        let mut builder = base.statefulset();
        let mut sts = builder.build().unwrap();
        builder.update(&mut sts).unwrap();
        sts
    }

    fn pod_spec(sts: &StatefulSet) -> &PodSpec {
        sts.spec.as_ref().unwrap().template.spec.as_ref().unwrap()
    }

    fn env_value<'a>(container: &'a Container, name: &str) -> Option<&'a str> {
        container
            .env
            .as_ref()?
            .iter()
            .find(|e| e.name == name)?
            .value
            .as_deref()
    }

    #[test]
    fn test_build_statefulset() {
        let sts = reconcile(
            RabbitmqClusterSpec {
                replicas: 3,
                ..Default::default()
            },
            &OperatorConfig::default(),
        );

        assert_eq!(sts.metadata.name.as_deref(), Some("rabbit-server"));
        let spec = sts.spec.as_ref().unwrap();
        assert_eq!(spec.replicas, Some(3));
        assert_eq!(spec.service_name, "rabbit-headless");
        assert_eq!(
            spec.selector
                .match_labels
                .as_ref()
                .unwrap()
                .get(metadata::NAME_LABEL)
                .map(String::as_str),
            Some("rabbit")
        );

        let pod = pod_spec(&sts);
        assert_eq!(pod.service_account_name.as_deref(), Some("rabbit-server"));
        assert!(pod.image_pull_secrets.is_none());

        let container = rabbitmq_container(&sts).unwrap();
        assert_eq!(container.image.as_deref(), Some(crate::config::DEFAULT_IMAGE));
        assert_eq!(env_value(container, "RABBITMQ_USE_LONGNAME"), Some("true"));
        assert_eq!(env_value(container, "K8S_SERVICE_NAME"), Some("rabbit-headless"));
        assert_eq!(
            env_value(container, "RABBITMQ_ENABLED_PLUGINS"),
            Some("rabbitmq_management,rabbitmq_prometheus")
        );
        let ports: Vec<i32> = container
            .ports
            .as_ref()
            .unwrap()
            .iter()
            .map(|p| p.container_port)
            .collect();
        assert_eq!(ports, vec![4369, 5672, 15672, 15692]);

        let resources = container.resources.as_ref().unwrap();
        assert_eq!(
            resources.limits.as_ref().unwrap()["memory"],
            Quantity("2Gi".to_string())
        );
    }

    #[test]
    fn test_persistence_defaults_and_overrides() {
        let config = OperatorConfig {
            persistence: crate::config::PersistenceConfig {
                storage: "10Gi".to_string(),
                storage_class_name: Some("standard".to_string()),
            },
            ..Default::default()
        };
        let sts = reconcile(RabbitmqClusterSpec::default(), &config);
        let claim = &sts.spec.as_ref().unwrap().volume_claim_templates.as_ref().unwrap()[0];
        let claim_spec = claim.spec.as_ref().unwrap();
        assert_eq!(claim.metadata.name.as_deref(), Some(PERSISTENCE_VOLUME));
        assert_eq!(claim_spec.storage_class_name.as_deref(), Some("standard"));

        let mut spec = RabbitmqClusterSpec::default();
        spec.persistence.storage = Some("20Gi".to_string());
        spec.persistence.storage_class_name = Some("fast".to_string());
        let sts = reconcile(spec, &config);
        let claim_spec = sts.spec.unwrap().volume_claim_templates.unwrap()[0]
            .spec
            .clone()
            .unwrap();
        assert_eq!(claim_spec.storage_class_name.as_deref(), Some("fast"));
        assert_eq!(
            claim_spec.resources.unwrap().requests.unwrap()["storage"],
            Quantity("20Gi".to_string())
        );
    }

    #[test]
    fn test_default_pull_secret_reference() {
        let config = OperatorConfig {
            image_pull_secret: Some("pivotal-rmq-registry-access".to_string()),
            ..Default::default()
        };
        let sts = reconcile(RabbitmqClusterSpec::default(), &config);
        assert_eq!(
            pod_spec(&sts).image_pull_secrets,
            Some(vec![LocalObjectReference {
                name: "rabbit-registry-access".to_string()
            }])
        );

        let sts = reconcile(
            RabbitmqClusterSpec {
                image_pull_secret: Some("rabbit-two-secret".to_string()),
                ..Default::default()
            },
            &config,
        );
        assert_eq!(
            pod_spec(&sts).image_pull_secrets,
            Some(vec![LocalObjectReference {
                name: "rabbit-two-secret".to_string()
            }])
        );
    }

    #[test]
    fn test_tls_volume_and_ports() {
        let mut spec = RabbitmqClusterSpec::default();
        spec.tls.secret_name = Some("tls-secret".to_string());
        spec.tls.ca_secret_name = Some("ca-secret".to_string());
        let sts = reconcile(spec, &OperatorConfig::default());

        let tls = pod_spec(&sts)
            .volumes
            .as_ref()
            .unwrap()
            .iter()
            .find(|v| v.name == "rabbitmq-tls")
            .unwrap();
        let sources = tls.projected.as_ref().unwrap().sources.as_ref().unwrap();
        assert_eq!(sources.len(), 2);

        let container = rabbitmq_container(&sts).unwrap();
        assert!(container
            .volume_mounts
            .as_ref()
            .unwrap()
            .iter()
            .any(|m| m.mount_path == "/etc/rabbitmq-tls/"));
        assert!(container
            .ports
            .as_ref()
            .unwrap()
            .iter()
            .any(|p| p.container_port == 5671));
    }

    #[test]
    fn test_update_preserves_foreign_state() {
        let rmq = cluster("rabbit", RabbitmqClusterSpec::default());
        let config = OperatorConfig::default();
        let base = RabbitmqResourceBuilder::new(&rmq, &config).unwrap();
        let mut builder = base.statefulset();

        let mut sts = builder.build().unwrap();
        builder.update(&mut sts).unwrap();
        assert!(stamp_fingerprint(&mut sts, "abc123"));
        {
            let pod = sts.spec.as_mut().unwrap().template.spec.as_mut().unwrap();
            pod.containers[0].termination_message_path = Some("/dev/termination-log".to_string());
            pod.containers.push(Container {
                name: "sidecar".to_string(),
                ..Default::default()
            });
        }
        let before = sts.clone();

        // no fingerprint known: the stamped one is left alone
        builder.update(&mut sts).unwrap();
        assert_eq!(sts, before);
        assert!(!builder.rolls_pods());

        let annotations = sts.spec.unwrap().template.metadata.unwrap().annotations.unwrap();
        assert_eq!(annotations[CONFIG_FINGERPRINT_ANNOTATION], "abc123");
    }

    #[test]
    fn test_fingerprint_change_rolls_pods() {
        let rmq = cluster("rabbit", RabbitmqClusterSpec::default());
        let config = OperatorConfig::default();
        let base = RabbitmqResourceBuilder::new(&rmq, &config).unwrap();
        let mut builder = base.statefulset();

        builder.set_config_fingerprint(Some("f00d".to_string()));
        let mut sts = builder.build().unwrap();
        builder.update(&mut sts).unwrap();
        assert!(builder.rolls_pods());

        builder.update(&mut sts).unwrap();
        assert!(!builder.rolls_pods());

        builder.set_config_fingerprint(Some("beef".to_string()));
        builder.update(&mut sts).unwrap();
        assert!(builder.rolls_pods());
        let template = sts.spec.unwrap().template.metadata.unwrap();
        assert_eq!(template.annotations.unwrap()[CONFIG_FINGERPRINT_ANNOTATION], "beef");
        assert!(template.labels.unwrap().contains_key(metadata::NAME_LABEL));
    }

    #[test]
    fn test_additional_plugins_are_enabled() {
        let mut spec = RabbitmqClusterSpec::default();
        spec.rabbitmq.additional_plugins = vec![
            "rabbitmq_management".to_string(),
            "rabbitmq_shovel".to_string(),
        ];
        let sts = reconcile(spec, &OperatorConfig::default());
        assert_eq!(
            env_value(rabbitmq_container(&sts).unwrap(), "RABBITMQ_ENABLED_PLUGINS"),
            Some("rabbitmq_management,rabbitmq_prometheus,rabbitmq_shovel")
        );
    }
}
