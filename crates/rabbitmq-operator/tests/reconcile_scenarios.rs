//! End-to-end reconcile scenarios driven through the public builder API,
//! with an in-memory map standing in for the API server.

use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{ConfigMap, LocalObjectReference, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use rabbitmq_operator::prelude::*;
use rabbitmq_operator::resource::server_configmap::{config_fingerprint, OPERATOR_DEFAULTS_KEY};
use rabbitmq_operator::resource::statefulset::{rabbitmq_container, CONFIG_FINGERPRINT_ANNOTATION};
use std::collections::BTreeMap;

fn cluster(name: &str, spec: RabbitmqClusterSpec) -> RabbitmqCluster {
    RabbitmqCluster {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("messaging".to_string()),
            uid: Some(format!("{}-uid", name)),
            ..Default::default()
        },
        spec,
        status: None,
    }
}

fn operator_config() -> OperatorConfig {
    OperatorConfig {
        image_pull_secret: Some("pivotal-rmq-registry-access".to_string()),
        ..Default::default()
    }
}

fn registry_source() -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some("pivotal-rmq-registry-access".to_string()),
            namespace: Some("rabbitmq-system".to_string()),
            ..Default::default()
        },
        type_: Some("kubernetes.io/dockerconfigjson".to_string()),
        data: Some(BTreeMap::from([(
            ".dockerconfigjson".to_string(),
            ByteString(b"{\"auths\":{}}".to_vec()),
        )])),
        ..Default::default()
    }
}

/// Live ConfigMap and StatefulSet, persisted between passes
#[derive(Default)]
struct LiveState {
    config_map: Option<ConfigMap>,
    statefulset: Option<StatefulSet>,
    restarts: usize,
}

impl LiveState {
    /// One pass over the objects that take part in restarts, mirroring the
    /// controller: create-or-update the ConfigMap, then the StatefulSet with
    /// the fingerprint of the written configuration. A pod roll is counted
    /// when an existing StatefulSet's fingerprint changed.
    fn reconcile(&mut self, instance: &RabbitmqCluster, config: &OperatorConfig) {
        let fingerprint = self.reconcile_config_map(instance, config);

        let base = RabbitmqResourceBuilder::new(instance, config).unwrap();
        let mut sts_builder = base.statefulset();
        sts_builder.set_config_fingerprint(Some(fingerprint));
        let existed = self.statefulset.is_some();
        let mut statefulset = match self.statefulset.take() {
            Some(existing) => existing,
            None => sts_builder.build().unwrap(),
        };
        sts_builder.update(&mut statefulset).unwrap();
        if existed && sts_builder.rolls_pods() {
            self.restarts += 1;
        }
        self.statefulset = Some(statefulset);
    }

    /// Write only the ConfigMap, as a pass that fails on a later child does
    fn reconcile_config_map(&mut self, instance: &RabbitmqCluster, config: &OperatorConfig) -> String {
        let base = RabbitmqResourceBuilder::new(instance, config).unwrap();
        let mut cm_builder = base.server_config_map();
        let mut config_map = match self.config_map.take() {
            Some(existing) => existing,
            None => cm_builder.build().unwrap(),
        };
        cm_builder.update(&mut config_map).unwrap();
        self.config_map = Some(config_map);
        cm_builder.config_fingerprint().unwrap().to_string()
    }

    fn pod_fingerprint(&self) -> Option<String> {
        self.statefulset
            .as_ref()?
            .spec
            .as_ref()?
            .template
            .metadata
            .as_ref()?
            .annotations
            .as_ref()?
            .get(CONFIG_FINGERPRINT_ANNOTATION)
            .cloned()
    }
}

fn pull_secrets(builder: &RabbitmqResourceBuilder<'_>) -> Option<Vec<LocalObjectReference>> {
    let mut sts_builder = builder.statefulset();
    let mut sts = sts_builder.build().unwrap();
    sts_builder.update(&mut sts).unwrap();
    sts.spec.unwrap().template.spec.unwrap().image_pull_secrets
}

#[test]
fn default_pull_secret_is_copied_and_referenced() {
    let instance = cluster("rabbitmq-one", RabbitmqClusterSpec::default());
    let config = operator_config();
    let base = RabbitmqResourceBuilder::new(&instance, &config).unwrap();

    let family = base.resource_builders(Some(registry_source()));
    let mut registry = family
        .into_iter()
        .find_map(|b| match b {
            ChildBuilder::RegistrySecret(b) => Some(b),
            _ => None,
        })
        .expect("registry secret builder");

    let mut secret = registry.build().unwrap();
    registry.update(&mut secret).unwrap();
    assert_eq!(
        secret.metadata.name.as_deref(),
        Some("rabbitmq-one-registry-access")
    );
    assert_eq!(secret.data, registry_source().data);

    assert_eq!(
        pull_secrets(&base),
        Some(vec![LocalObjectReference {
            name: "rabbitmq-one-registry-access".to_string()
        }])
    );
}

#[test]
fn custom_pull_secret_is_used_exclusively() {
    let instance = cluster(
        "rabbitmq-two",
        RabbitmqClusterSpec {
            image_pull_secret: Some("rabbit-two-secret".to_string()),
            ..Default::default()
        },
    );
    let config = operator_config();
    let base = RabbitmqResourceBuilder::new(&instance, &config).unwrap();

    let family = base.resource_builders(Some(registry_source()));
    let secret_names: Vec<String> = family
        .iter()
        .filter_map(|b| match b {
            ChildBuilder::AdminSecret(b) => b.build().ok(),
            ChildBuilder::ErlangCookie(b) => b.build().ok(),
            ChildBuilder::RegistrySecret(b) => b.build().ok(),
            _ => None,
        })
        .filter_map(|s| s.metadata.name)
        .collect();
    assert!(secret_names.iter().all(|n| !n.ends_with("registry-access")));

    assert_eq!(
        pull_secrets(&base),
        Some(vec![LocalObjectReference {
            name: "rabbit-two-secret".to_string()
        }])
    );
}

#[test]
fn scaling_out_does_not_restart() {
    let config = OperatorConfig::default();
    let mut live = LiveState::default();

    let three = cluster(
        "rabbit",
        RabbitmqClusterSpec {
            replicas: 3,
            ..Default::default()
        },
    );
    live.reconcile(&three, &config);
    assert_eq!(live.restarts, 0);
    let stamped = live.pod_fingerprint();
    assert!(stamped.is_some());

    let five = cluster(
        "rabbit",
        RabbitmqClusterSpec {
            replicas: 5,
            ..Default::default()
        },
    );
    live.reconcile(&five, &config);

    assert_eq!(live.restarts, 0);
    assert_eq!(live.pod_fingerprint(), stamped);
    let data = live.config_map.as_ref().unwrap().data.as_ref().unwrap();
    assert!(data[OPERATOR_DEFAULTS_KEY].contains("nodes.5 = rabbit@rabbit-server-4"));
    assert_eq!(
        live.statefulset.as_ref().unwrap().spec.as_ref().unwrap().replicas,
        Some(5)
    );
}

#[test]
fn enabling_tls_restarts_once() {
    let config = OperatorConfig::default();
    let mut live = LiveState::default();

    let plain = cluster(
        "rabbit",
        RabbitmqClusterSpec {
            replicas: 3,
            ..Default::default()
        },
    );
    live.reconcile(&plain, &config);

    let mut tls_spec = plain.spec.clone();
    tls_spec.tls.secret_name = Some("rabbit-tls".to_string());
    let tls = cluster("rabbit", tls_spec);

    live.reconcile(&tls, &config);
    assert_eq!(live.restarts, 1);
    let expected = config_fingerprint(live.config_map.as_ref().unwrap());
    assert_eq!(live.pod_fingerprint(), Some(expected));

    // nothing changed: no second restart
    live.reconcile(&tls, &config);
    assert_eq!(live.restarts, 1);

    let container = rabbitmq_container(live.statefulset.as_ref().unwrap()).unwrap();
    assert!(container
        .ports
        .as_ref()
        .unwrap()
        .iter()
        .any(|p| p.container_port == 5671));
}

#[test]
fn restart_classifier_compares_rendered_data() {
    let config = OperatorConfig::default();
    let mut live = LiveState::default();
    live.reconcile(&cluster("rabbit", RabbitmqClusterSpec::default()), &config);
    let before = live.config_map.clone().unwrap();

    let mut spec = RabbitmqClusterSpec::default();
    spec.rabbitmq.additional_config = "vm_memory_high_watermark.relative = 0.6".to_string();
    live.reconcile(&cluster("rabbit", spec), &config);
    let after = live.config_map.clone().unwrap();

    assert!(requires_restart(&before, &after));
    assert!(!requires_restart(&after, &after));
    assert_eq!(live.restarts, 1);
}

#[test]
fn interrupted_pass_still_restarts_on_retry() {
    let config = OperatorConfig::default();
    let mut live = LiveState::default();

    let plain = cluster(
        "rabbit",
        RabbitmqClusterSpec {
            replicas: 3,
            ..Default::default()
        },
    );
    live.reconcile(&plain, &config);
    let original = live.pod_fingerprint();
    assert!(original.is_some());

    let mut tls_spec = plain.spec.clone();
    tls_spec.tls.secret_name = Some("rabbit-tls".to_string());
    let tls = cluster("rabbit", tls_spec);

    // the ConfigMap is written, then a later write fails
    live.reconcile_config_map(&tls, &config);
    assert_eq!(live.restarts, 0);
    assert_eq!(live.pod_fingerprint(), original);

    // the retry finds the ConfigMap already current
    live.reconcile(&tls, &config);
    assert_eq!(live.restarts, 1);
    let expected = config_fingerprint(live.config_map.as_ref().unwrap());
    assert_eq!(live.pod_fingerprint(), Some(expected));

    live.reconcile(&tls, &config);
    assert_eq!(live.restarts, 1);
}

#[test]
fn new_statefulset_starts_on_current_configuration() {
    let config = OperatorConfig::default();
    let mut live = LiveState::default();
    let instance = cluster("rabbit", RabbitmqClusterSpec::default());

    live.reconcile(&instance, &config);
    live.reconcile(&instance, &config);

    assert_eq!(live.restarts, 0);
    let expected = config_fingerprint(live.config_map.as_ref().unwrap());
    assert_eq!(live.pod_fingerprint(), Some(expected));
}
