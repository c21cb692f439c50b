//! Server configuration ConfigMap (`<name>-server-conf`)
//!
//! Renders the layered `rabbitmq.conf` files mounted into every broker pod
//! and classifies whether an update to them needs the nodes restarted.

use super::conf::ConfDocument;
use super::{
    RabbitmqResourceBuilder, ResourceBuilder, HEADLESS_SERVICE_SUFFIX, SERVER_CONFIG_MAP_SUFFIX,
    SERVER_SUFFIX,
};
use crate::crd::RabbitmqCluster;
use crate::error::Result;
use crate::quantity::{self, GIB};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::ResourceExt;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub const OPERATOR_DEFAULTS_KEY: &str = "operatorDefaults.conf";
pub const USER_CONFIGURATION_KEY: &str = "userDefinedConfiguration.conf";
pub const ADVANCED_CONFIG_KEY: &str = "advanced.config";
pub const ENV_CONFIG_KEY: &str = "rabbitmq-env.conf";

/// Peer discovery entries; these only change with the replica count
pub const PEER_DISCOVERY_PREFIX: &str = "cluster_formation.classic_config.nodes.";

const DEFAULT_RABBITMQ_CONF: &str = "
cluster_partition_handling = pause_minority
queue_master_locator = min-masters
disk_free_limit.absolute = 2GB
cluster_formation.peer_discovery_backend = classic_config
cluster_formation.randomized_startup_delay_range.min = 0
cluster_formation.randomized_startup_delay_range.max = 60";

const DEFAULT_TLS_CONF: &str = "
ssl_options.certfile = /etc/rabbitmq-tls/tls.crt
ssl_options.keyfile = /etc/rabbitmq-tls/tls.key
listeners.ssl.default = 5671

management.ssl.certfile   = /etc/rabbitmq-tls/tls.crt
management.ssl.keyfile    = /etc/rabbitmq-tls/tls.key
management.ssl.port       = 15671

prometheus.ssl.certfile  = /etc/rabbitmq-tls/tls.crt
prometheus.ssl.keyfile   = /etc/rabbitmq-tls/tls.key
prometheus.ssl.port      = 15691
";

pub const CA_CERT_PATH: &str = "/etc/rabbitmq-tls/ca.crt";
pub const TLS_CERT_PATH: &str = "/etc/rabbitmq-tls/tls.crt";
pub const TLS_KEY_PATH: &str = "/etc/rabbitmq-tls/tls.key";

/// Plugins with a TLS listener enabled whenever TLS is on
struct TlsPluginListener {
    plugin: &'static str,
    ssl_key: &'static str,
    ssl_port: &'static str,
    tcp_key: &'static str,
}

const TLS_PLUGIN_LISTENERS: [TlsPluginListener; 2] = [
    TlsPluginListener {
        plugin: "rabbitmq_mqtt",
        ssl_key: "mqtt.listeners.ssl.default",
        ssl_port: "8883",
        tcp_key: "mqtt.listeners.tcp",
    },
    TlsPluginListener {
        plugin: "rabbitmq_stomp",
        ssl_key: "stomp.listeners.ssl.1",
        ssl_port: "61614",
        tcp_key: "stomp.listeners.tcp",
    },
];

/// Web plugins whose TLS listener is configured under mutual TLS
struct WebPluginListener {
    plugin: &'static str,
    prefix: &'static str,
    ssl_port: &'static str,
}

const MUTUAL_TLS_WEB_PLUGINS: [WebPluginListener; 2] = [
    WebPluginListener {
        plugin: "rabbitmq_web_mqtt",
        prefix: "web_mqtt",
        ssl_port: "15676",
    },
    WebPluginListener {
        plugin: "rabbitmq_web_stomp",
        prefix: "web_stomp",
        ssl_port: "15673",
    },
];

/// Rendered configuration files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedConfiguration {
    pub operator_defaults: String,
    pub user_configuration: String,
    pub advanced_config: Option<String>,
    pub env_config: Option<String>,
}

/// Memory the Erlang VM needs above RabbitMQ's own accounting:
/// the smaller of 20% of the limit or 2GiB.
pub fn remove_headroom(mem_limit: i64) -> i64 {
    let headroom = (mem_limit / 5).min(2 * GIB);
    mem_limit - headroom
}

/// Peer list entries for `replicas` nodes, keyed from 1
fn peer_discovery_entries(instance: &RabbitmqCluster, replicas: i32) -> Vec<(String, String)> {
    let sts = instance.child_resource_name(SERVER_SUFFIX);
    let headless = instance.child_resource_name(HEADLESS_SERVICE_SUFFIX);
    let namespace = instance.namespace_or_default();
    (0..replicas.max(0))
        .map(|i| {
            (
                format!("{}{}", PEER_DISCOVERY_PREFIX, i + 1),
                format!("rabbit@{}-{}.{}.{}", sts, i, headless, namespace),
            )
        })
        .collect()
}

/// Render the configuration files for `instance` with `replicas` nodes.
///
/// Pure: identical inputs always give byte-identical output.
pub fn build_configuration(
    instance: &RabbitmqCluster,
    replicas: i32,
) -> Result<RenderedConfiguration> {
    let spec = &instance.spec;

    let mut operator_defaults = ConfDocument::parse("default rabbitmq.conf", DEFAULT_RABBITMQ_CONF)?;
    for (key, value) in peer_discovery_entries(instance, replicas) {
        operator_defaults.set(key, value);
    }
    operator_defaults.set("cluster_name", instance.name_any());

    let mut user_configuration = ConfDocument::new();

    if spec.tls_enabled() {
        user_configuration.append("default TLS configuration", DEFAULT_TLS_CONF)?;
        if spec.disable_non_tls_listeners() {
            user_configuration.set("listeners.tcp", "none");
        } else {
            // the management plugin has no generic tcp listener switch; it
            // only keeps its plain port when one is set explicitly
            user_configuration.set("management.tcp.port", "15672");
            user_configuration.set("prometheus.tcp.port", "15692");
        }
        for listener in &TLS_PLUGIN_LISTENERS {
            if spec.additional_plugin_enabled(listener.plugin) {
                user_configuration.set(listener.ssl_key, listener.ssl_port);
                if spec.disable_non_tls_listeners() {
                    user_configuration.set(listener.tcp_key, "none");
                }
            }
        }
    }

    if spec.mutual_tls_enabled() {
        user_configuration.set("ssl_options.cacertfile", CA_CERT_PATH);
        user_configuration.set("ssl_options.verify", "verify_peer");
        user_configuration.set("management.ssl.cacertfile", CA_CERT_PATH);
        user_configuration.set("prometheus.ssl.cacertfile", CA_CERT_PATH);

        for web in &MUTUAL_TLS_WEB_PLUGINS {
            if spec.additional_plugin_enabled(web.plugin) {
                user_configuration.set(format!("{}.ssl.port", web.prefix), web.ssl_port);
                user_configuration.set(format!("{}.ssl.cacertfile", web.prefix), CA_CERT_PATH);
                user_configuration.set(format!("{}.ssl.certfile", web.prefix), TLS_CERT_PATH);
                user_configuration.set(format!("{}.ssl.keyfile", web.prefix), TLS_KEY_PATH);
                if spec.disable_non_tls_listeners() {
                    user_configuration.set(format!("{}.tcp.listener", web.prefix), "none");
                }
            }
        }
    }

    if let Some(limit) = spec.memory_limit() {
        // a zero limit means no limit was really set
        let bytes = quantity::parse_quantity(limit)?;
        if bytes > 0 {
            user_configuration.set(
                "total_memory_available_override_value",
                remove_headroom(bytes).to_string(),
            );
        }
    }

    user_configuration.append(
        "spec.rabbitmq.additionalConfig",
        &spec.rabbitmq.additional_config,
    )?;

    Ok(RenderedConfiguration {
        operator_defaults: operator_defaults.to_string(),
        user_configuration: user_configuration.to_string(),
        advanced_config: non_empty(&spec.rabbitmq.advanced_config),
        env_config: non_empty(&spec.rabbitmq.env_config),
    })
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn update_property(data: &mut BTreeMap<String, String>, key: &str, value: Option<String>) {
    match value {
        Some(value) => {
            data.insert(key.to_string(), value);
        }
        None => {
            data.remove(key);
        }
    }
}

/// Strip configuration that running nodes do not need to see.
///
/// Only the peer discovery list qualifies: on scale-out new nodes get the
/// full list, while nodes already in the cluster stay clustered without it.
/// Both rendered `.conf` files are re-serialized canonically so formatting
/// differences never count as changes. A file that does not parse (for
/// example one edited by hand on the live object) is kept verbatim, so it
/// compares unequal to anything the operator renders.
pub fn remove_config_not_requiring_node_restart(data: &mut BTreeMap<String, String>) {
    if let Some(text) = data.get_mut(OPERATOR_DEFAULTS_KEY) {
        if let Ok(mut doc) = ConfDocument::parse(OPERATOR_DEFAULTS_KEY, text) {
            doc.remove_prefixed(PEER_DISCOVERY_PREFIX);
            *text = doc.to_string();
        }
    }
    if let Some(text) = data.get_mut(USER_CONFIGURATION_KEY) {
        if let Ok(doc) = ConfDocument::parse(USER_CONFIGURATION_KEY, text) {
            *text = doc.to_string();
        }
    }
}

fn normalized_data(config_map: &ConfigMap) -> BTreeMap<String, String> {
    let mut data = config_map.data.clone().unwrap_or_default();
    remove_config_not_requiring_node_restart(&mut data);
    data
}

/// Whether moving from `previous` to `updated` needs the brokers restarted
pub fn requires_restart(previous: &ConfigMap, updated: &ConfigMap) -> bool {
    normalized_data(previous) != normalized_data(updated)
        || previous.binary_data != updated.binary_data
}

/// SHA-256 over the restart-relevant configuration.
///
/// Two ConfigMaps share a fingerprint exactly when moving between them
/// needs no restart.
pub fn config_fingerprint(config_map: &ConfigMap) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in normalized_data(config_map) {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\n");
    }
    for (key, value) in config_map.binary_data.iter().flatten() {
        hasher.update(b"binary:");
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(&value.0);
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Builder for the server configuration ConfigMap
#[derive(Debug)]
pub struct ServerConfigMapBuilder<'a> {
    base: RabbitmqResourceBuilder<'a>,
    /// Set when the last update changed configuration that only takes
    /// effect after a node restart.
    update_requires_sts_restart: bool,
    fingerprint: Option<String>,
}

impl<'a> ServerConfigMapBuilder<'a> {
    pub fn new(base: RabbitmqResourceBuilder<'a>) -> Self {
        Self {
            base,
            update_requires_sts_restart: true,
            fingerprint: None,
        }
    }

    /// Fingerprint of the configuration written by the last update
    pub fn config_fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }
}

impl ResourceBuilder for ServerConfigMapBuilder<'_> {
    type Object = ConfigMap;

    fn build(&self) -> Result<ConfigMap> {
        Ok(ConfigMap {
            metadata: self.base.object_meta(SERVER_CONFIG_MAP_SUFFIX),
            ..Default::default()
        })
    }

    fn update(&mut self, config_map: &mut ConfigMap) -> Result<()> {
        let instance = self.base.instance;
        let rendered = build_configuration(instance, instance.spec.replicas)?;
        let previous = config_map.clone();

        self.base.update_metadata(&mut config_map.metadata)?;

        let data = config_map.data.get_or_insert_with(BTreeMap::new);
        data.insert(OPERATOR_DEFAULTS_KEY.to_string(), rendered.operator_defaults);
        data.insert(
            USER_CONFIGURATION_KEY.to_string(),
            rendered.user_configuration,
        );
        update_property(data, ADVANCED_CONFIG_KEY, rendered.advanced_config);
        update_property(data, ENV_CONFIG_KEY, rendered.env_config);

        self.update_requires_sts_restart = requires_restart(&previous, config_map);
        self.fingerprint = Some(config_fingerprint(config_map));
        Ok(())
    }

    fn update_requires_sts_restart(&self) -> bool {
        self.update_requires_sts_restart
    }
}
