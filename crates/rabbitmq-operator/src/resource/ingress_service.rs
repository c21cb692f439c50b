//! Client-facing service (`<name>-ingress`)

use super::{RabbitmqResourceBuilder, ResourceBuilder, INGRESS_SERVICE_SUFFIX};
use crate::crd::RabbitmqClusterSpec;
use crate::error::Result;
use crate::metadata;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Keys of the service annotations applied by the last update, comma separated
pub const APPLIED_ANNOTATIONS_KEY: &str = "rabbitmq.com/applied-service-annotations";

/// Named client ports the broker listens on for `spec`
pub(crate) fn client_ports(spec: &RabbitmqClusterSpec) -> Vec<(&'static str, i32)> {
    let plain = !(spec.tls_enabled() && spec.disable_non_tls_listeners());
    let mut ports = Vec::new();

    if plain {
        ports.extend([("amqp", 5672), ("management", 15672), ("prometheus", 15692)]);
    }
    if spec.tls_enabled() {
        ports.extend([
            ("amqps", 5671),
            ("management-tls", 15671),
            ("prometheus-tls", 15691),
        ]);
    }

    if spec.additional_plugin_enabled("rabbitmq_mqtt") {
        if plain {
            ports.push(("mqtt", 1883));
        }
        if spec.tls_enabled() {
            ports.push(("mqtts", 8883));
        }
    }
    if spec.additional_plugin_enabled("rabbitmq_stomp") {
        if plain {
            ports.push(("stomp", 61613));
        }
        if spec.tls_enabled() {
            ports.push(("stomps", 61614));
        }
    }
    if spec.additional_plugin_enabled("rabbitmq_web_mqtt") {
        if plain {
            ports.push(("web-mqtt", 15675));
        }
        if spec.mutual_tls_enabled() {
            ports.push(("web-mqtt-tls", 15676));
        }
    }
    if spec.additional_plugin_enabled("rabbitmq_web_stomp") {
        if plain {
            ports.push(("web-stomp", 15674));
        }
        if spec.mutual_tls_enabled() {
            ports.push(("web-stomp-tls", 15673));
        }
    }
    ports
}

#[derive(Debug)]
pub struct IngressServiceBuilder<'a> {
    base: RabbitmqResourceBuilder<'a>,
}

impl<'a> IngressServiceBuilder<'a> {
    pub fn new(base: RabbitmqResourceBuilder<'a>) -> Self {
        Self { base }
    }

    /// Operator-wide service annotations overlaid with the cluster's own
    fn service_annotations(&self) -> BTreeMap<String, String> {
        let mut annotations = self.base.config.service.annotations.clone();
        annotations.extend(self.base.instance.spec.service.annotations.clone());
        annotations
    }

    fn service_type(&self) -> String {
        self.base
            .instance
            .spec
            .service
            .service_type
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.base.config.service.service_type.clone())
    }
}

impl ResourceBuilder for IngressServiceBuilder<'_> {
    type Object = Service;

    fn build(&self) -> Result<Service> {
        Ok(Service {
            metadata: self.base.object_meta(INGRESS_SERVICE_SUFFIX),
            ..Default::default()
        })
    }

    fn update(&mut self, service: &mut Service) -> Result<()> {
        let instance = self.base.instance;
        let desired = self.service_annotations();

        // drop what an earlier update applied and is no longer asked for
        let emptied = match service.metadata.annotations.as_mut() {
            Some(annotations) => {
                if let Some(applied) = annotations.remove(APPLIED_ANNOTATIONS_KEY) {
                    for key in applied.split(',').filter(|k| !desired.contains_key(*k)) {
                        annotations.remove(key);
                    }
                }
                annotations.is_empty()
            }
            None => false,
        };
        if emptied {
            service.metadata.annotations = None;
        }

        self.base.update_metadata(&mut service.metadata)?;

        if !desired.is_empty() {
            let applied = desired.keys().cloned().collect::<Vec<_>>().join(",");
            let annotations = service
                .metadata
                .annotations
                .get_or_insert_with(Default::default);
            annotations.extend(desired);
            annotations.insert(APPLIED_ANNOTATIONS_KEY.to_string(), applied);
        }

        let service_type = self.service_type();
        let spec = service.spec.get_or_insert_with(ServiceSpec::default);
        let existing_ports = spec.ports.take().unwrap_or_default();

        spec.ports = Some(
            client_ports(&instance.spec)
                .into_iter()
                .map(|(name, port)| {
                    // keep allocated node ports stable
                    let node_port = existing_ports
                        .iter()
                        .find(|p| p.name.as_deref() == Some(name))
                        .and_then(|p| p.node_port)
                        .filter(|_| service_type != "ClusterIP");
                    ServicePort {
                        name: Some(name.to_string()),
                        port,
                        target_port: Some(IntOrString::Int(port)),
                        protocol: Some("TCP".to_string()),
                        node_port,
                        ..Default::default()
                    }
                })
                .collect(),
        );
        spec.selector = Some(metadata::label_selector(&instance.name_any()));
        spec.type_ = Some(service_type);
        Ok(())
    }
}
