//! Headless service (`<name>-headless`) giving each node a stable DNS name

use super::{RabbitmqResourceBuilder, ResourceBuilder, HEADLESS_SERVICE_SUFFIX};
use crate::error::Result;
use crate::metadata;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

pub const EPMD_PORT: i32 = 4369;
pub const CLUSTER_RPC_PORT: i32 = 25672;

#[derive(Debug)]
pub struct HeadlessServiceBuilder<'a> {
    base: RabbitmqResourceBuilder<'a>,
}

impl<'a> HeadlessServiceBuilder<'a> {
    pub fn new(base: RabbitmqResourceBuilder<'a>) -> Self {
        Self { base }
    }
}

impl ResourceBuilder for HeadlessServiceBuilder<'_> {
    type Object = Service;

    fn build(&self) -> Result<Service> {
        Ok(Service {
            metadata: self.base.object_meta(HEADLESS_SERVICE_SUFFIX),
            spec: Some(ServiceSpec {
                // immutable after creation
                cluster_ip: Some("None".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn update(&mut self, service: &mut Service) -> Result<()> {
        self.base.update_metadata(&mut service.metadata)?;

        let spec = service.spec.get_or_insert_with(ServiceSpec::default);
        spec.selector = Some(metadata::label_selector(&self.base.instance.name_any()));
        spec.ports = Some(vec![
            ServicePort {
                name: Some("epmd".to_string()),
                port: EPMD_PORT,
                target_port: Some(IntOrString::Int(EPMD_PORT)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            },
            ServicePort {
                name: Some("cluster-rpc".to_string()),
                port: CLUSTER_RPC_PORT,
                target_port: Some(IntOrString::Int(CLUSTER_RPC_PORT)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            },
        ]);
        // peers must resolve before they are ready to form the cluster
        spec.publish_not_ready_addresses = Some(true);
        Ok(())
    }
}
