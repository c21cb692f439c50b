//! Kubernetes Resource Builders
//!
//! Every child object of a `RabbitmqCluster` has a builder implementing
//! [`ResourceBuilder`]:
//!
//! - `build` returns the identity skeleton (name, namespace, labels,
//!   annotations) used when the object does not exist yet;
//! - `update` patches desired state onto a caller-supplied object in place,
//!   leaving fields it does not own untouched;
//! - `update_requires_sts_restart` reports whether the last `update` changed
//!   something the running broker nodes only pick up on restart.
//!
//! Builders never talk to the API server. The controller fetches, calls
//! `update`, and persists. [`RabbitmqResourceBuilder::resource_builders`]
//! returns the full family in reconcile order as [`ChildBuilder`] values.

pub mod admin_secret;
pub mod conf;
pub mod erlang_cookie;
pub mod headless_service;
pub mod ingress_service;
pub mod registry_secret;
pub mod role;
pub mod role_binding;
pub mod server_configmap;
pub mod service_account;
pub mod statefulset;

pub use admin_secret::AdminSecretBuilder;
pub use erlang_cookie::ErlangCookieBuilder;
pub use headless_service::HeadlessServiceBuilder;
pub use ingress_service::IngressServiceBuilder;
pub use registry_secret::RegistrySecretBuilder;
pub use role::RoleBuilder;
pub use role_binding::RoleBindingBuilder;
pub use server_configmap::ServerConfigMapBuilder;
pub use service_account::ServiceAccountBuilder;
pub use statefulset::StatefulSetBuilder;

use crate::config::OperatorConfig;
use crate::crd::RabbitmqCluster;
use crate::error::{OperatorError, Result};
use crate::metadata;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Child name suffixes: `<cluster name>-<suffix>`
pub const SERVER_CONFIG_MAP_SUFFIX: &str = "server-conf";
pub const ADMIN_SECRET_SUFFIX: &str = "admin";
pub const ERLANG_COOKIE_SUFFIX: &str = "erlang-cookie";
pub const REGISTRY_SECRET_SUFFIX: &str = "registry-access";
pub const INGRESS_SERVICE_SUFFIX: &str = "ingress";
pub const HEADLESS_SERVICE_SUFFIX: &str = "headless";
pub const SERVER_SUFFIX: &str = "server";
pub const ROLE_SUFFIX: &str = "endpoint-discovery";

/// Capability shared by every child object builder
pub trait ResourceBuilder {
    /// Kubernetes object kind produced by this builder
    type Object: Resource<DynamicType = ()>
        + Clone
        + Debug
        + PartialEq
        + Serialize
        + DeserializeOwned;

    /// Identity-bearing skeleton used for first creation
    fn build(&self) -> Result<Self::Object>;

    /// Patch desired state onto `object` in place. Must be idempotent.
    fn update(&mut self, object: &mut Self::Object) -> Result<()>;

    /// Whether the last update needs broker nodes to restart
    fn update_requires_sts_restart(&self) -> bool {
        false
    }
}

/// Shared context for all builders of one cluster
#[derive(Debug, Clone, Copy)]
pub struct RabbitmqResourceBuilder<'a> {
    pub instance: &'a RabbitmqCluster,
    pub config: &'a OperatorConfig,
}

impl<'a> RabbitmqResourceBuilder<'a> {
    /// Create a new resource builder
    pub fn new(instance: &'a RabbitmqCluster, config: &'a OperatorConfig) -> Result<Self> {
        if instance.metadata.name.as_deref().unwrap_or_default().is_empty() {
            return Err(OperatorError::InvalidConfig(
                "cluster name is required".to_string(),
            ));
        }
        Ok(Self { instance, config })
    }

    /// Child object name for `suffix`
    pub fn name(&self, suffix: &str) -> String {
        self.instance.child_resource_name(suffix)
    }

    pub fn namespace(&self) -> String {
        self.instance.namespace_or_default()
    }

    /// Labels every child carries
    pub fn labels(&self) -> BTreeMap<String, String> {
        metadata::get_labels(&self.instance.name_any(), self.instance.metadata.labels.as_ref())
    }

    /// Skeleton metadata for a new child object
    pub fn object_meta(&self, suffix: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.name(suffix)),
            namespace: Some(self.namespace()),
            labels: Some(self.labels()),
            annotations: metadata::reconcile_and_filter_annotations(
                None,
                self.instance.metadata.annotations.as_ref(),
            ),
            ..Default::default()
        }
    }

    /// Reconcile labels, annotations and the controller reference onto
    /// existing metadata without dropping fields set by others.
    pub fn update_metadata(&self, meta: &mut ObjectMeta) -> Result<()> {
        self.set_controller_reference(meta)?;
        meta.labels = Some(metadata::reconcile_labels(
            meta.labels.as_ref(),
            self.labels(),
        ));
        meta.annotations = metadata::reconcile_and_filter_annotations(
            meta.annotations.as_ref(),
            self.instance.metadata.annotations.as_ref(),
        );
        Ok(())
    }

    /// Point the object's controller reference at the cluster.
    ///
    /// Fails when the cluster has no uid yet or when another controller
    /// already owns the object.
    pub fn set_controller_reference(&self, meta: &mut ObjectMeta) -> Result<()> {
        let owner = self.instance.controller_owner_ref(&()).ok_or_else(|| {
            OperatorError::OwnerReference(format!(
                "RabbitmqCluster {} has no uid",
                self.instance.name_any()
            ))
        })?;

        let refs = meta.owner_references.get_or_insert_with(Vec::new);
        if let Some(other) = refs
            .iter()
            .find(|r| r.controller == Some(true) && r.uid != owner.uid)
        {
            return Err(OperatorError::OwnerReference(format!(
                "object {} is already owned by {} {}",
                meta.name.as_deref().unwrap_or("<unknown>"),
                other.kind,
                other.name
            )));
        }

        refs.retain(|r| r.uid != owner.uid);
        refs.push(owner);
        Ok(())
    }

    /// Whether the operator's default pull secret is used for this cluster
    pub fn uses_default_pull_secret(&self) -> bool {
        self.instance.spec.image_pull_secret().is_none()
            && self.config.default_image_pull_secret().is_some()
    }

    /// Image pull secret names for the workload's pods
    pub fn image_pull_secret_names(&self) -> Vec<String> {
        if let Some(name) = self.instance.spec.image_pull_secret() {
            vec![name.to_string()]
        } else if self.uses_default_pull_secret() {
            vec![self.name(REGISTRY_SECRET_SUFFIX)]
        } else {
            Vec::new()
        }
    }

    pub fn server_config_map(&self) -> ServerConfigMapBuilder<'a> {
        ServerConfigMapBuilder::new(*self)
    }

    pub fn admin_secret(&self) -> AdminSecretBuilder<'a> {
        AdminSecretBuilder::new(*self)
    }

    pub fn erlang_cookie(&self) -> ErlangCookieBuilder<'a> {
        ErlangCookieBuilder::new(*self)
    }

    pub fn registry_secret(&self, source: Secret) -> RegistrySecretBuilder<'a> {
        RegistrySecretBuilder::new(*self, source)
    }

    pub fn ingress_service(&self) -> IngressServiceBuilder<'a> {
        IngressServiceBuilder::new(*self)
    }

    pub fn headless_service(&self) -> HeadlessServiceBuilder<'a> {
        HeadlessServiceBuilder::new(*self)
    }

    pub fn service_account(&self) -> ServiceAccountBuilder<'a> {
        ServiceAccountBuilder::new(*self)
    }

    pub fn role(&self) -> RoleBuilder<'a> {
        RoleBuilder::new(*self)
    }

    pub fn role_binding(&self) -> RoleBindingBuilder<'a> {
        RoleBindingBuilder::new(*self)
    }

    pub fn statefulset(&self) -> StatefulSetBuilder<'a> {
        StatefulSetBuilder::new(*self)
    }

    /// The builder family in reconcile order.
    ///
    /// `registry_source` is the operator's default pull secret, fetched by
    /// the caller; the registry secret builder is only included when this
    /// cluster relies on it. The StatefulSet always comes last so it can
    /// observe the restart signals of everything before it.
    pub fn resource_builders(&self, registry_source: Option<Secret>) -> Vec<ChildBuilder<'a>> {
        let mut builders = vec![
            ChildBuilder::HeadlessService(self.headless_service()),
            ChildBuilder::IngressService(self.ingress_service()),
            ChildBuilder::ServerConfigMap(self.server_config_map()),
            ChildBuilder::AdminSecret(self.admin_secret()),
            ChildBuilder::ErlangCookie(self.erlang_cookie()),
        ];
        if let Some(source) = registry_source.filter(|_| self.uses_default_pull_secret()) {
            builders.push(ChildBuilder::RegistrySecret(self.registry_secret(source)));
        }
        builders.extend([
            ChildBuilder::ServiceAccount(self.service_account()),
            ChildBuilder::Role(self.role()),
            ChildBuilder::RoleBinding(self.role_binding()),
            ChildBuilder::StatefulSet(self.statefulset()),
        ]);
        builders
    }
}

/// Closed set of child object builders
#[derive(Debug)]
pub enum ChildBuilder<'a> {
    HeadlessService(HeadlessServiceBuilder<'a>),
    IngressService(IngressServiceBuilder<'a>),
    ServerConfigMap(ServerConfigMapBuilder<'a>),
    AdminSecret(AdminSecretBuilder<'a>),
    ErlangCookie(ErlangCookieBuilder<'a>),
    RegistrySecret(RegistrySecretBuilder<'a>),
    ServiceAccount(ServiceAccountBuilder<'a>),
    Role(RoleBuilder<'a>),
    RoleBinding(RoleBindingBuilder<'a>),
    StatefulSet(StatefulSetBuilder<'a>),
}

impl ChildBuilder<'_> {
    /// Kubernetes kind of the object this builder manages
    pub fn kind(&self) -> &'static str {
        match self {
            ChildBuilder::HeadlessService(_) | ChildBuilder::IngressService(_) => "Service",
            ChildBuilder::ServerConfigMap(_) => "ConfigMap",
            ChildBuilder::AdminSecret(_)
            | ChildBuilder::ErlangCookie(_)
            | ChildBuilder::RegistrySecret(_) => "Secret",
            ChildBuilder::ServiceAccount(_) => "ServiceAccount",
            ChildBuilder::Role(_) => "Role",
            ChildBuilder::RoleBinding(_) => "RoleBinding",
            ChildBuilder::StatefulSet(_) => "StatefulSet",
        }
    }

    /// Restart signal of the wrapped builder
    pub fn update_requires_sts_restart(&self) -> bool {
        match self {
            ChildBuilder::HeadlessService(b) => b.update_requires_sts_restart(),
            ChildBuilder::IngressService(b) => b.update_requires_sts_restart(),
            ChildBuilder::ServerConfigMap(b) => b.update_requires_sts_restart(),
            ChildBuilder::AdminSecret(b) => b.update_requires_sts_restart(),
            ChildBuilder::ErlangCookie(b) => b.update_requires_sts_restart(),
            ChildBuilder::RegistrySecret(b) => b.update_requires_sts_restart(),
            ChildBuilder::ServiceAccount(b) => b.update_requires_sts_restart(),
            ChildBuilder::Role(b) => b.update_requires_sts_restart(),
            ChildBuilder::RoleBinding(b) => b.update_requires_sts_restart(),
            ChildBuilder::StatefulSet(b) => b.update_requires_sts_restart(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::cluster;
    use super::*;
    use crate::crd::RabbitmqClusterSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

    fn kinds(builders: &[ChildBuilder<'_>]) -> Vec<&'static str> {
        builders.iter().map(|b| b.kind()).collect()
    }

    #[test]
    fn test_requires_cluster_name() {
        let mut rmq = cluster("rabbit", RabbitmqClusterSpec::default());
        rmq.metadata.name = None;
        let config = OperatorConfig::default();
        assert!(RabbitmqResourceBuilder::new(&rmq, &config).is_err());
    }

    #[test]
    fn test_object_meta_skeleton() {
        let rmq = cluster("rabbit", RabbitmqClusterSpec::default());
        let config = OperatorConfig::default();
        let builder = RabbitmqResourceBuilder::new(&rmq, &config).unwrap();

        let meta = builder.object_meta(SERVER_CONFIG_MAP_SUFFIX);
        assert_eq!(meta.name.as_deref(), Some("rabbit-server-conf"));
        assert_eq!(meta.namespace.as_deref(), Some("rabbitmq-ns"));
        assert_eq!(
            meta.labels.unwrap().get("team").map(String::as_str),
            Some("queues")
        );
        let annotations = meta.annotations.unwrap();
        assert_eq!(annotations.len(), 1);
        assert!(annotations.contains_key("owner"));
    }

    #[test]
    fn test_controller_reference_is_idempotent() {
        let rmq = cluster("rabbit", RabbitmqClusterSpec::default());
        let config = OperatorConfig::default();
        let builder = RabbitmqResourceBuilder::new(&rmq, &config).unwrap();

        let mut meta = builder.object_meta(ADMIN_SECRET_SUFFIX);
        builder.set_controller_reference(&mut meta).unwrap();
        builder.set_controller_reference(&mut meta).unwrap();

        let refs = meta.owner_references.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, "RabbitmqCluster");
        assert_eq!(refs[0].name, "rabbit");
        assert_eq!(refs[0].controller, Some(true));
    }

    #[test]
    fn test_controller_reference_requires_uid() {
        let mut rmq = cluster("rabbit", RabbitmqClusterSpec::default());
        rmq.metadata.uid = None;
        let config = OperatorConfig::default();
        let builder = RabbitmqResourceBuilder::new(&rmq, &config).unwrap();

        let mut meta = ObjectMeta::default();
        assert!(matches!(
            builder.set_controller_reference(&mut meta),
            Err(OperatorError::OwnerReference(_))
        ));
    }

    #[test]
    fn test_controller_reference_conflict() {
        let rmq = cluster("rabbit", RabbitmqClusterSpec::default());
        let config = OperatorConfig::default();
        let builder = RabbitmqResourceBuilder::new(&rmq, &config).unwrap();

        let mut meta = ObjectMeta {
            owner_references: Some(vec![OwnerReference {
                api_version: "apps/v1".to_string(),
                kind: "Deployment".to_string(),
                name: "someone-else".to_string(),
                uid: "other-uid".to_string(),
                controller: Some(true),
                block_owner_deletion: None,
            }]),
            ..Default::default()
        };
        assert!(builder.set_controller_reference(&mut meta).is_err());
    }

    #[test]
    fn test_family_with_default_pull_secret() {
        let rmq = cluster("rabbit", RabbitmqClusterSpec::default());
        let config = OperatorConfig {
            image_pull_secret: Some("pivotal-rmq-registry-access".to_string()),
            ..Default::default()
        };
        let builder = RabbitmqResourceBuilder::new(&rmq, &config).unwrap();

        assert!(builder.uses_default_pull_secret());
        assert_eq!(
            builder.image_pull_secret_names(),
            vec!["rabbit-registry-access".to_string()]
        );

        let family = builder.resource_builders(Some(Secret::default()));
        assert_eq!(
            kinds(&family),
            vec![
                "Service",
                "Service",
                "ConfigMap",
                "Secret",
                "Secret",
                "Secret",
                "ServiceAccount",
                "Role",
                "RoleBinding",
                "StatefulSet"
            ]
        );
    }

    #[test]
    fn test_family_with_custom_pull_secret() {
        let rmq = cluster(
            "rabbit",
            RabbitmqClusterSpec {
                image_pull_secret: Some("custom".to_string()),
                ..Default::default()
            },
        );
        let config = OperatorConfig {
            image_pull_secret: Some("pivotal-rmq-registry-access".to_string()),
            ..Default::default()
        };
        let builder = RabbitmqResourceBuilder::new(&rmq, &config).unwrap();

        assert!(!builder.uses_default_pull_secret());
        assert_eq!(builder.image_pull_secret_names(), vec!["custom".to_string()]);

        let family = builder.resource_builders(Some(Secret::default()));
        assert!(!family
            .iter()
            .any(|b| matches!(b, ChildBuilder::RegistrySecret(_))));
        assert_eq!(family.len(), 9);
    }

    #[test]
    fn test_family_without_any_pull_secret() {
        let rmq = cluster("rabbit", RabbitmqClusterSpec::default());
        let config = OperatorConfig::default();
        let builder = RabbitmqResourceBuilder::new(&rmq, &config).unwrap();

        assert!(builder.image_pull_secret_names().is_empty());
        assert_eq!(builder.resource_builders(None).len(), 9);
    }

    #[test]
    fn test_only_config_map_signals_restart_initially() {
        let rmq = cluster("rabbit", RabbitmqClusterSpec::default());
        let config = OperatorConfig::default();
        let builder = RabbitmqResourceBuilder::new(&rmq, &config).unwrap();

        for child in builder.resource_builders(None) {
            let expected = matches!(child, ChildBuilder::ServerConfigMap(_));
            assert_eq!(child.update_requires_sts_restart(), expected, "{}", child.kind());
        }
    }
}
