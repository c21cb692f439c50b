//! RabbitmqCluster Controller
//!
//! Watches `RabbitmqCluster` resources and converges their child objects.
//! Each pass walks the builder family in order: fetch the live object, patch
//! it in memory through the builder, and write it back only if something
//! changed. The StatefulSet's pod template carries the fingerprint of the
//! server configuration; when the configuration needs a restart the
//! fingerprint changes and every broker restarts once on it. The restart
//! decision is read back from the live objects on every pass, so a pass
//! interrupted between the ConfigMap and the StatefulSet write still rolls
//! the brokers on the next one.
//!
//! Deletion needs no finalizer: every child carries a controller reference
//! and is garbage collected with its parent.

use crate::config::OperatorConfig;
use crate::crd::{ClusterCondition, RabbitmqCluster, RabbitmqClusterStatus};
use crate::error::{OperatorError, Result};
use crate::resource::{ChildBuilder, RabbitmqResourceBuilder, ResourceBuilder, SERVER_SUFFIX};
use chrono::Utc;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher::Config;
use kube::{Client, Resource, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

/// Default requeue interval for successful reconciliations
const DEFAULT_REQUEUE_SECONDS: u64 = 300;

/// Requeue interval for error cases (base for exponential backoff)
const ERROR_REQUEUE_SECONDS: u64 = 30;

/// Maximum requeue delay for error backoff
const MAX_ERROR_REQUEUE_SECONDS: u64 = 600;

/// Status marker written after a completed pass
pub const CLUSTER_STATUS_CREATED: &str = "created";

/// Context passed to the controller
pub struct ControllerContext {
    /// Kubernetes client
    pub client: Client,
    /// Operator-wide defaults
    pub config: OperatorConfig,
    /// Metrics recorder (optional)
    pub metrics: Option<ControllerMetrics>,
    /// Per-cluster error retry counts for exponential backoff
    pub error_counts: dashmap::DashMap<String, u32>,
}

/// Metrics for the controller
#[derive(Clone)]
pub struct ControllerMetrics {
    /// Counter for reconciliation attempts
    pub reconciliations: metrics::Counter,
    /// Counter for reconciliation errors
    pub errors: metrics::Counter,
    /// Histogram for reconciliation duration
    pub duration: metrics::Histogram,
    /// Counter for configuration-driven rolling restarts
    pub restarts: metrics::Counter,
}

impl ControllerMetrics {
    /// Create new controller metrics
    pub fn new() -> Self {
        Self {
            reconciliations: metrics::counter!("rabbitmq_operator_reconciliations_total"),
            errors: metrics::counter!("rabbitmq_operator_reconciliation_errors_total"),
            duration: metrics::histogram!("rabbitmq_operator_reconciliation_duration_seconds"),
            restarts: metrics::counter!("rabbitmq_operator_restarts_total"),
        }
    }
}

impl Default for ControllerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// What a single child reconcile did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    Created,
    Updated,
    Unchanged,
}

impl ChildOutcome {
    /// Whether the object was already present before this pass
    pub fn existed(self) -> bool {
        !matches!(self, ChildOutcome::Created)
    }
}

/// Start the RabbitmqCluster controller
pub async fn run_controller(
    client: Client,
    namespace: Option<String>,
    config: OperatorConfig,
) -> Result<()> {
    let clusters: Api<RabbitmqCluster> = match &namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };

    let ctx = Arc::new(ControllerContext {
        client: client.clone(),
        config,
        metrics: Some(ControllerMetrics::new()),
        error_counts: dashmap::DashMap::new(),
    });

    info!(
        namespace = namespace.as_deref().unwrap_or("all"),
        "Starting RabbitmqCluster controller"
    );

    Controller::new(clusters, Config::default())
        .owns(watched::<StatefulSet>(&client, &namespace), Config::default())
        .owns(watched::<ConfigMap>(&client, &namespace), Config::default())
        .owns(watched::<Service>(&client, &namespace), Config::default())
        .owns(watched::<Secret>(&client, &namespace), Config::default())
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, action)) => {
                    debug!(
                        name = obj.name,
                        namespace = obj.namespace,
                        ?action,
                        "Reconciliation completed"
                    );
                }
                Err(e) => {
                    error!(error = %e, "Reconciliation failed");
                }
            }
        })
        .await;

    Ok(())
}

/// Api for an owned kind, scoped like the cluster watch
fn watched<K>(client: &Client, namespace: &Option<String>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Main reconciliation function
#[instrument(skip(cluster, ctx), fields(name = %cluster.name_any(), namespace = cluster.namespace()))]
async fn reconcile(cluster: Arc<RabbitmqCluster>, ctx: Arc<ControllerContext>) -> Result<Action> {
    let start = std::time::Instant::now();

    if let Some(ref metrics) = ctx.metrics {
        metrics.reconciliations.increment(1);
    }

    let key = backoff_key(&cluster);
    let result = apply_cluster(cluster, ctx.clone()).await;

    if let Some(ref metrics) = ctx.metrics {
        metrics.duration.record(start.elapsed().as_secs_f64());
    }

    match result {
        Ok(action) => {
            ctx.error_counts.remove(&key);
            Ok(action)
        }
        Err(e) => {
            if let Some(ref metrics) = ctx.metrics {
                metrics.errors.increment(1);
            }
            Err(e)
        }
    }
}

fn backoff_key(cluster: &RabbitmqCluster) -> String {
    format!("{}/{}", cluster.namespace_or_default(), cluster.name_any())
}

/// Converge every child object of the cluster
#[instrument(skip(cluster, ctx))]
async fn apply_cluster(cluster: Arc<RabbitmqCluster>, ctx: Arc<ControllerContext>) -> Result<Action> {
    let name = cluster.name_any();
    let namespace = cluster.namespace_or_default();

    if cluster.metadata.deletion_timestamp.is_some() {
        debug!(name = %name, "Cluster is being deleted, children follow by owner reference");
        return Ok(Action::await_change());
    }

    info!(name = %name, namespace = %namespace, "Reconciling RabbitmqCluster");

    validate_spec(&cluster)?;
    for warning in tls_warnings(&cluster) {
        warn!(name = %name, "{}", warning);
    }

    let base = RabbitmqResourceBuilder::new(&cluster, &ctx.config)?;
    let registry_source = if base.uses_default_pull_secret() {
        Some(fetch_registry_source(&ctx.client, &ctx.config).await?)
    } else {
        None
    };

    let mut restart = false;
    let mut fingerprint: Option<String> = None;

    for mut child in base.resource_builders(registry_source) {
        if let ChildBuilder::StatefulSet(builder) = &mut child {
            builder.set_config_fingerprint(fingerprint.clone());
        }

        let outcome = reconcile_builder(&ctx.client, &namespace, &mut child).await?;
        restart |= child.update_requires_sts_restart();

        match &child {
            ChildBuilder::ServerConfigMap(builder) => {
                fingerprint = builder.config_fingerprint().map(str::to_string);
            }
            ChildBuilder::StatefulSet(builder) if outcome.existed() => {
                if builder.rolls_pods() {
                    record_restart(&ctx, &base.name(SERVER_SUFFIX), fingerprint.as_deref());
                } else if restart {
                    debug!(name = %name, "Brokers already run the current configuration");
                }
            }
            _ => {}
        }
    }

    let status = build_status(&cluster);
    update_status(&ctx.client, &namespace, &name, status).await?;

    info!(name = %name, "Reconciliation complete");

    Ok(Action::requeue(Duration::from_secs(DEFAULT_REQUEUE_SECONDS)))
}

/// Check the cluster spec against its declared field rules
fn validate_spec(cluster: &RabbitmqCluster) -> Result<()> {
    if let Err(errors) = cluster.spec.validate() {
        let error_messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter()
                    .map(move |e| format!("{}: {:?}", field, e.message))
            })
            .collect();
        let error_msg = error_messages.join("; ");
        warn!(name = %cluster.name_any(), errors = %error_msg, "Cluster spec validation failed");
        return Err(OperatorError::ValidationError(error_msg));
    }
    Ok(())
}

/// TLS settings that have no effect as given
fn tls_warnings(cluster: &RabbitmqCluster) -> Vec<&'static str> {
    let spec = &cluster.spec;
    let mut warnings = Vec::new();
    if !spec.tls_enabled() {
        if spec.tls.ca_secret_name.as_deref().is_some_and(|s| !s.is_empty()) {
            warnings.push("tls.caSecretName is ignored without tls.secretName");
        }
        if spec.disable_non_tls_listeners() {
            warnings.push("tls.disableNonTLSListeners is ignored without tls.secretName");
        }
    }
    warnings
}

/// Read the operator's default pull secret from its own namespace
async fn fetch_registry_source(client: &Client, config: &OperatorConfig) -> Result<Secret> {
    let name = config.default_image_pull_secret().ok_or_else(|| {
        OperatorError::InvalidConfig("no default image pull secret configured".to_string())
    })?;
    let api: Api<Secret> = Api::namespaced(client.clone(), &config.operator_namespace);
    api.get_opt(name).await?.ok_or_else(|| OperatorError::NotFound {
        kind: "Secret".to_string(),
        name: name.to_string(),
        namespace: config.operator_namespace.clone(),
    })
}

/// Dispatch one family member to the typed reconcile
async fn reconcile_builder(
    client: &Client,
    namespace: &str,
    child: &mut ChildBuilder<'_>,
) -> Result<ChildOutcome> {
    match child {
        ChildBuilder::HeadlessService(b) => reconcile_child::<Service, _>(client, namespace, b).await,
        ChildBuilder::IngressService(b) => reconcile_child::<Service, _>(client, namespace, b).await,
        ChildBuilder::ServerConfigMap(b) => reconcile_child::<ConfigMap, _>(client, namespace, b).await,
        ChildBuilder::AdminSecret(b) => reconcile_child::<Secret, _>(client, namespace, b).await,
        ChildBuilder::ErlangCookie(b) => reconcile_child::<Secret, _>(client, namespace, b).await,
        ChildBuilder::RegistrySecret(b) => reconcile_child::<Secret, _>(client, namespace, b).await,
        ChildBuilder::ServiceAccount(b) => {
            reconcile_child::<ServiceAccount, _>(client, namespace, b).await
        }
        ChildBuilder::Role(b) => reconcile_child::<Role, _>(client, namespace, b).await,
        ChildBuilder::RoleBinding(b) => reconcile_child::<RoleBinding, _>(client, namespace, b).await,
        ChildBuilder::StatefulSet(b) => reconcile_child::<StatefulSet, _>(client, namespace, b).await,
    }
}

/// Create or update one child object.
///
/// The live object is patched in memory and replaced only when the patch
/// changed it; the replace carries the fetched resourceVersion, so a
/// concurrent writer makes it fail with a conflict instead of being
/// overwritten.
async fn reconcile_child<K, B>(client: &Client, namespace: &str, builder: &mut B) -> Result<ChildOutcome>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + std::fmt::Debug
        + PartialEq
        + serde::Serialize
        + serde::de::DeserializeOwned,
    B: ResourceBuilder<Object = K>,
{
    let desired = builder.build()?;
    let name = desired.meta().name.clone().ok_or_else(|| {
        OperatorError::InvalidConfig(format!("{} skeleton has no name", K::kind(&())))
    })?;
    let api: Api<K> = Api::namespaced(client.clone(), namespace);

    match api.get_opt(&name).await? {
        None => {
            let mut object = desired;
            builder.update(&mut object)?;
            api.create(&PostParams::default(), &object).await?;
            info!(kind = %K::kind(&()), name = %name, "Created child object");
            Ok(ChildOutcome::Created)
        }
        Some(existing) => {
            let mut object = existing.clone();
            builder.update(&mut object)?;
            if object == existing {
                debug!(kind = %K::kind(&()), name = %name, "Child object up to date");
                return Ok(ChildOutcome::Unchanged);
            }
            api.replace(&name, &PostParams::default(), &object).await?;
            info!(kind = %K::kind(&()), name = %name, "Updated child object");
            Ok(ChildOutcome::Updated)
        }
    }
}

/// Count a configuration-driven rolling restart
fn record_restart(ctx: &ControllerContext, name: &str, fingerprint: Option<&str>) {
    if let Some(ref metrics) = ctx.metrics {
        metrics.restarts.increment(1);
    }
    info!(
        name = %name,
        fingerprint = fingerprint.unwrap_or_default(),
        "Restarting brokers for configuration change"
    );
}

/// Status after a completed pass.
///
/// The condition keeps its previous transition time while its status holds.
fn build_status(cluster: &RabbitmqCluster) -> RabbitmqClusterStatus {
    let previous = cluster
        .status
        .as_ref()
        .and_then(|s| s.conditions.iter().find(|c| c.condition_type == "Reconciled"));
    let last_transition_time = match previous {
        Some(c) if c.status == "True" => c.last_transition_time.clone(),
        _ => Some(Utc::now().to_rfc3339()),
    };

    RabbitmqClusterStatus {
        cluster_status: CLUSTER_STATUS_CREATED.to_string(),
        conditions: vec![ClusterCondition {
            condition_type: "Reconciled".to_string(),
            status: "True".to_string(),
            reason: Some("Success".to_string()),
            message: Some("All child objects converged".to_string()),
            last_transition_time,
        }],
        observed_generation: cluster.metadata.generation.unwrap_or(0),
    }
}

/// Update the cluster status subresource
async fn update_status(
    client: &Client,
    namespace: &str,
    name: &str,
    status: RabbitmqClusterStatus,
) -> Result<()> {
    let api: Api<RabbitmqCluster> = Api::namespaced(client.clone(), namespace);

    debug!(name = %name, cluster_status = %status.cluster_status, "Updating cluster status");

    let patch = serde_json::json!({
        "status": status
    });

    api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    Ok(())
}

/// Requeue delay for the `retries`-th consecutive failure
fn backoff_delay(error: &OperatorError, retries: u32) -> Duration {
    // 30s, 60s, 120s, 240s, 480s, then capped at 600s
    error.requeue_delay().unwrap_or_else(|| {
        let base = Duration::from_secs(ERROR_REQUEUE_SECONDS);
        let backoff = base * 2u32.saturating_pow(retries.saturating_sub(1).min(5));
        backoff.min(Duration::from_secs(MAX_ERROR_REQUEUE_SECONDS))
    })
}

/// Error policy for the controller: exponential backoff per cluster
fn error_policy(
    cluster: Arc<RabbitmqCluster>,
    error: &OperatorError,
    ctx: Arc<ControllerContext>,
) -> Action {
    let key = backoff_key(&cluster);
    let retries = {
        let mut entry = ctx.error_counts.entry(key.clone()).or_insert(0);
        *entry += 1;
        *entry
    };

    let delay = backoff_delay(error, retries);

    warn!(
        error = %error,
        retry = retries,
        delay_secs = delay.as_secs(),
        "Reconciliation error for '{}', will retry",
        key
    );

    Action::requeue(delay)
}
