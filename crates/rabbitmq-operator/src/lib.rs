//! # RabbitMQ Kubernetes Operator
//!
//! Kubernetes operator that deploys and manages clustered RabbitMQ brokers
//! declared through the `RabbitmqCluster` custom resource.
//!
//! ## Features
//!
//! - **Custom Resource Definition**: `RabbitmqCluster` (`rabbitmq.com/v1beta1`)
//! - **Configuration rendering**: layered `rabbitmq.conf` files built from
//!   operator defaults, TLS settings, memory limits and user overlays
//! - **Restart classification**: configuration changes the running nodes
//!   cannot pick up trigger exactly one rolling restart; peer list changes
//!   from scaling do not
//! - **Child objects**: ConfigMap, credentials and Erlang cookie Secrets,
//!   registry pull secret, ingress and headless Services, RBAC for peer
//!   discovery and the broker StatefulSet
//! - **Observability**: structured `tracing` logs and Prometheus metrics
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rabbitmq_operator::prelude::*;
//! use kube::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::try_default().await?;
//!     run_controller(client, None, OperatorConfig::default()).await
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    RabbitMQ Operator                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌────────────────────┐   ┌────────────┐  │
//! │  │  Controller  │──▶│  Resource builders │──▶│ Kubernetes │  │
//! │  │  (watch)     │   │  (pure, in-place)  │   │    API     │  │
//! │  └──────────────┘   └────────────────────┘   └────────────┘  │
//! │         │                     │                              │
//! │         ▼                     ▼                              │
//! │  ┌──────────────┐   ┌────────────────────┐                   │
//! │  │   Status     │   │  Config merge and  │                   │
//! │  │   updates    │   │  restart classifier│                   │
//! │  └──────────────┘   └────────────────────┘                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Builders never perform I/O: the controller fetches each child, lets its
//! builder patch it in memory, and writes it back only when it changed.

pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod metadata;
pub mod quantity;
pub mod resource;

pub mod prelude {
    //! Re-exports for convenient usage
    pub use crate::config::{OperatorConfig, PersistenceConfig, ServiceConfig};
    pub use crate::controller::{run_controller, ControllerContext, ControllerMetrics};
    pub use crate::crd::{
        ClusterCondition, PersistenceSpec, RabbitmqCluster, RabbitmqClusterSpec,
        RabbitmqClusterStatus, RabbitmqConfigSpec, RabbitmqServiceSpec, TlsSpec,
    };
    pub use crate::error::{OperatorError, Result};
    pub use crate::resource::server_configmap::{
        build_configuration, remove_headroom, requires_restart, RenderedConfiguration,
    };
    pub use crate::resource::{ChildBuilder, RabbitmqResourceBuilder, ResourceBuilder};
}
