//! vpcflow Cloud Infrastructure
//!
//! This crate provides the cloud provider abstraction for vpcflow and the
//! fixed sequence that builds a two-subnet network with one reachable host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  vpcflow CLI                     │
//! │              (vpcflow up / plan)                 │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                vpcflow-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │          Provider Abstraction             │   │
//! │  │  trait CloudProvider { ... }              │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ Provisioner  │  │ Bounded poll │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │    aws-ec2    │
//! │   provider    │
//! └───────────────┘
//! ```

pub mod error;
pub mod plan;
pub mod poll;
pub mod provider;
pub mod provisioner;
pub mod state;

// Re-exports
pub use error::{CloudError, ProvisionError, Result};
pub use plan::{Plan, PlanSummary, PlannedStep, Step};
pub use poll::{PollConfig, PollOutcome, poll_until};
pub use provider::{
    Allocation, AuthStatus, CloudProvider, IngressRule, IngressSource, InstanceSpec, Tag,
};
pub use provisioner::{ProvisionOutcome, Provisioner, load_credentials};
pub use state::{ResourceKind, ResourceLedger, ResourceState, ResourceStatus};
