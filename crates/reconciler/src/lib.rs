//! Reconciliation core for Groundwork.
//!
//! Every managed resource follows the same loop:
//!
//! 1. Read the observed state through the narrow cloud boundary
//! 2. Compare against the desired spec ([`compare`], pure, no I/O)
//! 3. Classify into `Absent` / `Matches` / `Differs`
//! 4. Apply the minimal action, or surface the divergence when applying it
//!    would be risky
//!
//! The [`driver::ConvergenceDriver`] runs the per-resource reconcilers in
//! fixed dependency order — buckets, IAM, Beanstalk environment, network
//! topology, database sequence, DNS — and aggregates a run summary. Runs are
//! idempotent: a second run against converged state takes no write actions.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod compare;
pub mod database;
pub mod dns;
pub mod driver;
pub mod network;
pub mod policy;
pub mod reconcile;

pub use compare::Outcome;
pub use database::DatabaseReconciler;
pub use dns::{DnsOutcome, DnsRecordReconciler};
pub use driver::{ConvergenceDriver, RunSummary};
pub use network::{NetworkTopology, NetworkTopologyResolver};
pub use policy::PolicyVersionManager;
pub use reconcile::{
    Action, ApproveAll, BucketReconciler, Confirm, DeclineAll, EnvironmentReconciler,
    ResourceOutcome, RoleReconciler,
};
