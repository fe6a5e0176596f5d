//! The cloud Read/Write boundary.
//!
//! Everything the reconcilers know about AWS goes through the narrow client
//! traits in [`clients`]. Observed state comes back as the typed snapshots in
//! [`types`] — fetched fresh on every reconciler call, never cached across
//! calls. [`memory`] provides a full in-memory implementation of every trait,
//! used by the test suite and by simulated runs; an SDK-backed implementation
//! plugs in behind the same traits.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod clients;
pub mod memory;
pub mod types;

pub use clients::{
    AutoscalingClient, BeanstalkClient, CloudClients, DnsClient, Ec2Client, IamClient, RdsClient,
    SecretsClient, StorageClient,
};
pub use memory::InMemoryCloud;
pub use types::{
    AliasTarget, ApplicationState, BucketState, DbInstanceParams, DbInstanceState,
    DbSubnetGroupState, EnvironmentState, HostedZoneState, IngressRule, InstanceProfileState,
    InstanceState, LoadBalancerState, ManagedPolicyState, PolicyVersion, RecordState, RecordTarget,
    RecordType, RoleState, SecurityGroupState, SubnetState,
};
