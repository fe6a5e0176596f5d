//! Core types, errors, and configuration for Groundwork.
//!
//! This crate holds everything the reconcilers share but that involves no
//! cloud I/O: the error taxonomy, the immutable desired-state configuration
//! tree with its pre-flight validation, and the bounded polling helper used
//! to wait on slow resource creation.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod poll;
pub mod spec;

pub use error::{Error, Result};
pub use poll::{PollConfig, PollStatus, poll_until};
pub use spec::{
    BucketSpec, DatabaseSpec, DesiredSpec, DnsSpec, EnvironmentSpec, IamSpec, ManagedPolicySpec,
    PublicAccessBlock, ReadReplicaSpec, ReplicaAutoscalingSpec, StorageAutoscalingSpec,
};
