//! Typed observed-state snapshots.
//!
//! One struct per managed resource, deserialized from structured API
//! responses. Comparison logic operates on these fields, never on raw
//! response text. Snapshots are created per reconciler call and discarded
//! after producing an outcome.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use groundwork_core::spec::PublicAccessBlock;

/// Observed S3 bucket configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketState {
    pub name: String,
    pub region: String,
    /// HTTP methods allowed by the bucket's CORS rules.
    pub cors_methods: Vec<String>,
    pub public_access: PublicAccessBlock,
}

/// Observed IAM role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleState {
    pub name: String,
    pub trust_policy: serde_json::Value,
    pub attached_policy_arns: Vec<String>,
}

/// Observed IAM instance profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceProfileState {
    pub name: String,
    pub role_names: Vec<String>,
}

/// One stored version of a customer-managed policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyVersion {
    pub version_id: String,
    pub is_default: bool,
    pub create_date: DateTime<Utc>,
    pub document: serde_json::Value,
}

/// Observed customer-managed policy with its stored versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedPolicyState {
    pub arn: String,
    pub name: String,
    pub versions: Vec<PolicyVersion>,
}

impl ManagedPolicyState {
    /// Document of the current default version, if any.
    pub fn default_document(&self) -> Option<&serde_json::Value> {
        self.versions
            .iter()
            .find(|v| v.is_default)
            .map(|v| &v.document)
    }
}

/// Observed Elastic Beanstalk application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationState {
    pub name: String,
}

/// Observed Elastic Beanstalk environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentState {
    pub name: String,
    pub application: String,
    /// Lifecycle status as reported by the API (`Launching`, `Ready`, ...).
    pub status: String,
    pub instance_type: Option<String>,
    pub min_size: Option<u32>,
    pub max_size: Option<u32>,
    pub env_vars: BTreeMap<String, String>,
    /// `VPCId` option setting, when configured directly.
    pub vpc_id: Option<String>,
    /// `SecurityGroups` option setting values. May hold group *names*
    /// rather than ids; ids carry the `sg-` prefix.
    pub security_groups: Vec<String>,
}

impl EnvironmentState {
    /// Whether the environment finished launching.
    pub fn is_ready(&self) -> bool {
        self.status == "Ready"
    }
}

/// Load balancer identity needed for ALIAS records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancerState {
    pub dns_name: String,
    pub canonical_hosted_zone_id: String,
}

/// Observed EC2 instance, reduced to network identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceState {
    pub id: String,
    pub vpc_id: Option<String>,
    pub subnet_id: Option<String>,
    pub security_group_ids: Vec<String>,
}

/// Observed VPC subnet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetState {
    pub id: String,
    pub vpc_id: String,
}

/// A single security-group ingress rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub protocol: String,
    pub port: u16,
    /// Source security group granted access.
    pub source_group_id: String,
}

/// Observed EC2 security group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityGroupState {
    pub id: String,
    pub name: String,
    pub vpc_id: String,
    pub ingress: Vec<IngressRule>,
}

/// Observed RDS instance (primary or replica).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbInstanceState {
    pub identifier: String,
    /// Lifecycle status as reported by the API (`creating`, `available`, ...).
    pub status: String,
    pub instance_class: String,
    pub engine: String,
    pub engine_version: String,
    pub allocated_storage: i64,
    pub max_allocated_storage: Option<i64>,
    pub multi_az: bool,
    pub endpoint: Option<String>,
    /// Identifiers of read replicas of this instance.
    pub replica_identifiers: Vec<String>,
}

impl DbInstanceState {
    /// Whether the instance is ready to serve connections.
    pub fn is_available(&self) -> bool {
        self.status == "available"
    }
}

/// Parameters for creating the primary RDS instance.
#[derive(Debug, Clone)]
pub struct DbInstanceParams {
    pub identifier: String,
    pub instance_class: String,
    pub engine: String,
    pub engine_version: String,
    pub allocated_storage: i64,
    pub multi_az: bool,
    pub master_username: String,
    pub master_password: String,
    pub backup_window: Option<String>,
    pub subnet_group: String,
    pub security_group_id: String,
}

/// Observed RDS subnet group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbSubnetGroupState {
    pub name: String,
    pub subnet_ids: Vec<String>,
}

/// Observed Route 53 hosted zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedZoneState {
    pub id: String,
    /// Zone name; the API reports it with a trailing dot.
    pub name: String,
}

/// DNS record shape: apex domains use an ALIAS `A` record, everything else
/// a CNAME. The shape is derived from the domain, never configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    Alias,
    Cname,
}

/// Target of a DNS record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordTarget {
    Cname { value: String },
    Alias(AliasTarget),
}

/// ALIAS target pointing at a load balancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTarget {
    pub dns_name: String,
    pub hosted_zone_id: String,
}

/// Observed (or desired) Route 53 record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordState {
    pub name: String,
    pub ttl: Option<i64>,
    pub target: RecordTarget,
}

impl RecordState {
    /// Record type implied by the target.
    pub const fn record_type(&self) -> RecordType {
        match self.target {
            RecordTarget::Cname { .. } => RecordType::Cname,
            RecordTarget::Alias(_) => RecordType::Alias,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_default_document_selection() {
        let policy = ManagedPolicyState {
            arn: "arn:aws:iam::123:policy/p".into(),
            name: "p".into(),
            versions: vec![
                PolicyVersion {
                    version_id: "v1".into(),
                    is_default: false,
                    create_date: Utc::now(),
                    document: serde_json::json!({"Version": "old"}),
                },
                PolicyVersion {
                    version_id: "v2".into(),
                    is_default: true,
                    create_date: Utc::now(),
                    document: serde_json::json!({"Version": "new"}),
                },
            ],
        };
        assert_eq!(
            policy.default_document().unwrap()["Version"],
            serde_json::json!("new")
        );
    }

    #[test]
    fn test_record_type_from_target() {
        let record = RecordState {
            name: "api.example.com".into(),
            ttl: Some(300),
            target: RecordTarget::Cname {
                value: "lb.example.com".into(),
            },
        };
        assert_eq!(record.record_type(), RecordType::Cname);
    }
}
