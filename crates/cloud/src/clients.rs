//! Client traits: the only surface the reconcilers call.
//!
//! Each trait covers one service area with the handful of Read/Write
//! operations the convergence sequence needs. Reads return `Ok(None)` for
//! "resource does not exist" — absence is an expected outcome, not an error.
//! Every other failure surfaces as [`groundwork_core::Error::Api`] and is
//! fatal to the run.

use std::sync::Arc;

use async_trait::async_trait;

use groundwork_core::Result;
use groundwork_core::spec::{EnvironmentSpec, PublicAccessBlock};

use crate::types::{
    ApplicationState, BucketState, DbInstanceParams, DbInstanceState, DbSubnetGroupState,
    EnvironmentState, HostedZoneState, IngressRule, InstanceProfileState, InstanceState,
    LoadBalancerState, ManagedPolicyState, PolicyVersion, RecordState, RecordType, RoleState,
    SecurityGroupState, SubnetState,
};

/// S3 bucket operations.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn describe_bucket(&self, name: &str) -> Result<Option<BucketState>>;
    async fn create_bucket(&self, name: &str, region: &str) -> Result<()>;
    async fn put_cors_methods(&self, name: &str, methods: &[String]) -> Result<()>;
    async fn put_public_access_block(
        &self,
        name: &str,
        block: &PublicAccessBlock,
    ) -> Result<()>;
}

/// IAM role, instance-profile, and managed-policy operations.
#[async_trait]
pub trait IamClient: Send + Sync {
    async fn describe_role(&self, name: &str) -> Result<Option<RoleState>>;
    async fn create_role(&self, name: &str, trust_policy: &serde_json::Value) -> Result<()>;
    async fn update_trust_policy(
        &self,
        name: &str,
        trust_policy: &serde_json::Value,
    ) -> Result<()>;
    async fn attach_role_policy(&self, role: &str, policy_arn: &str) -> Result<()>;

    async fn describe_instance_profile(&self, name: &str)
    -> Result<Option<InstanceProfileState>>;
    async fn create_instance_profile(&self, name: &str) -> Result<()>;
    async fn add_role_to_instance_profile(&self, profile: &str, role: &str) -> Result<()>;

    async fn find_policy(&self, name: &str) -> Result<Option<ManagedPolicyState>>;
    /// Create a policy; returns its ARN.
    async fn create_policy(&self, name: &str, document: &serde_json::Value) -> Result<String>;
    async fn list_policy_versions(&self, arn: &str) -> Result<Vec<PolicyVersion>>;
    /// Create a new version, optionally making it the default; returns the
    /// version id.
    async fn create_policy_version(
        &self,
        arn: &str,
        document: &serde_json::Value,
        set_as_default: bool,
    ) -> Result<String>;
    async fn delete_policy_version(&self, arn: &str, version_id: &str) -> Result<()>;
}

/// Elastic Beanstalk operations.
#[async_trait]
pub trait BeanstalkClient: Send + Sync {
    async fn describe_application(&self, name: &str) -> Result<Option<ApplicationState>>;
    async fn create_application(&self, name: &str) -> Result<()>;
    async fn describe_environment(&self, name: &str) -> Result<Option<EnvironmentState>>;
    async fn create_environment(&self, spec: &EnvironmentSpec) -> Result<()>;
    /// Re-submit the full desired option settings; never a partial patch.
    async fn update_environment(&self, spec: &EnvironmentSpec) -> Result<()>;
    async fn environment_instance_ids(&self, name: &str) -> Result<Vec<String>>;
    async fn environment_load_balancer(&self, name: &str)
    -> Result<Option<LoadBalancerState>>;
}

/// EC2 network operations.
#[async_trait]
pub trait Ec2Client: Send + Sync {
    async fn describe_instance(&self, id: &str) -> Result<Option<InstanceState>>;
    async fn subnets_in_vpc(&self, vpc_id: &str) -> Result<Vec<SubnetState>>;
    async fn find_security_group(
        &self,
        vpc_id: &str,
        name: &str,
    ) -> Result<Option<SecurityGroupState>>;
    /// Create a security group; returns its id.
    async fn create_security_group(
        &self,
        vpc_id: &str,
        name: &str,
        description: &str,
    ) -> Result<String>;
    async fn authorize_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<()>;
}

/// RDS operations.
#[async_trait]
pub trait RdsClient: Send + Sync {
    async fn describe_db_instance(&self, identifier: &str) -> Result<Option<DbInstanceState>>;
    async fn create_db_instance(&self, params: &DbInstanceParams) -> Result<()>;
    async fn modify_max_allocated_storage(&self, identifier: &str, max: i64) -> Result<()>;
    async fn create_read_replica(
        &self,
        replica_identifier: &str,
        source_identifier: &str,
        instance_class: &str,
    ) -> Result<()>;
    async fn describe_subnet_group(&self, name: &str) -> Result<Option<DbSubnetGroupState>>;
    async fn create_subnet_group(
        &self,
        name: &str,
        description: &str,
        subnet_ids: &[String],
    ) -> Result<()>;
}

/// Application-autoscaling operations for the replica fleet.
///
/// Both calls are naturally idempotent: re-registration overwrites.
#[async_trait]
pub trait AutoscalingClient: Send + Sync {
    async fn describe_scalable_target(&self, resource_id: &str)
    -> Result<Option<(u32, u32)>>;
    async fn register_scalable_target(
        &self,
        resource_id: &str,
        min_capacity: u32,
        max_capacity: u32,
    ) -> Result<()>;
    async fn describe_scaling_policy(&self, policy_name: &str) -> Result<Option<f64>>;
    async fn put_target_tracking_policy(
        &self,
        policy_name: &str,
        resource_id: &str,
        target_cpu: f64,
    ) -> Result<()>;
}

/// Route 53 operations.
#[async_trait]
pub trait DnsClient: Send + Sync {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZoneState>>;
    async fn find_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<RecordState>>;
    /// Create-or-replace by name and type.
    async fn upsert_record(&self, zone_id: &str, record: &RecordState) -> Result<()>;
}

/// Secret-store operations for the database master password.
#[async_trait]
pub trait SecretsClient: Send + Sync {
    async fn get_secret(&self, name: &str) -> Result<Option<String>>;
    async fn put_secret(&self, name: &str, value: &str) -> Result<()>;
}

/// The full set of clients a convergence run needs.
#[derive(Clone)]
pub struct CloudClients {
    pub storage: Arc<dyn StorageClient>,
    pub iam: Arc<dyn IamClient>,
    pub beanstalk: Arc<dyn BeanstalkClient>,
    pub ec2: Arc<dyn Ec2Client>,
    pub rds: Arc<dyn RdsClient>,
    pub autoscaling: Arc<dyn AutoscalingClient>,
    pub dns: Arc<dyn DnsClient>,
    pub secrets: Arc<dyn SecretsClient>,
}
