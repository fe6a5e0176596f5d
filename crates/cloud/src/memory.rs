//! In-memory implementation of every client trait.
//!
//! Backs the test suite and simulated runs. Mutations apply instantly
//! (created instances report `available` on the next describe) and every
//! write operation is logged so tests can assert that a converged run makes
//! no write calls at all.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use groundwork_core::spec::{EnvironmentSpec, PublicAccessBlock};
use groundwork_core::{Error, Result};

use crate::clients::{
    AutoscalingClient, BeanstalkClient, CloudClients, DnsClient, Ec2Client, IamClient, RdsClient,
    SecretsClient, StorageClient,
};
use crate::types::{
    ApplicationState, BucketState, DbInstanceParams, DbInstanceState, DbSubnetGroupState,
    EnvironmentState, HostedZoneState, IngressRule, InstanceProfileState, InstanceState,
    LoadBalancerState, ManagedPolicyState, PolicyVersion, RecordState, RecordType, RoleState,
    SecurityGroupState, SubnetState,
};

#[derive(Default)]
struct State {
    buckets: BTreeMap<String, BucketState>,
    roles: BTreeMap<String, RoleState>,
    profiles: BTreeMap<String, InstanceProfileState>,
    policies: BTreeMap<String, ManagedPolicyState>,
    policy_arns_by_name: BTreeMap<String, String>,
    policy_version_counters: BTreeMap<String, i64>,
    applications: BTreeMap<String, ApplicationState>,
    environments: BTreeMap<String, EnvironmentState>,
    environment_instances: BTreeMap<String, Vec<String>>,
    load_balancers: BTreeMap<String, LoadBalancerState>,
    instances: BTreeMap<String, InstanceState>,
    subnets: Vec<SubnetState>,
    security_groups: BTreeMap<String, SecurityGroupState>,
    security_group_counter: u64,
    db_instances: BTreeMap<String, DbInstanceState>,
    db_subnet_groups: BTreeMap<String, DbSubnetGroupState>,
    scalable_targets: BTreeMap<String, (u32, u32)>,
    scaling_policies: BTreeMap<String, f64>,
    zones: BTreeMap<String, HostedZoneState>,
    records: BTreeMap<(String, String, RecordType), RecordState>,
    secrets: BTreeMap<String, String>,
    write_log: Vec<String>,
}

/// In-memory cloud used by tests and simulated runs.
#[derive(Default)]
pub struct InMemoryCloud {
    state: RwLock<State>,
}

fn record_key(zone_id: &str, name: &str, record_type: RecordType) -> (String, String, RecordType) {
    // Route 53 treats names as dot-terminated; normalize the key.
    (
        zone_id.to_string(),
        name.trim_end_matches('.').to_string(),
        record_type,
    )
}

impl InMemoryCloud {
    /// Create an empty in-memory cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty in-memory cloud wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// The full client set, all backed by this instance.
    pub fn clients(self: &Arc<Self>) -> CloudClients {
        CloudClients {
            storage: self.clone(),
            iam: self.clone(),
            beanstalk: self.clone(),
            ec2: self.clone(),
            rds: self.clone(),
            autoscaling: self.clone(),
            dns: self.clone(),
            secrets: self.clone(),
        }
    }

    /// Every mutating call made so far, in order.
    pub async fn write_ops(&self) -> Vec<String> {
        self.state.read().await.write_log.clone()
    }

    /// Forget recorded write calls.
    pub async fn clear_write_ops(&self) {
        self.state.write().await.write_log.clear();
    }

    /// Seed a subnet into a VPC.
    pub async fn seed_subnet(&self, id: &str, vpc_id: &str) {
        self.state.write().await.subnets.push(SubnetState {
            id: id.to_string(),
            vpc_id: vpc_id.to_string(),
        });
    }

    /// Seed an EC2 instance.
    pub async fn seed_instance(&self, instance: InstanceState) {
        self.state
            .write()
            .await
            .instances
            .insert(instance.id.clone(), instance);
    }

    /// Seed a security group.
    pub async fn seed_security_group(&self, group: SecurityGroupState) {
        self.state
            .write()
            .await
            .security_groups
            .insert(group.id.clone(), group);
    }

    /// Attach instance ids to an environment.
    pub async fn attach_environment_instances(&self, environment: &str, ids: Vec<String>) {
        self.state
            .write()
            .await
            .environment_instances
            .insert(environment.to_string(), ids);
    }

    /// Set the VPCId / SecurityGroups option settings on an environment.
    pub async fn set_environment_network(
        &self,
        environment: &str,
        vpc_id: Option<String>,
        security_groups: Vec<String>,
    ) {
        let mut state = self.state.write().await;
        if let Some(env) = state.environments.get_mut(environment) {
            env.vpc_id = vpc_id;
            env.security_groups = security_groups;
        }
    }

    /// Seed a hosted zone.
    pub async fn seed_zone(&self, id: &str, name: &str) {
        self.state.write().await.zones.insert(
            id.to_string(),
            HostedZoneState {
                id: id.to_string(),
                name: name.to_string(),
            },
        );
    }

    /// Number of stored versions for a policy ARN.
    pub async fn policy_version_count(&self, arn: &str) -> usize {
        self.state
            .read()
            .await
            .policies
            .get(arn)
            .map_or(0, |p| p.versions.len())
    }

    async fn log_write(&self, op: impl Into<String>) {
        self.state.write().await.write_log.push(op.into());
    }
}

#[async_trait]
impl StorageClient for InMemoryCloud {
    async fn describe_bucket(&self, name: &str) -> Result<Option<BucketState>> {
        Ok(self.state.read().await.buckets.get(name).cloned())
    }

    async fn create_bucket(&self, name: &str, region: &str) -> Result<()> {
        self.log_write(format!("create_bucket {name}")).await;
        self.state.write().await.buckets.insert(
            name.to_string(),
            BucketState {
                name: name.to_string(),
                region: region.to_string(),
                cors_methods: vec![],
                public_access: PublicAccessBlock {
                    block_public_acls: false,
                    ignore_public_acls: false,
                    block_public_policy: false,
                    restrict_public_buckets: false,
                },
            },
        );
        Ok(())
    }

    async fn put_cors_methods(&self, name: &str, methods: &[String]) -> Result<()> {
        self.log_write(format!("put_cors_methods {name}")).await;
        let mut state = self.state.write().await;
        match state.buckets.get_mut(name) {
            Some(bucket) => {
                bucket.cors_methods = methods.to_vec();
                Ok(())
            }
            None => Err(Error::api("put_cors_methods", format!("no bucket '{name}'"))),
        }
    }

    async fn put_public_access_block(
        &self,
        name: &str,
        block: &PublicAccessBlock,
    ) -> Result<()> {
        self.log_write(format!("put_public_access_block {name}"))
            .await;
        let mut state = self.state.write().await;
        match state.buckets.get_mut(name) {
            Some(bucket) => {
                bucket.public_access = *block;
                Ok(())
            }
            None => Err(Error::api(
                "put_public_access_block",
                format!("no bucket '{name}'"),
            )),
        }
    }
}

#[async_trait]
impl IamClient for InMemoryCloud {
    async fn describe_role(&self, name: &str) -> Result<Option<RoleState>> {
        Ok(self.state.read().await.roles.get(name).cloned())
    }

    async fn create_role(&self, name: &str, trust_policy: &serde_json::Value) -> Result<()> {
        self.log_write(format!("create_role {name}")).await;
        self.state.write().await.roles.insert(
            name.to_string(),
            RoleState {
                name: name.to_string(),
                trust_policy: trust_policy.clone(),
                attached_policy_arns: vec![],
            },
        );
        Ok(())
    }

    async fn update_trust_policy(
        &self,
        name: &str,
        trust_policy: &serde_json::Value,
    ) -> Result<()> {
        self.log_write(format!("update_trust_policy {name}")).await;
        let mut state = self.state.write().await;
        match state.roles.get_mut(name) {
            Some(role) => {
                role.trust_policy = trust_policy.clone();
                Ok(())
            }
            None => Err(Error::api("update_trust_policy", format!("no role '{name}'"))),
        }
    }

    async fn attach_role_policy(&self, role: &str, policy_arn: &str) -> Result<()> {
        self.log_write(format!("attach_role_policy {role} {policy_arn}"))
            .await;
        let mut state = self.state.write().await;
        match state.roles.get_mut(role) {
            Some(role) => {
                if !role.attached_policy_arns.iter().any(|a| a == policy_arn) {
                    role.attached_policy_arns.push(policy_arn.to_string());
                }
                Ok(())
            }
            None => Err(Error::api("attach_role_policy", format!("no role '{role}'"))),
        }
    }

    async fn describe_instance_profile(
        &self,
        name: &str,
    ) -> Result<Option<InstanceProfileState>> {
        Ok(self.state.read().await.profiles.get(name).cloned())
    }

    async fn create_instance_profile(&self, name: &str) -> Result<()> {
        self.log_write(format!("create_instance_profile {name}"))
            .await;
        self.state.write().await.profiles.insert(
            name.to_string(),
            InstanceProfileState {
                name: name.to_string(),
                role_names: vec![],
            },
        );
        Ok(())
    }

    async fn add_role_to_instance_profile(&self, profile: &str, role: &str) -> Result<()> {
        self.log_write(format!("add_role_to_instance_profile {profile} {role}"))
            .await;
        let mut state = self.state.write().await;
        match state.profiles.get_mut(profile) {
            Some(p) => {
                if !p.role_names.iter().any(|r| r == role) {
                    p.role_names.push(role.to_string());
                }
                Ok(())
            }
            None => Err(Error::api(
                "add_role_to_instance_profile",
                format!("no instance profile '{profile}'"),
            )),
        }
    }

    async fn find_policy(&self, name: &str) -> Result<Option<ManagedPolicyState>> {
        let state = self.state.read().await;
        Ok(state
            .policy_arns_by_name
            .get(name)
            .and_then(|arn| state.policies.get(arn))
            .cloned())
    }

    async fn create_policy(&self, name: &str, document: &serde_json::Value) -> Result<String> {
        self.log_write(format!("create_policy {name}")).await;
        let arn = format!("arn:aws:iam::123456789012:policy/{name}");
        let mut state = self.state.write().await;
        state.policy_version_counters.insert(arn.clone(), 1);
        state.policies.insert(
            arn.clone(),
            ManagedPolicyState {
                arn: arn.clone(),
                name: name.to_string(),
                versions: vec![PolicyVersion {
                    version_id: "v1".to_string(),
                    is_default: true,
                    create_date: version_date(1),
                    document: document.clone(),
                }],
            },
        );
        state
            .policy_arns_by_name
            .insert(name.to_string(), arn.clone());
        Ok(arn)
    }

    async fn list_policy_versions(&self, arn: &str) -> Result<Vec<PolicyVersion>> {
        let state = self.state.read().await;
        match state.policies.get(arn) {
            Some(policy) => Ok(policy.versions.clone()),
            None => Err(Error::api("list_policy_versions", format!("no policy '{arn}'"))),
        }
    }

    async fn create_policy_version(
        &self,
        arn: &str,
        document: &serde_json::Value,
        set_as_default: bool,
    ) -> Result<String> {
        self.log_write(format!("create_policy_version {arn}")).await;
        let mut state = self.state.write().await;
        let counter = state
            .policy_version_counters
            .entry(arn.to_string())
            .or_insert(0);
        *counter += 1;
        let ordinal = *counter;
        let version_id = format!("v{ordinal}");
        match state.policies.get_mut(arn) {
            Some(policy) => {
                if policy.versions.len() >= 5 {
                    return Err(Error::api(
                        "create_policy_version",
                        format!("policy '{arn}' already has 5 versions"),
                    ));
                }
                if set_as_default {
                    for version in &mut policy.versions {
                        version.is_default = false;
                    }
                }
                policy.versions.push(PolicyVersion {
                    version_id: version_id.clone(),
                    is_default: set_as_default,
                    create_date: version_date(ordinal),
                    document: document.clone(),
                });
                Ok(version_id)
            }
            None => Err(Error::api(
                "create_policy_version",
                format!("no policy '{arn}'"),
            )),
        }
    }

    async fn delete_policy_version(&self, arn: &str, version_id: &str) -> Result<()> {
        self.log_write(format!("delete_policy_version {arn} {version_id}"))
            .await;
        let mut state = self.state.write().await;
        match state.policies.get_mut(arn) {
            Some(policy) => {
                if policy
                    .versions
                    .iter()
                    .any(|v| v.version_id == version_id && v.is_default)
                {
                    return Err(Error::api(
                        "delete_policy_version",
                        "cannot delete the default version",
                    ));
                }
                policy.versions.retain(|v| v.version_id != version_id);
                Ok(())
            }
            None => Err(Error::api(
                "delete_policy_version",
                format!("no policy '{arn}'"),
            )),
        }
    }
}

fn version_date(ordinal: i64) -> DateTime<Utc> {
    // Strictly increasing, deterministic timestamps.
    DateTime::from_timestamp(1_700_000_000 + ordinal, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

#[async_trait]
impl BeanstalkClient for InMemoryCloud {
    async fn describe_application(&self, name: &str) -> Result<Option<ApplicationState>> {
        Ok(self.state.read().await.applications.get(name).cloned())
    }

    async fn create_application(&self, name: &str) -> Result<()> {
        self.log_write(format!("create_application {name}")).await;
        self.state.write().await.applications.insert(
            name.to_string(),
            ApplicationState {
                name: name.to_string(),
            },
        );
        Ok(())
    }

    async fn describe_environment(&self, name: &str) -> Result<Option<EnvironmentState>> {
        Ok(self.state.read().await.environments.get(name).cloned())
    }

    async fn create_environment(&self, spec: &EnvironmentSpec) -> Result<()> {
        self.log_write(format!("create_environment {}", spec.environment_name))
            .await;
        let mut state = self.state.write().await;
        state.environments.insert(
            spec.environment_name.clone(),
            EnvironmentState {
                name: spec.environment_name.clone(),
                application: spec.application.clone(),
                status: "Ready".to_string(),
                instance_type: Some(spec.instance_type.clone()),
                min_size: Some(spec.min_size),
                max_size: Some(spec.max_size),
                env_vars: spec.env_vars.clone(),
                vpc_id: None,
                security_groups: vec![],
            },
        );
        state.load_balancers.insert(
            spec.environment_name.clone(),
            LoadBalancerState {
                dns_name: format!("{}-lb.eb.local", spec.environment_name),
                canonical_hosted_zone_id: "Z32O12XQLNTSW2".to_string(),
            },
        );
        Ok(())
    }

    async fn update_environment(&self, spec: &EnvironmentSpec) -> Result<()> {
        self.log_write(format!("update_environment {}", spec.environment_name))
            .await;
        let mut state = self.state.write().await;
        match state.environments.get_mut(&spec.environment_name) {
            Some(env) => {
                env.instance_type = Some(spec.instance_type.clone());
                env.min_size = Some(spec.min_size);
                env.max_size = Some(spec.max_size);
                env.env_vars = spec.env_vars.clone();
                Ok(())
            }
            None => Err(Error::api(
                "update_environment",
                format!("no environment '{}'", spec.environment_name),
            )),
        }
    }

    async fn environment_instance_ids(&self, name: &str) -> Result<Vec<String>> {
        Ok(self
            .state
            .read()
            .await
            .environment_instances
            .get(name)
            .cloned()
            .unwrap_or_default())
    }

    async fn environment_load_balancer(
        &self,
        name: &str,
    ) -> Result<Option<LoadBalancerState>> {
        Ok(self.state.read().await.load_balancers.get(name).cloned())
    }
}

#[async_trait]
impl Ec2Client for InMemoryCloud {
    async fn describe_instance(&self, id: &str) -> Result<Option<InstanceState>> {
        Ok(self.state.read().await.instances.get(id).cloned())
    }

    async fn subnets_in_vpc(&self, vpc_id: &str) -> Result<Vec<SubnetState>> {
        Ok(self
            .state
            .read()
            .await
            .subnets
            .iter()
            .filter(|s| s.vpc_id == vpc_id)
            .cloned()
            .collect())
    }

    async fn find_security_group(
        &self,
        vpc_id: &str,
        name: &str,
    ) -> Result<Option<SecurityGroupState>> {
        Ok(self
            .state
            .read()
            .await
            .security_groups
            .values()
            .find(|g| g.vpc_id == vpc_id && g.name == name)
            .cloned())
    }

    async fn create_security_group(
        &self,
        vpc_id: &str,
        name: &str,
        _description: &str,
    ) -> Result<String> {
        self.log_write(format!("create_security_group {name}")).await;
        let mut state = self.state.write().await;
        state.security_group_counter += 1;
        let id = format!("sg-{:08x}", state.security_group_counter);
        state.security_groups.insert(
            id.clone(),
            SecurityGroupState {
                id: id.clone(),
                name: name.to_string(),
                vpc_id: vpc_id.to_string(),
                ingress: vec![],
            },
        );
        Ok(id)
    }

    async fn authorize_ingress(&self, group_id: &str, rule: &IngressRule) -> Result<()> {
        self.log_write(format!("authorize_ingress {group_id}")).await;
        let mut state = self.state.write().await;
        match state.security_groups.get_mut(group_id) {
            Some(group) => {
                group.ingress.push(rule.clone());
                Ok(())
            }
            None => Err(Error::api(
                "authorize_ingress",
                format!("no security group '{group_id}'"),
            )),
        }
    }
}

#[async_trait]
impl RdsClient for InMemoryCloud {
    async fn describe_db_instance(&self, identifier: &str) -> Result<Option<DbInstanceState>> {
        Ok(self.state.read().await.db_instances.get(identifier).cloned())
    }

    async fn create_db_instance(&self, params: &DbInstanceParams) -> Result<()> {
        self.log_write(format!("create_db_instance {}", params.identifier))
            .await;
        self.state.write().await.db_instances.insert(
            params.identifier.clone(),
            DbInstanceState {
                identifier: params.identifier.clone(),
                status: "available".to_string(),
                instance_class: params.instance_class.clone(),
                engine: params.engine.clone(),
                engine_version: params.engine_version.clone(),
                allocated_storage: params.allocated_storage,
                max_allocated_storage: None,
                multi_az: params.multi_az,
                endpoint: Some(format!("{}.db.local:5432", params.identifier)),
                replica_identifiers: vec![],
            },
        );
        Ok(())
    }

    async fn modify_max_allocated_storage(&self, identifier: &str, max: i64) -> Result<()> {
        self.log_write(format!("modify_max_allocated_storage {identifier}"))
            .await;
        let mut state = self.state.write().await;
        match state.db_instances.get_mut(identifier) {
            Some(db) => {
                db.max_allocated_storage = Some(max);
                Ok(())
            }
            None => Err(Error::api(
                "modify_max_allocated_storage",
                format!("no db instance '{identifier}'"),
            )),
        }
    }

    async fn create_read_replica(
        &self,
        replica_identifier: &str,
        source_identifier: &str,
        instance_class: &str,
    ) -> Result<()> {
        self.log_write(format!("create_read_replica {replica_identifier}"))
            .await;
        let mut state = self.state.write().await;
        let source = match state.db_instances.get(source_identifier) {
            Some(source) => source.clone(),
            None => {
                return Err(Error::api(
                    "create_read_replica",
                    format!("no source db instance '{source_identifier}'"),
                ));
            }
        };
        state.db_instances.insert(
            replica_identifier.to_string(),
            DbInstanceState {
                identifier: replica_identifier.to_string(),
                status: "available".to_string(),
                instance_class: instance_class.to_string(),
                engine: source.engine.clone(),
                engine_version: source.engine_version.clone(),
                allocated_storage: source.allocated_storage,
                max_allocated_storage: None,
                multi_az: false,
                endpoint: Some(format!("{replica_identifier}.db.local:5432")),
                replica_identifiers: vec![],
            },
        );
        if let Some(primary) = state.db_instances.get_mut(source_identifier) {
            primary
                .replica_identifiers
                .push(replica_identifier.to_string());
        }
        Ok(())
    }

    async fn describe_subnet_group(&self, name: &str) -> Result<Option<DbSubnetGroupState>> {
        Ok(self.state.read().await.db_subnet_groups.get(name).cloned())
    }

    async fn create_subnet_group(
        &self,
        name: &str,
        _description: &str,
        subnet_ids: &[String],
    ) -> Result<()> {
        self.log_write(format!("create_subnet_group {name}")).await;
        self.state.write().await.db_subnet_groups.insert(
            name.to_string(),
            DbSubnetGroupState {
                name: name.to_string(),
                subnet_ids: subnet_ids.to_vec(),
            },
        );
        Ok(())
    }
}

#[async_trait]
impl AutoscalingClient for InMemoryCloud {
    async fn describe_scalable_target(
        &self,
        resource_id: &str,
    ) -> Result<Option<(u32, u32)>> {
        Ok(self
            .state
            .read()
            .await
            .scalable_targets
            .get(resource_id)
            .copied())
    }

    async fn describe_scaling_policy(&self, policy_name: &str) -> Result<Option<f64>> {
        Ok(self
            .state
            .read()
            .await
            .scaling_policies
            .get(policy_name)
            .copied())
    }

    async fn register_scalable_target(
        &self,
        resource_id: &str,
        min_capacity: u32,
        max_capacity: u32,
    ) -> Result<()> {
        self.log_write(format!("register_scalable_target {resource_id}"))
            .await;
        self.state
            .write()
            .await
            .scalable_targets
            .insert(resource_id.to_string(), (min_capacity, max_capacity));
        Ok(())
    }

    async fn put_target_tracking_policy(
        &self,
        policy_name: &str,
        _resource_id: &str,
        target_cpu: f64,
    ) -> Result<()> {
        self.log_write(format!("put_target_tracking_policy {policy_name}"))
            .await;
        self.state
            .write()
            .await
            .scaling_policies
            .insert(policy_name.to_string(), target_cpu);
        Ok(())
    }
}

#[async_trait]
impl DnsClient for InMemoryCloud {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZoneState>> {
        Ok(self.state.read().await.zones.values().cloned().collect())
    }

    async fn find_record(
        &self,
        zone_id: &str,
        name: &str,
        record_type: RecordType,
    ) -> Result<Option<RecordState>> {
        Ok(self
            .state
            .read()
            .await
            .records
            .get(&record_key(zone_id, name, record_type))
            .cloned())
    }

    async fn upsert_record(&self, zone_id: &str, record: &RecordState) -> Result<()> {
        self.log_write(format!("upsert_record {} {}", zone_id, record.name))
            .await;
        self.state.write().await.records.insert(
            record_key(zone_id, &record.name, record.record_type()),
            record.clone(),
        );
        Ok(())
    }
}

#[async_trait]
impl SecretsClient for InMemoryCloud {
    async fn get_secret(&self, name: &str) -> Result<Option<String>> {
        Ok(self.state.read().await.secrets.get(name).cloned())
    }

    async fn put_secret(&self, name: &str, value: &str) -> Result<()> {
        self.log_write(format!("put_secret {name}")).await;
        self.state
            .write()
            .await
            .secrets
            .insert(name.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn test_write_ops_are_recorded() {
        let cloud = InMemoryCloud::new();
        cloud.create_bucket("b", "eu-west-1").await.unwrap();
        let ops = cloud.write_ops().await;
        assert_eq!(ops, vec!["create_bucket b"]);
    }

    #[tokio::test]
    async fn test_policy_version_ceiling_enforced() {
        let cloud = InMemoryCloud::new();
        let doc = serde_json::json!({"Version": "2012-10-17"});
        let arn = cloud.create_policy("p", &doc).await.unwrap();
        for _ in 0..4 {
            cloud.create_policy_version(&arn, &doc, true).await.unwrap();
        }
        let err = cloud.create_policy_version(&arn, &doc, true).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_default_version_cannot_be_deleted() {
        let cloud = InMemoryCloud::new();
        let doc = serde_json::json!({});
        let arn = cloud.create_policy("p", &doc).await.unwrap();
        assert!(cloud.delete_policy_version(&arn, "v1").await.is_err());
    }

    #[tokio::test]
    async fn test_read_replica_links_to_primary() {
        let cloud = InMemoryCloud::new();
        let params = DbInstanceParams {
            identifier: "db".into(),
            instance_class: "db.t3.micro".into(),
            engine: "postgres".into(),
            engine_version: "16.3".into(),
            allocated_storage: 20,
            multi_az: false,
            master_username: "app".into(),
            master_password: "secret".into(),
            backup_window: None,
            subnet_group: "db-subnets".into(),
            security_group_id: "sg-1".into(),
        };
        cloud.create_db_instance(&params).await.unwrap();
        cloud
            .create_read_replica("db-replica-1", "db", "db.t3.micro")
            .await
            .unwrap();

        let primary = cloud.describe_db_instance("db").await.unwrap().unwrap();
        assert_eq!(primary.replica_identifiers, vec!["db-replica-1"]);
        let replica = cloud
            .describe_db_instance("db-replica-1")
            .await
            .unwrap()
            .unwrap();
        assert!(replica.is_available());
    }

    #[tokio::test]
    async fn test_record_upsert_replaces_by_name_and_type() {
        let cloud = InMemoryCloud::new();
        cloud.seed_zone("Z1", "example.com.").await;
        let record = RecordState {
            name: "api.example.com".into(),
            ttl: Some(300),
            target: crate::types::RecordTarget::Cname {
                value: "old.example.com".into(),
            },
        };
        cloud.upsert_record("Z1", &record).await.unwrap();
        let replaced = RecordState {
            target: crate::types::RecordTarget::Cname {
                value: "new.example.com".into(),
            },
            ..record
        };
        cloud.upsert_record("Z1", &replaced).await.unwrap();

        let found = cloud
            .find_record("Z1", "api.example.com.", RecordType::Cname)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            found.target,
            crate::types::RecordTarget::Cname {
                value: "new.example.com".into()
            }
        );
    }
}
