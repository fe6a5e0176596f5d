//! The database convergence sequence.
//!
//! Seven ordered steps, each feeding the next: master password, subnet
//! group, security group, primary instance, storage ceiling, read replicas,
//! replica autoscaling. The order is load-bearing — the subnet and security
//! groups must exist before the instance, the instance before replicas, and
//! replicas before autoscaling registration.
//!
//! Two standing rules:
//! - instance class / engine / Multi-AZ divergence is reported and skipped,
//!   never auto-applied (it can cause downtime);
//! - the replica set only ever grows; excess replicas are left in place.

use std::sync::Arc;

use itertools::Itertools;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info, warn};

use groundwork_cloud::clients::{AutoscalingClient, Ec2Client, RdsClient, SecretsClient};
use groundwork_cloud::types::{DbInstanceParams, IngressRule};
use groundwork_core::poll::{PollConfig, PollStatus, poll_until};
use groundwork_core::spec::DatabaseSpec;
use groundwork_core::{Error, Result};

use crate::compare::{compare_db_instance, Outcome};
use crate::network::NetworkTopology;
use crate::reconcile::ResourceOutcome;

/// Port the database security-group ingress rule opens.
const DB_PORT: u16 = 5432;

/// Length of a generated master password.
const GENERATED_PASSWORD_LEN: usize = 32;

/// Converges the full database sequence.
pub struct DatabaseReconciler {
    rds: Arc<dyn RdsClient>,
    ec2: Arc<dyn Ec2Client>,
    secrets: Arc<dyn SecretsClient>,
    autoscaling: Arc<dyn AutoscalingClient>,
}

impl DatabaseReconciler {
    pub fn new(
        rds: Arc<dyn RdsClient>,
        ec2: Arc<dyn Ec2Client>,
        secrets: Arc<dyn SecretsClient>,
        autoscaling: Arc<dyn AutoscalingClient>,
    ) -> Self {
        Self {
            rds,
            ec2,
            secrets,
            autoscaling,
        }
    }

    /// Run the ordered convergence sequence for `desired`.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for invalid bounds (raised before any cloud call);
    /// API failures are fatal and propagated.
    pub async fn converge(
        &self,
        desired: &DatabaseSpec,
        app_name: &str,
        environment: &str,
        topology: &NetworkTopology,
    ) -> Result<Vec<ResourceOutcome>> {
        desired.validate()?;

        let mut outcomes = Vec::new();

        let password = self
            .resolve_master_password(desired, app_name, environment)
            .await?;
        let subnet_group = self
            .reconcile_subnet_group(desired, topology, &mut outcomes)
            .await?;
        let security_group_id = self
            .reconcile_security_group(desired, topology, &mut outcomes)
            .await?;
        self.reconcile_instance(desired, &password, &subnet_group, &security_group_id, &mut outcomes)
            .await?;
        self.reconcile_storage_ceiling(desired, &mut outcomes).await?;
        self.reconcile_replicas(desired, &mut outcomes).await?;
        self.reconcile_replica_autoscaling(desired, &mut outcomes)
            .await?;

        Ok(outcomes)
    }

    /// Explicit password wins; otherwise reuse the stored secret verbatim
    /// (silent rotation would break existing connections); otherwise
    /// generate, persist, then return.
    async fn resolve_master_password(
        &self,
        desired: &DatabaseSpec,
        app_name: &str,
        environment: &str,
    ) -> Result<String> {
        if let Some(password) = &desired.master_password {
            return Ok(password.clone());
        }

        let secret_name = desired.password_secret_name(app_name, environment);
        if let Some(stored) = self.secrets.get_secret(&secret_name).await? {
            debug!(secret = %secret_name, "reusing stored master password");
            return Ok(stored);
        }

        let generated = generate_password();
        self.secrets.put_secret(&secret_name, &generated).await?;
        info!(secret = %secret_name, "generated and stored master password");
        Ok(generated)
    }

    /// Subnet groups are created once and never updated.
    async fn reconcile_subnet_group(
        &self,
        desired: &DatabaseSpec,
        topology: &NetworkTopology,
        outcomes: &mut Vec<ResourceOutcome>,
    ) -> Result<String> {
        let name = format!("{}-subnets", desired.identifier);
        let resource = format!("rds-subnet-group/{name}");

        if self.rds.describe_subnet_group(&name).await?.is_some() {
            outcomes.push(ResourceOutcome::skipped(resource));
            return Ok(name);
        }

        let subnets = self.ec2.subnets_in_vpc(&topology.vpc_id).await?;
        if subnets.is_empty() {
            return Err(Error::not_found(format!(
                "subnets in VPC '{}'",
                topology.vpc_id
            )));
        }
        let subnet_ids: Vec<String> = subnets.into_iter().map(|s| s.id).collect();

        info!(group = %name, subnets = subnet_ids.len(), "creating db subnet group");
        self.rds
            .create_subnet_group(&name, "Managed by groundwork", &subnet_ids)
            .await?;
        outcomes.push(ResourceOutcome::created(resource));
        Ok(name)
    }

    /// Ensure the database security group exists with exactly one guaranteed
    /// ingress rule (TCP/5432 from the application group). Other rules on
    /// the group are left untouched.
    async fn reconcile_security_group(
        &self,
        desired: &DatabaseSpec,
        topology: &NetworkTopology,
        outcomes: &mut Vec<ResourceOutcome>,
    ) -> Result<String> {
        let name = format!("{}-db", desired.identifier);
        let resource = format!("rds-security-group/{name}");
        let rule = IngressRule {
            protocol: "tcp".to_string(),
            port: DB_PORT,
            source_group_id: topology.security_group_id.clone(),
        };

        match self
            .ec2
            .find_security_group(&topology.vpc_id, &name)
            .await?
        {
            None => {
                info!(group = %name, "creating database security group");
                let id = self
                    .ec2
                    .create_security_group(&topology.vpc_id, &name, "Database access")
                    .await?;
                self.ec2.authorize_ingress(&id, &rule).await?;
                outcomes.push(ResourceOutcome::created(resource));
                Ok(id)
            }
            Some(group) if !group.ingress.contains(&rule) => {
                info!(group = %name, "adding missing database ingress rule");
                self.ec2.authorize_ingress(&group.id, &rule).await?;
                outcomes.push(ResourceOutcome::updated(resource));
                Ok(group.id)
            }
            Some(group) => {
                outcomes.push(ResourceOutcome::skipped(resource));
                Ok(group.id)
            }
        }
    }

    async fn reconcile_instance(
        &self,
        desired: &DatabaseSpec,
        password: &str,
        subnet_group: &str,
        security_group_id: &str,
        outcomes: &mut Vec<ResourceOutcome>,
    ) -> Result<()> {
        let resource = format!("rds/{}", desired.identifier);
        let observed = self.rds.describe_db_instance(&desired.identifier).await?;

        match compare_db_instance(desired, observed.as_ref()) {
            Outcome::Absent => {
                info!(instance = %desired.identifier, "creating db instance");
                let params = DbInstanceParams {
                    identifier: desired.identifier.clone(),
                    instance_class: desired.instance_class.clone(),
                    engine: desired.engine.clone(),
                    engine_version: desired.engine_version.clone(),
                    allocated_storage: desired.allocated_storage,
                    multi_az: desired.multi_az,
                    master_username: desired.master_username.clone(),
                    master_password: password.to_string(),
                    backup_window: desired.backup_window.clone(),
                    subnet_group: subnet_group.to_string(),
                    security_group_id: security_group_id.to_string(),
                };
                self.rds.create_db_instance(&params).await?;

                match self.wait_available(&desired.identifier).await {
                    PollStatus::Ready(()) => outcomes.push(ResourceOutcome::created(resource)),
                    PollStatus::Timeout => outcomes.push(
                        ResourceOutcome::created(resource).with_warning(
                            "instance still creating after wait budget; it may complete \
                             asynchronously",
                        ),
                    ),
                    PollStatus::Failed(err) => return Err(err),
                }
                Ok(())
            }
            Outcome::Matches => {
                debug!(instance = %desired.identifier, "db instance already converged");
                outcomes.push(ResourceOutcome::skipped(resource));
                Ok(())
            }
            Outcome::Differs { fields } => {
                let pending = fields.iter().join(", ");
                warn!(
                    instance = %desired.identifier,
                    fields = %pending,
                    "db instance differs; changes can cause downtime and are never auto-applied"
                );
                outcomes.push(ResourceOutcome::skipped(resource).with_warning(format!(
                    "differs in {pending}; apply manually during a maintenance window"
                )));
                Ok(())
            }
        }
    }

    /// The storage ceiling is the one instance modification applied in
    /// place; it carries no downtime.
    async fn reconcile_storage_ceiling(
        &self,
        desired: &DatabaseSpec,
        outcomes: &mut Vec<ResourceOutcome>,
    ) -> Result<()> {
        let Some(scaling) = &desired.storage_autoscaling else {
            return Ok(());
        };
        let resource = format!("rds-storage/{}", desired.identifier);

        let Some(observed) = self.rds.describe_db_instance(&desired.identifier).await? else {
            outcomes.push(ResourceOutcome::skipped(resource).with_warning(
                "instance not yet available; storage ceiling deferred to the next run",
            ));
            return Ok(());
        };

        if observed.max_allocated_storage == Some(scaling.max_allocated_storage) {
            outcomes.push(ResourceOutcome::skipped(resource));
            return Ok(());
        }

        info!(
            instance = %desired.identifier,
            max = scaling.max_allocated_storage,
            "setting storage autoscaling ceiling"
        );
        self.rds
            .modify_max_allocated_storage(&desired.identifier, scaling.max_allocated_storage)
            .await?;
        outcomes.push(ResourceOutcome::updated(resource));
        Ok(())
    }

    /// Grow the replica set toward the target count. Never deletes.
    async fn reconcile_replicas(
        &self,
        desired: &DatabaseSpec,
        outcomes: &mut Vec<ResourceOutcome>,
    ) -> Result<()> {
        let Some(replicas) = &desired.read_replicas else {
            return Ok(());
        };
        let resource = format!("rds-replicas/{}", desired.identifier);

        let Some(primary) = self.rds.describe_db_instance(&desired.identifier).await? else {
            outcomes.push(ResourceOutcome::skipped(resource).with_warning(
                "primary not yet available; replicas deferred to the next run",
            ));
            return Ok(());
        };

        let existing = u32::try_from(primary.replica_identifiers.len()).unwrap_or(u32::MAX);
        let target = replicas.count;

        if existing >= target {
            if existing > target {
                warn!(
                    instance = %desired.identifier,
                    existing,
                    target,
                    "more replicas than desired; grow-only policy leaves them in place"
                );
                outcomes.push(ResourceOutcome::skipped(resource).with_warning(format!(
                    "{existing} replicas exist, {target} desired; excess replicas are \
                     never removed automatically"
                )));
            } else {
                outcomes.push(ResourceOutcome::skipped(resource));
            }
            return Ok(());
        }

        for ordinal in (existing + 1)..=target {
            let replica_id = desired.replica_identifier(ordinal);
            info!(replica = %replica_id, "creating read replica");
            self.rds
                .create_read_replica(&replica_id, &desired.identifier, &desired.instance_class)
                .await?;

            let replica_resource = format!("rds-replica/{replica_id}");
            match self.wait_available(&replica_id).await {
                PollStatus::Ready(()) => {
                    outcomes.push(ResourceOutcome::created(replica_resource));
                }
                PollStatus::Timeout => outcomes.push(
                    ResourceOutcome::created(replica_resource).with_warning(
                        "replica still creating after wait budget; it may complete \
                         asynchronously",
                    ),
                ),
                PollStatus::Failed(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Register the scalable target and target-tracking policy for the
    /// replica fleet. Both writes are idempotent overwrites.
    async fn reconcile_replica_autoscaling(
        &self,
        desired: &DatabaseSpec,
        outcomes: &mut Vec<ResourceOutcome>,
    ) -> Result<()> {
        let Some(auto) = desired
            .read_replicas
            .as_ref()
            .and_then(|r| r.autoscaling.as_ref())
        else {
            return Ok(());
        };
        let resource = format!("rds-replica-scaling/{}", desired.identifier);
        let resource_id = format!("db:{}", desired.identifier);
        let policy_name = format!("{}-replica-cpu", desired.identifier);

        let target_registered = self
            .autoscaling
            .describe_scalable_target(&resource_id)
            .await?
            == Some((auto.min_capacity, auto.max_capacity));
        let policy_registered = self
            .autoscaling
            .describe_scaling_policy(&policy_name)
            .await?
            .is_some_and(|cpu| (cpu - auto.target_cpu).abs() < f64::EPSILON);

        if target_registered && policy_registered {
            outcomes.push(ResourceOutcome::skipped(resource));
            return Ok(());
        }

        info!(
            instance = %desired.identifier,
            min = auto.min_capacity,
            max = auto.max_capacity,
            cpu = auto.target_cpu,
            "registering replica autoscaling"
        );
        self.autoscaling
            .register_scalable_target(&resource_id, auto.min_capacity, auto.max_capacity)
            .await?;
        self.autoscaling
            .put_target_tracking_policy(&policy_name, &resource_id, auto.target_cpu)
            .await?;
        outcomes.push(ResourceOutcome::updated(resource));
        Ok(())
    }

    async fn wait_available(&self, identifier: &str) -> PollStatus<()> {
        let client = self.rds.clone();
        let identifier = identifier.to_string();
        poll_until(PollConfig::database(), "rds-instance", move || {
            let client = client.clone();
            let identifier = identifier.clone();
            async move {
                Ok(client
                    .describe_db_instance(&identifier)
                    .await?
                    .filter(|db| db.is_available())
                    .map(|_| ()))
            }
        })
        .await
    }
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use groundwork_cloud::clients::{RdsClient as _, SecretsClient as _};
    use groundwork_cloud::InMemoryCloud;
    use groundwork_core::spec::{
        ReadReplicaSpec, ReplicaAutoscalingSpec, StorageAutoscalingSpec,
    };

    use super::*;

    fn topology() -> NetworkTopology {
        NetworkTopology {
            vpc_id: "vpc-abc".into(),
            security_group_id: "sg-app".into(),
        }
    }

    fn db_spec() -> DatabaseSpec {
        DatabaseSpec {
            identifier: "shop-db".into(),
            instance_class: "db.t3.micro".into(),
            engine: "postgres".into(),
            engine_version: "16.3".into(),
            allocated_storage: 50,
            multi_az: true,
            master_username: "shop".into(),
            master_password: None,
            backup_window: Some("03:00-04:00".into()),
            storage_autoscaling: None,
            read_replicas: None,
        }
    }

    async fn seeded_cloud() -> std::sync::Arc<InMemoryCloud> {
        let cloud = InMemoryCloud::new_arc();
        cloud.seed_subnet("subnet-1", "vpc-abc").await;
        cloud.seed_subnet("subnet-2", "vpc-abc").await;
        cloud
    }

    fn reconciler(cloud: &std::sync::Arc<InMemoryCloud>) -> DatabaseReconciler {
        DatabaseReconciler::new(cloud.clone(), cloud.clone(), cloud.clone(), cloud.clone())
    }

    #[tokio::test]
    async fn test_invalid_bounds_fail_before_any_cloud_call() {
        let cloud = seeded_cloud().await;
        let mut spec = db_spec();
        spec.allocated_storage = 50;
        spec.storage_autoscaling = Some(StorageAutoscalingSpec {
            max_allocated_storage: 20,
        });

        let err = reconciler(&cloud)
            .converge(&spec, "shop", "production", &topology())
            .await
            .unwrap_err();
        assert!(err.is_config());
        assert!(cloud.write_ops().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_then_idempotent() {
        let cloud = seeded_cloud().await;
        let reconciler = reconciler(&cloud);

        let first = reconciler
            .converge(&db_spec(), "shop", "production", &topology())
            .await
            .unwrap();
        assert!(first.iter().any(|o| o.resource == "rds/shop-db"
            && o.action == crate::reconcile::Action::Created));

        let second = reconciler
            .converge(&db_spec(), "shop", "production", &topology())
            .await
            .unwrap();
        assert!(second
            .iter()
            .all(|o| o.action == crate::reconcile::Action::Skipped));
    }

    #[tokio::test]
    async fn test_generated_password_is_persisted_and_reused() {
        let cloud = seeded_cloud().await;
        let reconciler = reconciler(&cloud);

        reconciler
            .converge(&db_spec(), "shop", "production", &topology())
            .await
            .unwrap();
        let stored = cloud
            .get_secret("shop/production/db-password")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.len(), GENERATED_PASSWORD_LEN);

        reconciler
            .converge(&db_spec(), "shop", "production", &topology())
            .await
            .unwrap();
        let after = cloud
            .get_secret("shop/production/db-password")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, after);
    }

    #[tokio::test]
    async fn test_class_drift_reported_never_applied() {
        let cloud = seeded_cloud().await;
        let reconciler = reconciler(&cloud);
        reconciler
            .converge(&db_spec(), "shop", "production", &topology())
            .await
            .unwrap();

        let mut spec = db_spec();
        spec.instance_class = "db.t3.small".into();
        cloud.clear_write_ops().await;

        let outcomes = reconciler
            .converge(&spec, "shop", "production", &topology())
            .await
            .unwrap();
        let instance = outcomes
            .iter()
            .find(|o| o.resource == "rds/shop-db")
            .unwrap();
        assert_eq!(instance.action, crate::reconcile::Action::Skipped);
        assert!(instance.warning.as_ref().unwrap().contains("instance_class"));

        let observed = cloud.describe_db_instance("shop-db").await.unwrap().unwrap();
        assert_eq!(observed.instance_class, "db.t3.micro");
    }

    #[tokio::test]
    async fn test_replica_growth_is_monotonic() {
        let cloud = seeded_cloud().await;
        let reconciler = reconciler(&cloud);

        let mut spec = db_spec();
        spec.read_replicas = Some(ReadReplicaSpec {
            count: 2,
            autoscaling: None,
        });
        reconciler
            .converge(&spec, "shop", "production", &topology())
            .await
            .unwrap();

        let primary = cloud.describe_db_instance("shop-db").await.unwrap().unwrap();
        assert_eq!(
            primary.replica_identifiers,
            vec!["shop-db-replica-1", "shop-db-replica-2"]
        );

        // Growing adds only the missing ordinals.
        spec.read_replicas = Some(ReadReplicaSpec {
            count: 3,
            autoscaling: None,
        });
        reconciler
            .converge(&spec, "shop", "production", &topology())
            .await
            .unwrap();
        let primary = cloud.describe_db_instance("shop-db").await.unwrap().unwrap();
        assert_eq!(primary.replica_identifiers.len(), 3);

        // Shrinking never deletes.
        spec.read_replicas = Some(ReadReplicaSpec {
            count: 1,
            autoscaling: None,
        });
        let outcomes = reconciler
            .converge(&spec, "shop", "production", &topology())
            .await
            .unwrap();
        let primary = cloud.describe_db_instance("shop-db").await.unwrap().unwrap();
        assert_eq!(primary.replica_identifiers.len(), 3);
        assert!(outcomes
            .iter()
            .any(|o| o.resource == "rds-replicas/shop-db" && o.warning.is_some()));
    }

    #[tokio::test]
    async fn test_storage_ceiling_update_in_place() {
        let cloud = seeded_cloud().await;
        let reconciler = reconciler(&cloud);

        let mut spec = db_spec();
        spec.storage_autoscaling = Some(StorageAutoscalingSpec {
            max_allocated_storage: 200,
        });
        reconciler
            .converge(&spec, "shop", "production", &topology())
            .await
            .unwrap();

        let observed = cloud.describe_db_instance("shop-db").await.unwrap().unwrap();
        assert_eq!(observed.max_allocated_storage, Some(200));
    }

    #[tokio::test]
    async fn test_replica_autoscaling_registered_idempotently() {
        let cloud = seeded_cloud().await;
        let reconciler = reconciler(&cloud);

        let mut spec = db_spec();
        spec.read_replicas = Some(ReadReplicaSpec {
            count: 1,
            autoscaling: Some(ReplicaAutoscalingSpec {
                min_capacity: 1,
                max_capacity: 4,
                target_cpu: 60.0,
            }),
        });
        reconciler
            .converge(&spec, "shop", "production", &topology())
            .await
            .unwrap();

        let second = reconciler
            .converge(&spec, "shop", "production", &topology())
            .await
            .unwrap();
        let scaling = second
            .iter()
            .find(|o| o.resource == "rds-replica-scaling/shop-db")
            .unwrap();
        assert_eq!(scaling.action, crate::reconcile::Action::Skipped);
    }
}
