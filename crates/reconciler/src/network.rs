//! VPC and security-group identity for a target environment.
//!
//! The direct route is the environment's `VPCId` / `SecurityGroups` option
//! settings. Two real-world wrinkles force a fallback through the first EC2
//! instance attached to the environment: the settings may be absent entirely,
//! and the `SecurityGroups` value may hold a group *name* rather than an id
//! (ids carry the `sg-` prefix). A name cannot be trusted for ingress rules,
//! so it triggers the instance lookup as well.
//!
//! Failure here is fatal: every database resource depends on this identity.

use std::sync::Arc;

use tracing::{debug, info};

use groundwork_cloud::clients::{BeanstalkClient, Ec2Client};
use groundwork_core::{Error, Result};

/// Resolved network identity of an environment.
#[derive(Debug, Clone)]
pub struct NetworkTopology {
    pub vpc_id: String,
    /// The application's security group, used as the ingress source for the
    /// database security group.
    pub security_group_id: String,
}

/// Derives [`NetworkTopology`] for an environment.
pub struct NetworkTopologyResolver {
    beanstalk: Arc<dyn BeanstalkClient>,
    ec2: Arc<dyn Ec2Client>,
}

impl NetworkTopologyResolver {
    pub fn new(beanstalk: Arc<dyn BeanstalkClient>, ec2: Arc<dyn Ec2Client>) -> Self {
        Self { beanstalk, ec2 }
    }

    /// Resolve VPC and security-group ids for `environment`.
    ///
    /// # Errors
    ///
    /// [`Error::TopologyUnresolved`] when the environment has no instances or
    /// the instance carries no VPC/security-group identity.
    pub async fn resolve(&self, environment: &str) -> Result<NetworkTopology> {
        let observed = self
            .beanstalk
            .describe_environment(environment)
            .await?
            .ok_or_else(|| Error::not_found(format!("environment '{environment}'")))?;

        if let Some(vpc_id) = &observed.vpc_id {
            if let Some(group) = observed.security_groups.first() {
                if group.starts_with("sg-") {
                    debug!(environment, vpc = %vpc_id, group = %group, "topology from option settings");
                    return Ok(NetworkTopology {
                        vpc_id: vpc_id.clone(),
                        security_group_id: group.clone(),
                    });
                }
                // A bare group name; only the instance knows the real id.
                debug!(
                    environment,
                    group = %group,
                    "security-group setting is a name, falling back to instance lookup"
                );
            }
        }

        self.resolve_from_instances(environment).await
    }

    async fn resolve_from_instances(&self, environment: &str) -> Result<NetworkTopology> {
        let instance_ids = self.beanstalk.environment_instance_ids(environment).await?;
        let first = instance_ids.first().ok_or_else(|| {
            Error::topology_unresolved(environment, "environment has no running instances")
        })?;

        let instance = self
            .ec2
            .describe_instance(first)
            .await?
            .ok_or_else(|| {
                Error::topology_unresolved(environment, format!("instance '{first}' not found"))
            })?;

        let vpc_id = instance.vpc_id.clone().ok_or_else(|| {
            Error::topology_unresolved(environment, format!("instance '{first}' has no VPC"))
        })?;
        let security_group_id = instance
            .security_group_ids
            .first()
            .cloned()
            .ok_or_else(|| {
                Error::topology_unresolved(
                    environment,
                    format!("instance '{first}' has no security groups"),
                )
            })?;

        info!(environment, vpc = %vpc_id, group = %security_group_id, "topology from instance");
        Ok(NetworkTopology {
            vpc_id,
            security_group_id,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::BTreeMap;

    use groundwork_cloud::clients::BeanstalkClient as _;
    use groundwork_cloud::types::InstanceState;
    use groundwork_cloud::InMemoryCloud;
    use groundwork_core::spec::EnvironmentSpec;

    use super::*;

    async fn environment(cloud: &InMemoryCloud) {
        cloud
            .create_environment(&EnvironmentSpec {
                application: "shop".into(),
                environment_name: "shop-production".into(),
                solution_stack: "docker".into(),
                instance_type: "t3.small".into(),
                min_size: 1,
                max_size: 2,
                env_vars: BTreeMap::new(),
            })
            .await
            .unwrap();
    }

    fn resolver(cloud: &std::sync::Arc<InMemoryCloud>) -> NetworkTopologyResolver {
        NetworkTopologyResolver::new(cloud.clone(), cloud.clone())
    }

    #[tokio::test]
    async fn test_direct_option_settings_used_when_id() {
        let cloud = InMemoryCloud::new_arc();
        environment(&cloud).await;
        cloud
            .set_environment_network(
                "shop-production",
                Some("vpc-abc".into()),
                vec!["sg-00000001".into()],
            )
            .await;

        let topology = resolver(&cloud).resolve("shop-production").await.unwrap();
        assert_eq!(topology.vpc_id, "vpc-abc");
        assert_eq!(topology.security_group_id, "sg-00000001");
    }

    #[tokio::test]
    async fn test_group_name_forces_instance_lookup() {
        let cloud = InMemoryCloud::new_arc();
        environment(&cloud).await;
        // A name, not an id: must not be trusted.
        cloud
            .set_environment_network(
                "shop-production",
                Some("vpc-abc".into()),
                vec!["awseb-stack-sg".into()],
            )
            .await;
        cloud
            .seed_instance(InstanceState {
                id: "i-1".into(),
                vpc_id: Some("vpc-abc".into()),
                subnet_id: Some("subnet-1".into()),
                security_group_ids: vec!["sg-00000042".into()],
            })
            .await;
        cloud
            .attach_environment_instances("shop-production", vec!["i-1".into()])
            .await;

        let topology = resolver(&cloud).resolve("shop-production").await.unwrap();
        assert_eq!(topology.security_group_id, "sg-00000042");
    }

    #[tokio::test]
    async fn test_no_instances_is_fatal() {
        let cloud = InMemoryCloud::new_arc();
        environment(&cloud).await;

        let err = resolver(&cloud).resolve("shop-production").await.unwrap_err();
        assert!(matches!(err, Error::TopologyUnresolved { .. }));
    }
}
