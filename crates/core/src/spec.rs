//! Desired-state configuration.
//!
//! A [`DesiredSpec`] is built once at process start (normally from a TOML
//! file), validated, and then passed by reference into every reconciler.
//! Nothing here is ever mutated during a run, and no reconciler reads
//! ambient process state.
//!
//! Validation is deliberately front-loaded: every invariant that can be
//! checked without a cloud call (autoscaling bounds, storage ceilings,
//! required names) is checked here, so a bad configuration fails before the
//! first API request.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level desired configuration for one convergence run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredSpec {
    /// Application name, used to derive resource identifiers.
    pub app_name: String,
    /// Environment label (e.g. `production`), used in derived names.
    pub environment: String,
    /// AWS region every resource lives in.
    pub region: String,
    /// S3 buckets to converge.
    #[serde(default)]
    pub buckets: Vec<BucketSpec>,
    /// IAM role, instance profile, and policies.
    pub iam: IamSpec,
    /// Elastic Beanstalk application and environment.
    pub beanstalk: EnvironmentSpec,
    /// Optional RDS database with replicas and autoscaling.
    #[serde(default)]
    pub database: Option<DatabaseSpec>,
    /// Optional Route 53 record for a custom domain.
    #[serde(default)]
    pub dns: Option<DnsSpec>,
}

/// Desired state of a single S3 bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketSpec {
    /// Bucket name (globally unique).
    pub name: String,
    /// HTTP methods the bucket's CORS configuration must allow.
    #[serde(default)]
    pub cors_methods: Vec<String>,
    /// Public-access-block booleans.
    #[serde(default)]
    pub public_access: PublicAccessBlock,
}

/// The four S3 public-access-block booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAccessBlock {
    pub block_public_acls: bool,
    pub ignore_public_acls: bool,
    pub block_public_policy: bool,
    pub restrict_public_buckets: bool,
}

impl Default for PublicAccessBlock {
    fn default() -> Self {
        Self {
            block_public_acls: true,
            ignore_public_acls: true,
            block_public_policy: true,
            restrict_public_buckets: true,
        }
    }
}

/// Desired IAM role, instance profile, and policy attachments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IamSpec {
    /// Role name.
    pub role_name: String,
    /// Instance profile the role must belong to.
    pub instance_profile: String,
    /// Trust (assume-role) policy document.
    pub trust_policy: serde_json::Value,
    /// ARNs of AWS-managed policies to attach to the role.
    #[serde(default)]
    pub managed_policy_arns: Vec<String>,
    /// Customer-managed policies, published through the version manager.
    #[serde(default)]
    pub policies: Vec<ManagedPolicySpec>,
}

/// A customer-managed IAM policy and its desired document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagedPolicySpec {
    /// Policy name.
    pub name: String,
    /// Desired policy document.
    pub document: serde_json::Value,
}

/// Desired Elastic Beanstalk application and environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    /// Application name.
    pub application: String,
    /// Environment name.
    pub environment_name: String,
    /// Solution stack (platform) the environment runs on.
    pub solution_stack: String,
    /// EC2 instance type for the environment's autoscaling group.
    pub instance_type: String,
    /// Minimum autoscaling group size.
    pub min_size: u32,
    /// Maximum autoscaling group size.
    pub max_size: u32,
    /// Environment variables the application must see.
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
}

/// Desired RDS database, including replicas and autoscaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSpec {
    /// Primary instance identifier.
    pub identifier: String,
    /// Instance class (e.g. `db.t3.micro`).
    pub instance_class: String,
    /// Engine name (e.g. `postgres`).
    pub engine: String,
    /// Engine version requested at creation time.
    pub engine_version: String,
    /// Allocated storage in GiB.
    pub allocated_storage: i64,
    /// Whether the instance is Multi-AZ.
    #[serde(default)]
    pub multi_az: bool,
    /// Master username.
    pub master_username: String,
    /// Explicit master password. When absent the secret store is consulted
    /// and a generated password is persisted on first use.
    #[serde(default)]
    pub master_password: Option<String>,
    /// Preferred backup window, if any.
    #[serde(default)]
    pub backup_window: Option<String>,
    /// Storage autoscaling ceiling, if enabled.
    #[serde(default)]
    pub storage_autoscaling: Option<StorageAutoscalingSpec>,
    /// Read replicas, if enabled.
    #[serde(default)]
    pub read_replicas: Option<ReadReplicaSpec>,
}

/// Storage autoscaling ceiling for the primary instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StorageAutoscalingSpec {
    /// Maximum storage in GiB the instance may grow to.
    pub max_allocated_storage: i64,
}

/// Read-replica fleet configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadReplicaSpec {
    /// Initial replica count the reconciler grows toward.
    pub count: u32,
    /// Replica-count autoscaling, if enabled.
    #[serde(default)]
    pub autoscaling: Option<ReplicaAutoscalingSpec>,
}

/// Target-tracking autoscaling bounds for the replica fleet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReplicaAutoscalingSpec {
    /// Minimum replica count.
    pub min_capacity: u32,
    /// Maximum replica count.
    pub max_capacity: u32,
    /// Average reader CPU utilization to track, in percent.
    pub target_cpu: f64,
}

impl DesiredSpec {
    /// Load a desired spec from a TOML file and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read, does not parse,
    /// or fails validation.
    pub fn from_toml_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read '{}': {e}", path.display())))?;
        let spec: Self = toml::from_str(&raw)
            .map_err(|e| Error::config(format!("cannot parse '{}': {e}", path.display())))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Validate every invariant that needs no cloud call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        require_nonempty("app_name", &self.app_name)?;
        require_nonempty("environment", &self.environment)?;
        require_nonempty("region", &self.region)?;

        for bucket in &self.buckets {
            require_nonempty("bucket name", &bucket.name)?;
        }

        require_nonempty("iam.role_name", &self.iam.role_name)?;
        require_nonempty("iam.instance_profile", &self.iam.instance_profile)?;

        self.beanstalk.validate()?;

        if let Some(db) = &self.database {
            db.validate()?;
        }

        if let Some(dns) = &self.dns {
            require_nonempty("dns.domain", &dns.domain)?;
        }

        Ok(())
    }
}

impl EnvironmentSpec {
    /// Validate autoscaling group bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on an empty name or inverted bounds.
    pub fn validate(&self) -> Result<()> {
        require_nonempty("beanstalk.application", &self.application)?;
        require_nonempty("beanstalk.environment_name", &self.environment_name)?;
        require_nonempty("beanstalk.instance_type", &self.instance_type)?;
        if self.min_size == 0 {
            return Err(Error::config("beanstalk.min_size must be at least 1"));
        }
        if self.min_size > self.max_size {
            return Err(Error::config(format!(
                "beanstalk.min_size ({}) exceeds max_size ({})",
                self.min_size, self.max_size
            )));
        }
        Ok(())
    }
}

impl DatabaseSpec {
    /// Validate storage and replica-autoscaling invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the violated bound. Checked before
    /// any cloud call is made.
    pub fn validate(&self) -> Result<()> {
        require_nonempty("database.identifier", &self.identifier)?;
        require_nonempty("database.instance_class", &self.instance_class)?;
        require_nonempty("database.engine", &self.engine)?;
        require_nonempty("database.master_username", &self.master_username)?;

        if self.allocated_storage <= 0 {
            return Err(Error::config(format!(
                "database.allocated_storage must be positive, got {}",
                self.allocated_storage
            )));
        }

        if let Some(scaling) = &self.storage_autoscaling {
            if scaling.max_allocated_storage <= self.allocated_storage {
                return Err(Error::config(format!(
                    "database.storage_autoscaling.max_allocated_storage ({}) must exceed \
                     allocated_storage ({})",
                    scaling.max_allocated_storage, self.allocated_storage
                )));
            }
        }

        if let Some(replicas) = &self.read_replicas {
            if let Some(auto) = &replicas.autoscaling {
                if auto.min_capacity > auto.max_capacity {
                    return Err(Error::config(format!(
                        "replica autoscaling min_capacity ({}) exceeds max_capacity ({})",
                        auto.min_capacity, auto.max_capacity
                    )));
                }
                if replicas.count < auto.min_capacity || replicas.count > auto.max_capacity {
                    return Err(Error::config(format!(
                        "replica count ({}) must lie within autoscaling bounds [{}, {}]",
                        replicas.count, auto.min_capacity, auto.max_capacity
                    )));
                }
                if auto.target_cpu <= 0.0 || auto.target_cpu >= 100.0 {
                    return Err(Error::config(format!(
                        "replica autoscaling target_cpu ({}) must be between 0 and 100",
                        auto.target_cpu
                    )));
                }
            }
        }

        Ok(())
    }

    /// Deterministic secret-store name for the master password.
    pub fn password_secret_name(&self, app_name: &str, environment: &str) -> String {
        format!("{app_name}/{environment}/db-password")
    }

    /// Identifier of the `n`-th read replica (1-based).
    pub fn replica_identifier(&self, ordinal: u32) -> String {
        format!("{}-replica-{ordinal}", self.identifier)
    }
}

/// Desired Route 53 record for the environment's custom domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsSpec {
    /// Fully qualified domain name to point at the environment.
    pub domain: String,
}

fn require_nonempty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::config(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    fn minimal_spec() -> DesiredSpec {
        DesiredSpec {
            app_name: "shop".into(),
            environment: "production".into(),
            region: "eu-west-1".into(),
            buckets: vec![],
            iam: IamSpec {
                role_name: "shop-role".into(),
                instance_profile: "shop-profile".into(),
                trust_policy: serde_json::json!({
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": {"Service": "ec2.amazonaws.com"},
                        "Action": "sts:AssumeRole"
                    }]
                }),
                managed_policy_arns: vec![],
                policies: vec![],
            },
            beanstalk: EnvironmentSpec {
                application: "shop".into(),
                environment_name: "shop-production".into(),
                solution_stack: "64bit Amazon Linux 2023 v4.3.2 running Docker".into(),
                instance_type: "t3.small".into(),
                min_size: 1,
                max_size: 4,
                env_vars: BTreeMap::new(),
            },
            database: None,
            dns: None,
        }
    }

    fn database_spec() -> DatabaseSpec {
        DatabaseSpec {
            identifier: "shop-db".into(),
            instance_class: "db.t3.micro".into(),
            engine: "postgres".into(),
            engine_version: "16.3".into(),
            allocated_storage: 50,
            multi_az: true,
            master_username: "shop".into(),
            master_password: None,
            backup_window: None,
            storage_autoscaling: None,
            read_replicas: None,
        }
    }

    #[test]
    fn test_minimal_spec_validates() {
        assert!(minimal_spec().validate().is_ok());
    }

    #[test]
    fn test_storage_ceiling_must_exceed_allocation() {
        let mut db = database_spec();
        db.storage_autoscaling = Some(StorageAutoscalingSpec {
            max_allocated_storage: 20,
        });
        let err = db.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("max_allocated_storage"));
    }

    #[test]
    fn test_replica_bounds_checked() {
        let mut db = database_spec();
        db.read_replicas = Some(ReadReplicaSpec {
            count: 5,
            autoscaling: Some(ReplicaAutoscalingSpec {
                min_capacity: 1,
                max_capacity: 3,
                target_cpu: 60.0,
            }),
        });
        let err = db.validate().unwrap_err();
        assert!(err.to_string().contains("within autoscaling bounds"));
    }

    #[test]
    fn test_inverted_replica_capacity_rejected() {
        let mut db = database_spec();
        db.read_replicas = Some(ReadReplicaSpec {
            count: 2,
            autoscaling: Some(ReplicaAutoscalingSpec {
                min_capacity: 4,
                max_capacity: 2,
                target_cpu: 60.0,
            }),
        });
        assert!(db.validate().is_err());
    }

    #[test]
    fn test_replica_identifier_ordinals() {
        let db = database_spec();
        assert_eq!(db.replica_identifier(1), "shop-db-replica-1");
        assert_eq!(db.replica_identifier(3), "shop-db-replica-3");
    }

    #[test]
    fn test_password_secret_name() {
        let db = database_spec();
        assert_eq!(
            db.password_secret_name("shop", "production"),
            "shop/production/db-password"
        );
    }

    #[test]
    fn test_from_toml_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groundwork.toml");
        std::fs::write(
            &path,
            r#"
app_name = "shop"
environment = "production"
region = "eu-west-1"

[[buckets]]
name = "shop-uploads"
cors_methods = ["GET", "PUT", "POST"]

[iam]
role_name = "shop-role"
instance_profile = "shop-profile"

[iam.trust_policy]
Version = "2012-10-17"

[beanstalk]
application = "shop"
environment_name = "shop-production"
solution_stack = "64bit Amazon Linux 2023 v4.3.2 running Docker"
instance_type = "t3.small"
min_size = 1
max_size = 4

[beanstalk.env_vars]
RAILS_ENV = "production"
"#,
        )
        .unwrap();

        let spec = DesiredSpec::from_toml_path(&path).unwrap();
        assert_eq!(spec.app_name, "shop");
        assert_eq!(spec.buckets.len(), 1);
        assert_eq!(spec.beanstalk.env_vars.get("RAILS_ENV").unwrap(), "production");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = DesiredSpec::from_toml_path(Path::new("/nonexistent/groundwork.toml"))
            .unwrap_err();
        assert!(err.is_config());
    }
}
