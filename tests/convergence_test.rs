//! End-to-end convergence properties, driven through the full driver
//! against the in-process cloud.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::Arc;

use groundwork_cloud::clients::{DnsClient, RdsClient};
use groundwork_cloud::types::{InstanceState, RecordType};
use groundwork_cloud::InMemoryCloud;
use groundwork_core::spec::{
    BucketSpec, DatabaseSpec, DesiredSpec, DnsSpec, EnvironmentSpec, IamSpec, ManagedPolicySpec,
    PublicAccessBlock, ReadReplicaSpec, StorageAutoscalingSpec,
};
use groundwork_reconciler::{Action, ApproveAll, ConvergenceDriver};

fn desired() -> DesiredSpec {
    DesiredSpec {
        app_name: "shop".into(),
        environment: "production".into(),
        region: "eu-west-1".into(),
        buckets: vec![BucketSpec {
            name: "shop-uploads".into(),
            cors_methods: vec!["GET".into(), "PUT".into(), "POST".into()],
            public_access: PublicAccessBlock::default(),
        }],
        iam: IamSpec {
            role_name: "shop-role".into(),
            instance_profile: "shop-profile".into(),
            trust_policy: serde_json::json!({
                "Version": "2012-10-17",
                "Statement": [{"Effect": "Allow", "Principal": {"Service": "ec2.amazonaws.com"}, "Action": "sts:AssumeRole"}]
            }),
            managed_policy_arns: vec![
                "arn:aws:iam::aws:policy/AmazonS3ReadOnlyAccess".into(),
            ],
            policies: vec![ManagedPolicySpec {
                name: "shop-app-policy".into(),
                document: serde_json::json!({
                    "Version": "2012-10-17",
                    "Statement": [{"Effect": "Allow", "Action": "s3:*", "Resource": "*"}]
                }),
            }],
        },
        beanstalk: EnvironmentSpec {
            application: "shop".into(),
            environment_name: "shop-production".into(),
            solution_stack: "64bit Amazon Linux 2023 v4.3.2 running Docker".into(),
            instance_type: "t3.small".into(),
            min_size: 1,
            max_size: 4,
            env_vars: BTreeMap::from([("RAILS_ENV".to_string(), "production".to_string())]),
        },
        database: Some(DatabaseSpec {
            identifier: "shop-db".into(),
            instance_class: "db.t3.micro".into(),
            engine: "postgres".into(),
            engine_version: "16.3".into(),
            allocated_storage: 50,
            multi_az: true,
            master_username: "shop".into(),
            master_password: None,
            backup_window: Some("03:00-04:00".into()),
            storage_autoscaling: Some(StorageAutoscalingSpec {
                max_allocated_storage: 200,
            }),
            read_replicas: Some(ReadReplicaSpec {
                count: 1,
                autoscaling: None,
            }),
        }),
        dns: Some(DnsSpec {
            domain: "app.example.com".into(),
        }),
    }
}

/// Seed everything topology resolution and DNS need: an instance carrying
/// the VPC identity, subnets, and a hosted zone.
async fn seeded_cloud() -> Arc<InMemoryCloud> {
    let cloud = InMemoryCloud::new_arc();
    cloud.seed_subnet("subnet-1", "vpc-abc").await;
    cloud.seed_subnet("subnet-2", "vpc-abc").await;
    cloud
        .seed_instance(InstanceState {
            id: "i-1".into(),
            vpc_id: Some("vpc-abc".into()),
            subnet_id: Some("subnet-1".into()),
            security_group_ids: vec!["sg-app".into()],
        })
        .await;
    cloud
        .attach_environment_instances("shop-production", vec!["i-1".into()])
        .await;
    cloud.seed_zone("Z1", "example.com.").await;
    cloud
}

#[tokio::test]
async fn test_full_run_is_idempotent() {
    let cloud = seeded_cloud().await;
    let driver = ConvergenceDriver::new(cloud.clients(), Arc::new(ApproveAll));

    let first = driver.run(&desired()).await.unwrap();
    assert!(first.count(Action::Created) > 0);

    cloud.clear_write_ops().await;
    let second = driver.run(&desired()).await.unwrap();
    assert!(second.all_skipped(), "second run took actions:\n{}", second.render());
    assert!(
        cloud.write_ops().await.is_empty(),
        "second run wrote: {:?}",
        cloud.write_ops().await
    );
}

#[tokio::test]
async fn test_resources_are_never_duplicated() {
    let cloud = seeded_cloud().await;
    let driver = ConvergenceDriver::new(cloud.clients(), Arc::new(ApproveAll));

    for _ in 0..3 {
        driver.run(&desired()).await.unwrap();
    }

    let writes = cloud.write_ops().await;
    for op in [
        "create_bucket shop-uploads",
        "create_role shop-role",
        "create_environment shop-production",
        "create_db_instance shop-db",
    ] {
        let count = writes.iter().filter(|w| w.as_str() == op).count();
        assert_eq!(count, 1, "'{op}' issued {count} times");
    }
}

#[tokio::test]
async fn test_database_class_drift_reported_without_failing_the_run() {
    let cloud = seeded_cloud().await;
    let driver = ConvergenceDriver::new(cloud.clients(), Arc::new(ApproveAll));
    driver.run(&desired()).await.unwrap();

    let mut drifted = desired();
    drifted.database.as_mut().unwrap().instance_class = "db.r5.large".into();

    let summary = driver.run(&drifted).await.unwrap();
    let instance = summary
        .outcomes
        .iter()
        .find(|o| o.resource == "rds/shop-db")
        .unwrap();
    assert_eq!(instance.action, Action::Skipped);
    assert!(instance.warning.as_ref().unwrap().contains("instance_class"));

    // The observed instance is untouched.
    let observed = cloud.describe_db_instance("shop-db").await.unwrap().unwrap();
    assert_eq!(observed.instance_class, "db.t3.micro");
}

#[tokio::test]
async fn test_invalid_storage_bounds_rejected_before_any_write() {
    let cloud = seeded_cloud().await;
    let driver = ConvergenceDriver::new(cloud.clients(), Arc::new(ApproveAll));

    let mut invalid = desired();
    invalid.database.as_mut().unwrap().storage_autoscaling = Some(StorageAutoscalingSpec {
        max_allocated_storage: 10,
    });

    let err = driver.run(&invalid).await.unwrap_err();
    assert!(err.is_config());
    assert!(cloud.write_ops().await.is_empty());
}

#[tokio::test]
async fn test_subdomain_record_created_as_cname() {
    let cloud = seeded_cloud().await;
    let driver = ConvergenceDriver::new(cloud.clients(), Arc::new(ApproveAll));
    driver.run(&desired()).await.unwrap();

    let record = cloud
        .find_record("Z1", "app.example.com", RecordType::Cname)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.ttl, Some(300));
}
