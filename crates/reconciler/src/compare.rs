//! Pure desired/observed comparison.
//!
//! `compare_*` functions take a desired spec and an optional observed
//! snapshot and classify the diff. Normal divergence is a [`Outcome::Differs`]
//! value, never an error, and no function here performs I/O.
//!
//! Each comparator deliberately ignores server-generated or volatile fields;
//! the field sets compared per resource type are part of the system's
//! contract and are narrower than full structural equality.

use std::collections::BTreeSet;

use serde_json::Value;

use groundwork_cloud::types::{
    BucketState, DbInstanceState, EnvironmentState, RecordState, RecordTarget,
};
use groundwork_core::spec::{BucketSpec, DatabaseSpec, EnvironmentSpec};

/// Classification of a desired/observed diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The resource does not exist.
    Absent,
    /// Observed state satisfies the desired spec.
    Matches,
    /// Observed state diverges in the named fields.
    Differs { fields: BTreeSet<String> },
}

impl Outcome {
    fn from_fields(fields: BTreeSet<String>) -> Self {
        if fields.is_empty() {
            Self::Matches
        } else {
            Self::Differs { fields }
        }
    }

    /// Whether observed state already satisfies the spec.
    pub const fn is_matches(&self) -> bool {
        matches!(self, Self::Matches)
    }

    /// The diverging field names, empty unless `Differs`.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::Differs { fields } => fields.iter().map(String::as_str).collect(),
            _ => vec![],
        }
    }
}

/// Compare a bucket: CORS method presence and the public-access booleans.
///
/// CORS is compared as a method *set* — the observed configuration matches as
/// long as every required method is allowed, regardless of rule layout.
pub fn compare_bucket(desired: &BucketSpec, observed: Option<&BucketState>) -> Outcome {
    let Some(observed) = observed else {
        return Outcome::Absent;
    };

    let mut fields = BTreeSet::new();

    let observed_methods: BTreeSet<&str> =
        observed.cors_methods.iter().map(String::as_str).collect();
    if desired
        .cors_methods
        .iter()
        .any(|m| !observed_methods.contains(m.as_str()))
    {
        fields.insert("cors_methods".to_string());
    }

    if desired.public_access != observed.public_access {
        fields.insert("public_access".to_string());
    }

    Outcome::from_fields(fields)
}

/// Canonical rendering of a policy document: keys sorted at every level,
/// no whitespace. Reordering keys is tolerated; reordering arrays is not.
pub fn normalized_policy_json(document: &Value) -> String {
    canonicalize(document).to_string()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: std::collections::BTreeMap<&String, &Value> = map.iter().collect();
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Compare IAM policy documents by normalized structural equality.
pub fn compare_policy_document(desired: &Value, observed: Option<&Value>) -> Outcome {
    let Some(observed) = observed else {
        return Outcome::Absent;
    };
    if normalized_policy_json(desired) == normalized_policy_json(observed) {
        Outcome::Matches
    } else {
        let mut fields = BTreeSet::new();
        fields.insert("document".to_string());
        Outcome::Differs { fields }
    }
}

/// Compare an Elastic Beanstalk environment: instance type, autoscaling
/// bounds, and the desired environment variables by exact string equality.
/// A desired key missing from observed state counts as divergence.
pub fn compare_environment(
    desired: &EnvironmentSpec,
    observed: Option<&EnvironmentState>,
) -> Outcome {
    let Some(observed) = observed else {
        return Outcome::Absent;
    };

    let mut fields = BTreeSet::new();

    if observed.instance_type.as_deref() != Some(desired.instance_type.as_str()) {
        fields.insert("instance_type".to_string());
    }
    if observed.min_size != Some(desired.min_size) {
        fields.insert("min_size".to_string());
    }
    if observed.max_size != Some(desired.max_size) {
        fields.insert("max_size".to_string());
    }
    for (key, value) in &desired.env_vars {
        if observed.env_vars.get(key) != Some(value) {
            fields.insert(format!("env:{key}"));
        }
    }

    Outcome::from_fields(fields)
}

/// Compare an RDS instance on instance class, engine name, and Multi-AZ only.
///
/// Storage size and engine version drift are ignored so unrelated drift does
/// not block runs. Divergence here is reported but never auto-applied.
pub fn compare_db_instance(
    desired: &DatabaseSpec,
    observed: Option<&DbInstanceState>,
) -> Outcome {
    let Some(observed) = observed else {
        return Outcome::Absent;
    };

    let mut fields = BTreeSet::new();

    if observed.instance_class != desired.instance_class {
        fields.insert("instance_class".to_string());
    }
    if observed.engine != desired.engine {
        fields.insert("engine".to_string());
    }
    if observed.multi_az != desired.multi_az {
        fields.insert("multi_az".to_string());
    }

    Outcome::from_fields(fields)
}

/// Strip the trailing dot Route 53 appends to names.
pub fn strip_trailing_dot(name: &str) -> &str {
    name.trim_end_matches('.')
}

/// Compare DNS records: the CNAME value or the ALIAS target DNS name, with
/// trailing-dot normalization on both sides. Skipping the normalization
/// produces a false `Differs` on every run.
pub fn compare_record(desired: &RecordState, observed: Option<&RecordState>) -> Outcome {
    let Some(observed) = observed else {
        return Outcome::Absent;
    };

    let matches = match (&desired.target, &observed.target) {
        (RecordTarget::Cname { value: want }, RecordTarget::Cname { value: have }) => {
            strip_trailing_dot(want) == strip_trailing_dot(have)
        }
        (RecordTarget::Alias(want), RecordTarget::Alias(have)) => {
            strip_trailing_dot(&want.dns_name) == strip_trailing_dot(&have.dns_name)
        }
        _ => false,
    };

    if matches {
        Outcome::Matches
    } else {
        let mut fields = BTreeSet::new();
        fields.insert("target".to_string());
        Outcome::Differs { fields }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::BTreeMap;

    use groundwork_cloud::types::AliasTarget;
    use groundwork_core::spec::PublicAccessBlock;

    use super::*;

    fn bucket_spec() -> BucketSpec {
        BucketSpec {
            name: "uploads".into(),
            cors_methods: vec!["GET".into(), "PUT".into()],
            public_access: PublicAccessBlock::default(),
        }
    }

    fn bucket_state() -> BucketState {
        BucketState {
            name: "uploads".into(),
            region: "eu-west-1".into(),
            cors_methods: vec!["GET".into(), "PUT".into(), "HEAD".into()],
            public_access: PublicAccessBlock::default(),
        }
    }

    #[test]
    fn test_bucket_absent() {
        assert_eq!(compare_bucket(&bucket_spec(), None), Outcome::Absent);
    }

    #[test]
    fn test_bucket_extra_cors_methods_tolerated() {
        // Observed allows a superset; presence is what matters.
        assert!(compare_bucket(&bucket_spec(), Some(&bucket_state())).is_matches());
    }

    #[test]
    fn test_bucket_missing_cors_method_differs() {
        let mut observed = bucket_state();
        observed.cors_methods = vec!["GET".into()];
        let outcome = compare_bucket(&bucket_spec(), Some(&observed));
        assert_eq!(outcome.fields(), vec!["cors_methods"]);
    }

    #[test]
    fn test_bucket_public_access_differs() {
        let mut observed = bucket_state();
        observed.public_access.restrict_public_buckets = false;
        let outcome = compare_bucket(&bucket_spec(), Some(&observed));
        assert_eq!(outcome.fields(), vec!["public_access"]);
    }

    #[test]
    fn test_policy_key_order_tolerated() {
        let desired = serde_json::json!({"Version": "2012-10-17", "Statement": [{"Effect": "Allow", "Action": "s3:GetObject"}]});
        let observed = serde_json::json!({"Statement": [{"Action": "s3:GetObject", "Effect": "Allow"}], "Version": "2012-10-17"});
        assert!(compare_policy_document(&desired, Some(&observed)).is_matches());
    }

    #[test]
    fn test_policy_array_order_significant() {
        let desired = serde_json::json!({"Statement": ["a", "b"]});
        let observed = serde_json::json!({"Statement": ["b", "a"]});
        assert!(!compare_policy_document(&desired, Some(&observed)).is_matches());
    }

    fn environment_spec() -> EnvironmentSpec {
        EnvironmentSpec {
            application: "shop".into(),
            environment_name: "shop-production".into(),
            solution_stack: "docker".into(),
            instance_type: "t3.small".into(),
            min_size: 1,
            max_size: 4,
            env_vars: BTreeMap::from([("RAILS_ENV".to_string(), "production".to_string())]),
        }
    }

    fn environment_state() -> EnvironmentState {
        EnvironmentState {
            name: "shop-production".into(),
            application: "shop".into(),
            status: "Ready".into(),
            instance_type: Some("t3.small".into()),
            min_size: Some(1),
            max_size: Some(4),
            env_vars: BTreeMap::from([("RAILS_ENV".to_string(), "production".to_string())]),
            vpc_id: None,
            security_groups: vec![],
        }
    }

    #[test]
    fn test_environment_matches() {
        assert!(compare_environment(&environment_spec(), Some(&environment_state())).is_matches());
    }

    #[test]
    fn test_environment_missing_env_var_differs() {
        let mut observed = environment_state();
        observed.env_vars.clear();
        let outcome = compare_environment(&environment_spec(), Some(&observed));
        assert_eq!(outcome.fields(), vec!["env:RAILS_ENV"]);
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
            backup_window: None,
            storage_autoscaling: None,
            read_replicas: None,
        }
    }

    fn db_state() -> DbInstanceState {
        DbInstanceState {
            identifier: "shop-db".into(),
            status: "available".into(),
            instance_class: "db.t3.micro".into(),
            engine: "postgres".into(),
            engine_version: "15.4".into(),
            allocated_storage: 100,
            max_allocated_storage: None,
            multi_az: true,
            endpoint: None,
            replica_identifiers: vec![],
        }
    }

    #[test]
    fn test_db_instance_matches_despite_storage_and_version_drift() {
        // Storage size and engine version are deliberately outside the
        // comparison set.
        assert!(compare_db_instance(&db_spec(), Some(&db_state())).is_matches());
    }

    #[test]
    fn test_db_instance_class_differs() {
        let mut desired = db_spec();
        desired.instance_class = "db.t3.small".into();
        let outcome = compare_db_instance(&desired, Some(&db_state()));
        assert_eq!(outcome.fields(), vec!["instance_class"]);
    }

    #[test]
    fn test_record_trailing_dot_insensitive() {
        let desired = RecordState {
            name: "api.example.com".into(),
            ttl: Some(300),
            target: RecordTarget::Cname {
                value: "lb.example.com".into(),
            },
        };
        let observed = RecordState {
            name: "api.example.com.".into(),
            ttl: Some(300),
            target: RecordTarget::Cname {
                value: "lb.example.com.".into(),
            },
        };
        assert!(compare_record(&desired, Some(&observed)).is_matches());
    }

    #[test]
    fn test_record_alias_target_compared() {
        let desired = RecordState {
            name: "example.com".into(),
            ttl: None,
            target: RecordTarget::Alias(AliasTarget {
                dns_name: "lb.example.com".into(),
                hosted_zone_id: "Z1".into(),
            }),
        };
        let observed = RecordState {
            name: "example.com.".into(),
            ttl: None,
            target: RecordTarget::Alias(AliasTarget {
                dns_name: "other-lb.example.com.".into(),
                hosted_zone_id: "Z1".into(),
            }),
        };
        let outcome = compare_record(&desired, Some(&observed));
        assert_eq!(outcome.fields(), vec!["target"]);
    }
}
