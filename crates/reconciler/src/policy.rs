//! IAM managed-policy version publishing.
//!
//! IAM stores at most five versions of a managed policy. Publishing a new
//! document at the ceiling first deletes the single oldest non-default
//! version (earliest create date; version ordinal breaks ties), then creates
//! the new version as default. The default version is never deleted.
//! Single-writer assumption: concurrent external modification is out of
//! scope.

use std::sync::Arc;

use tracing::{debug, info};

use groundwork_cloud::clients::IamClient;
use groundwork_cloud::types::PolicyVersion;
use groundwork_core::{Error, Result};

/// Maximum stored versions IAM allows per managed policy.
pub const VERSION_CEILING: usize = 5;

/// Publishes policy documents while honoring the version ceiling.
pub struct PolicyVersionManager {
    iam: Arc<dyn IamClient>,
}

impl PolicyVersionManager {
    pub fn new(iam: Arc<dyn IamClient>) -> Self {
        Self { iam }
    }

    /// Publish `document` as the new default version of `policy_arn`,
    /// pruning the oldest non-default version first when at the ceiling.
    ///
    /// # Errors
    ///
    /// Fails if versions cannot be listed, pruned, or created.
    pub async fn publish(
        &self,
        policy_arn: &str,
        document: &serde_json::Value,
    ) -> Result<String> {
        let versions = self.iam.list_policy_versions(policy_arn).await?;

        if versions.len() >= VERSION_CEILING {
            let oldest = oldest_non_default(&versions).ok_or_else(|| {
                Error::api(
                    "delete_policy_version",
                    format!("policy '{policy_arn}' has no prunable version"),
                )
            })?;
            info!(
                policy = %policy_arn,
                version = %oldest.version_id,
                "pruning oldest non-default policy version"
            );
            self.iam
                .delete_policy_version(policy_arn, &oldest.version_id)
                .await?;
        }

        let version_id = self
            .iam
            .create_policy_version(policy_arn, document, true)
            .await?;
        debug!(policy = %policy_arn, version = %version_id, "published policy version");
        Ok(version_id)
    }
}

fn oldest_non_default(versions: &[PolicyVersion]) -> Option<&PolicyVersion> {
    versions
        .iter()
        .filter(|v| !v.is_default)
        .min_by(|a, b| {
            a.create_date
                .cmp(&b.create_date)
                .then_with(|| version_ordinal(&a.version_id).cmp(&version_ordinal(&b.version_id)))
        })
}

// "v12" -> 12; unknown shapes sort last.
fn version_ordinal(version_id: &str) -> u64 {
    version_id
        .trim_start_matches('v')
        .parse()
        .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use groundwork_cloud::InMemoryCloud;

    use super::*;

    #[tokio::test]
    async fn test_version_count_never_exceeds_ceiling() {
        let cloud = InMemoryCloud::new_arc();
        let manager = PolicyVersionManager::new(cloud.clone());

        let arn = cloud
            .create_policy("app-policy", &serde_json::json!({"rev": 0}))
            .await
            .unwrap();

        for rev in 1..=10 {
            manager
                .publish(&arn, &serde_json::json!({"rev": rev}))
                .await
                .unwrap();
            assert!(cloud.policy_version_count(&arn).await <= VERSION_CEILING);
        }
    }

    #[tokio::test]
    async fn test_latest_document_is_default() {
        let cloud = InMemoryCloud::new_arc();
        let manager = PolicyVersionManager::new(cloud.clone());

        let arn = cloud
            .create_policy("app-policy", &serde_json::json!({"rev": 0}))
            .await
            .unwrap();
        for rev in 1..=7 {
            manager
                .publish(&arn, &serde_json::json!({"rev": rev}))
                .await
                .unwrap();
        }

        let policy = cloud.find_policy("app-policy").await.unwrap().unwrap();
        assert_eq!(
            policy.default_document().unwrap(),
            &serde_json::json!({"rev": 7})
        );
    }

    #[tokio::test]
    async fn test_prunes_oldest_non_default() {
        let cloud = InMemoryCloud::new_arc();
        let manager = PolicyVersionManager::new(cloud.clone());

        let arn = cloud
            .create_policy("app-policy", &serde_json::json!({"rev": 0}))
            .await
            .unwrap();
        for rev in 1..=4 {
            manager
                .publish(&arn, &serde_json::json!({"rev": rev}))
                .await
                .unwrap();
        }
        // At the ceiling now; v1 is the oldest non-default.
        manager
            .publish(&arn, &serde_json::json!({"rev": 5}))
            .await
            .unwrap();

        let versions = cloud.list_policy_versions(&arn).await.unwrap();
        assert!(versions.iter().all(|v| v.version_id != "v1"));
        assert_eq!(versions.len(), VERSION_CEILING);
    }
}
