//! Generic reconcile machinery and the bucket / IAM / environment
//! reconcilers.
//!
//! Every reconciler follows read → compare → branch. Updates re-submit the
//! full desired document rather than patching, with two exceptions that are
//! the safety-critical part of this design: environment updates require an
//! explicit confirmation, and database class/engine/Multi-AZ changes are
//! never applied automatically (see [`crate::database`]). Instance-profile
//! attachment is the one repair applied without confirmation, since it
//! restores correctness rather than changing behavior.

use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, info, warn};

use groundwork_cloud::clients::{BeanstalkClient, IamClient, StorageClient};
use groundwork_core::poll::{PollConfig, PollStatus, poll_until};
use groundwork_core::spec::{BucketSpec, EnvironmentSpec, IamSpec, ManagedPolicySpec};
use groundwork_core::Result;

use crate::compare::{
    compare_bucket, compare_environment, compare_policy_document, Outcome,
};
use crate::policy::PolicyVersionManager;

/// The action a reconciler took for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated,
    Skipped,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Per-resource report: what was done, and any divergence left unresolved.
#[derive(Debug, Clone)]
pub struct ResourceOutcome {
    /// Resource identity, e.g. `s3/shop-uploads`.
    pub resource: String,
    pub action: Action,
    pub warning: Option<String>,
}

impl ResourceOutcome {
    pub fn created(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: Action::Created,
            warning: None,
        }
    }

    pub fn updated(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: Action::Updated,
            warning: None,
        }
    }

    pub fn skipped(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: Action::Skipped,
            warning: None,
        }
    }

    /// Attach an operator-facing warning to this outcome.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }
}

/// Operator confirmation before risky updates.
///
/// The binary supplies a blocking terminal prompt; automated contexts inject
/// a deterministic answer.
pub trait Confirm: Send + Sync {
    fn confirm(&self, summary: &str) -> bool;
}

/// Confirmation capability that approves everything.
pub struct ApproveAll;

impl Confirm for ApproveAll {
    fn confirm(&self, _summary: &str) -> bool {
        true
    }
}

/// Confirmation capability that declines everything.
pub struct DeclineAll;

impl Confirm for DeclineAll {
    fn confirm(&self, _summary: &str) -> bool {
        false
    }
}

/// Converges one S3 bucket: existence, CORS method set, public-access block.
pub struct BucketReconciler {
    storage: Arc<dyn StorageClient>,
    region: String,
}

impl BucketReconciler {
    pub fn new(storage: Arc<dyn StorageClient>, region: impl Into<String>) -> Self {
        Self {
            storage,
            region: region.into(),
        }
    }

    /// Read, compare, and converge a single bucket.
    ///
    /// # Errors
    ///
    /// Any API failure other than "not found" is fatal and propagated.
    pub async fn reconcile(&self, desired: &BucketSpec) -> Result<ResourceOutcome> {
        let resource = format!("s3/{}", desired.name);
        let observed = self.storage.describe_bucket(&desired.name).await?;

        match compare_bucket(desired, observed.as_ref()) {
            Outcome::Absent => {
                info!(bucket = %desired.name, region = %self.region, "creating bucket");
                self.storage.create_bucket(&desired.name, &self.region).await?;
                self.apply_settings(desired).await?;
                Ok(ResourceOutcome::created(resource))
            }
            Outcome::Matches => {
                debug!(bucket = %desired.name, "bucket already converged");
                Ok(ResourceOutcome::skipped(resource))
            }
            Outcome::Differs { fields } => {
                info!(
                    bucket = %desired.name,
                    fields = %fields.iter().join(", "),
                    "updating bucket configuration"
                );
                self.apply_settings(desired).await?;
                Ok(ResourceOutcome::updated(resource))
            }
        }
    }

    // Full desired document, not a patch.
    async fn apply_settings(&self, desired: &BucketSpec) -> Result<()> {
        if !desired.cors_methods.is_empty() {
            self.storage
                .put_cors_methods(&desired.name, &desired.cors_methods)
                .await?;
        }
        self.storage
            .put_public_access_block(&desired.name, &desired.public_access)
            .await?;
        Ok(())
    }
}

/// Converges the IAM role, its instance profile, and customer-managed
/// policies.
pub struct RoleReconciler {
    iam: Arc<dyn IamClient>,
    versions: PolicyVersionManager,
}

impl RoleReconciler {
    pub fn new(iam: Arc<dyn IamClient>) -> Self {
        Self {
            versions: PolicyVersionManager::new(iam.clone()),
            iam,
        }
    }

    /// Converge role, profile, and policies in that order.
    ///
    /// # Errors
    ///
    /// Any API failure is fatal and propagated.
    pub async fn reconcile(&self, desired: &IamSpec) -> Result<Vec<ResourceOutcome>> {
        let mut outcomes = Vec::new();
        outcomes.push(self.reconcile_role(desired).await?);
        outcomes.push(self.reconcile_instance_profile(desired).await?);
        for policy in &desired.policies {
            outcomes.push(self.reconcile_policy(desired, policy).await?);
        }
        Ok(outcomes)
    }

    async fn reconcile_role(&self, desired: &IamSpec) -> Result<ResourceOutcome> {
        let resource = format!("iam-role/{}", desired.role_name);

        let Some(observed) = self.iam.describe_role(&desired.role_name).await? else {
            info!(role = %desired.role_name, "creating role");
            self.iam
                .create_role(&desired.role_name, &desired.trust_policy)
                .await?;
            for arn in &desired.managed_policy_arns {
                self.iam.attach_role_policy(&desired.role_name, arn).await?;
            }
            return Ok(ResourceOutcome::created(resource));
        };

        let mut changed = false;

        if !compare_policy_document(&desired.trust_policy, Some(&observed.trust_policy))
            .is_matches()
        {
            info!(role = %desired.role_name, "replacing trust policy");
            self.iam
                .update_trust_policy(&desired.role_name, &desired.trust_policy)
                .await?;
            changed = true;
        }

        for arn in &desired.managed_policy_arns {
            if !observed.attached_policy_arns.contains(arn) {
                info!(role = %desired.role_name, policy = %arn, "attaching managed policy");
                self.iam.attach_role_policy(&desired.role_name, arn).await?;
                changed = true;
            }
        }

        if changed {
            Ok(ResourceOutcome::updated(resource))
        } else {
            debug!(role = %desired.role_name, "role already converged");
            Ok(ResourceOutcome::skipped(resource))
        }
    }

    async fn reconcile_instance_profile(&self, desired: &IamSpec) -> Result<ResourceOutcome> {
        let resource = format!("iam-profile/{}", desired.instance_profile);

        match self
            .iam
            .describe_instance_profile(&desired.instance_profile)
            .await?
        {
            None => {
                info!(profile = %desired.instance_profile, "creating instance profile");
                self.iam
                    .create_instance_profile(&desired.instance_profile)
                    .await?;
                self.iam
                    .add_role_to_instance_profile(&desired.instance_profile, &desired.role_name)
                    .await?;
                Ok(ResourceOutcome::created(resource))
            }
            Some(profile) if !profile.role_names.contains(&desired.role_name) => {
                // Correctness repair, applied without confirmation.
                info!(
                    profile = %desired.instance_profile,
                    role = %desired.role_name,
                    "re-attaching role to instance profile"
                );
                self.iam
                    .add_role_to_instance_profile(&desired.instance_profile, &desired.role_name)
                    .await?;
                Ok(ResourceOutcome::updated(resource))
            }
            Some(_) => Ok(ResourceOutcome::skipped(resource)),
        }
    }

    async fn reconcile_policy(
        &self,
        desired: &IamSpec,
        policy: &ManagedPolicySpec,
    ) -> Result<ResourceOutcome> {
        let resource = format!("iam-policy/{}", policy.name);

        let Some(observed) = self.iam.find_policy(&policy.name).await? else {
            info!(policy = %policy.name, "creating managed policy");
            let arn = self.iam.create_policy(&policy.name, &policy.document).await?;
            self.iam.attach_role_policy(&desired.role_name, &arn).await?;
            return Ok(ResourceOutcome::created(resource));
        };

        let mut action = Action::Skipped;

        if !compare_policy_document(&policy.document, observed.default_document()).is_matches() {
            let version = self
                .versions
                .publish(&observed.arn, &policy.document)
                .await?;
            info!(policy = %policy.name, version = %version, "published new policy version");
            action = Action::Updated;
        }

        if let Some(role) = self.iam.describe_role(&desired.role_name).await? {
            if !role.attached_policy_arns.contains(&observed.arn) {
                info!(policy = %policy.name, role = %desired.role_name, "attaching policy");
                self.iam
                    .attach_role_policy(&desired.role_name, &observed.arn)
                    .await?;
                if action == Action::Skipped {
                    action = Action::Updated;
                }
            }
        }

        Ok(ResourceOutcome {
            resource,
            action,
            warning: None,
        })
    }
}

/// Converges the Elastic Beanstalk application and environment.
///
/// Environment creation blocks (bounded) until the environment is Ready.
/// Environment *updates* are gated on operator confirmation; a declined
/// confirmation is a skip with the pending changes reported, never an error.
pub struct EnvironmentReconciler {
    beanstalk: Arc<dyn BeanstalkClient>,
    confirm: Arc<dyn Confirm>,
}

impl EnvironmentReconciler {
    pub fn new(beanstalk: Arc<dyn BeanstalkClient>, confirm: Arc<dyn Confirm>) -> Self {
        Self { beanstalk, confirm }
    }

    /// Converge application then environment.
    ///
    /// # Errors
    ///
    /// API failures are fatal. A declined confirmation is not an error.
    pub async fn reconcile(&self, desired: &EnvironmentSpec) -> Result<Vec<ResourceOutcome>> {
        let mut outcomes = Vec::new();
        outcomes.push(self.reconcile_application(desired).await?);
        outcomes.push(self.reconcile_environment(desired).await?);
        Ok(outcomes)
    }

    async fn reconcile_application(&self, desired: &EnvironmentSpec) -> Result<ResourceOutcome> {
        let resource = format!("eb-app/{}", desired.application);
        if self
            .beanstalk
            .describe_application(&desired.application)
            .await?
            .is_some()
        {
            return Ok(ResourceOutcome::skipped(resource));
        }
        info!(application = %desired.application, "creating application");
        self.beanstalk.create_application(&desired.application).await?;
        Ok(ResourceOutcome::created(resource))
    }

    async fn reconcile_environment(&self, desired: &EnvironmentSpec) -> Result<ResourceOutcome> {
        let resource = format!("eb-env/{}", desired.environment_name);
        let observed = self
            .beanstalk
            .describe_environment(&desired.environment_name)
            .await?;

        match compare_environment(desired, observed.as_ref()) {
            Outcome::Absent => {
                info!(environment = %desired.environment_name, "creating environment");
                self.beanstalk.create_environment(desired).await?;
                match self.wait_for_ready(&desired.environment_name).await {
                    PollStatus::Ready(()) => Ok(ResourceOutcome::created(resource)),
                    PollStatus::Timeout => Ok(ResourceOutcome::created(resource).with_warning(
                        "environment still launching after wait budget; it may complete \
                         asynchronously",
                    )),
                    PollStatus::Failed(err) => Err(err),
                }
            }
            Outcome::Matches => {
                debug!(environment = %desired.environment_name, "environment already converged");
                Ok(ResourceOutcome::skipped(resource))
            }
            Outcome::Differs { fields } => {
                let pending = fields.iter().join(", ");
                let summary = format!(
                    "environment '{}' differs from desired configuration in: {pending}",
                    desired.environment_name
                );
                if self.confirm.confirm(&summary) {
                    info!(environment = %desired.environment_name, fields = %pending, "applying environment update");
                    self.beanstalk.update_environment(desired).await?;
                    Ok(ResourceOutcome::updated(resource))
                } else {
                    warn!(
                        environment = %desired.environment_name,
                        fields = %pending,
                        "environment update not confirmed; leaving divergence unresolved"
                    );
                    Ok(ResourceOutcome::skipped(resource)
                        .with_warning(format!("pending changes not applied: {pending}")))
                }
            }
        }
    }

    async fn wait_for_ready(&self, name: &str) -> PollStatus<()> {
        let client = self.beanstalk.clone();
        let name = name.to_string();
        poll_until(PollConfig::environment(), "beanstalk-environment", move || {
            let client = client.clone();
            let name = name.clone();
            async move {
                Ok(client
                    .describe_environment(&name)
                    .await?
                    .filter(|env| env.is_ready())
                    .map(|_| ()))
            }
        })
        .await
    }
}
