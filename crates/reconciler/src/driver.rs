//! Full-run orchestration.
//!
//! Resources converge in fixed dependency order: buckets, IAM, the
//! Beanstalk environment, then (when configured) the network topology,
//! the database sequence, and the DNS record. The database and DNS steps
//! read identity produced by the environment step, so the order is not
//! adjustable.

use std::sync::Arc;

use itertools::Itertools;
use tracing::{info, warn};

use groundwork_cloud::clients::CloudClients;
use groundwork_core::spec::{DesiredSpec, DnsSpec};
use groundwork_core::Result;

use crate::database::DatabaseReconciler;
use crate::dns::{DnsOutcome, DnsRecordReconciler};
use crate::network::NetworkTopologyResolver;
use crate::reconcile::{
    Action, BucketReconciler, Confirm, EnvironmentReconciler, ResourceOutcome, RoleReconciler,
};

/// Aggregated report of one convergence run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcomes: Vec<ResourceOutcome>,
}

impl RunSummary {
    /// Number of outcomes with the given action.
    pub fn count(&self, action: Action) -> usize {
        self.outcomes.iter().filter(|o| o.action == action).count()
    }

    /// Outcomes carrying an unresolved-divergence warning.
    pub fn warnings(&self) -> impl Iterator<Item = &ResourceOutcome> {
        self.outcomes.iter().filter(|o| o.warning.is_some())
    }

    /// Whether the run was a no-op (state already converged).
    pub fn all_skipped(&self) -> bool {
        self.outcomes.iter().all(|o| o.action == Action::Skipped)
    }

    /// Operator-facing report, one line per resource plus totals.
    pub fn render(&self) -> String {
        let lines = self
            .outcomes
            .iter()
            .map(|o| {
                let action = format!("{:>7}", o.action.to_string());
                match &o.warning {
                    Some(warning) => format!("{action}  {}  ({warning})", o.resource),
                    None => format!("{action}  {}", o.resource),
                }
            })
            .join("\n");
        format!(
            "{lines}\n\n{} created, {} updated, {} skipped",
            self.count(Action::Created),
            self.count(Action::Updated),
            self.count(Action::Skipped),
        )
    }
}

/// Runs the per-resource reconcilers over a desired spec.
pub struct ConvergenceDriver {
    clients: CloudClients,
    confirm: Arc<dyn Confirm>,
}

impl ConvergenceDriver {
    pub fn new(clients: CloudClients, confirm: Arc<dyn Confirm>) -> Self {
        Self { clients, confirm }
    }

    /// Converge every resource in `desired`, in dependency order.
    ///
    /// # Errors
    ///
    /// Validation failures and API errors abort the run; resources already
    /// converged before the failing step keep whatever actions were applied.
    pub async fn run(&self, desired: &DesiredSpec) -> Result<RunSummary> {
        desired.validate()?;
        info!(
            app = %desired.app_name,
            environment = %desired.environment,
            region = %desired.region,
            "starting convergence run"
        );

        let mut outcomes = Vec::new();

        let buckets = BucketReconciler::new(self.clients.storage.clone(), &desired.region);
        for bucket in &desired.buckets {
            outcomes.push(buckets.reconcile(bucket).await?);
        }

        let roles = RoleReconciler::new(self.clients.iam.clone());
        outcomes.extend(roles.reconcile(&desired.iam).await?);

        let environments =
            EnvironmentReconciler::new(self.clients.beanstalk.clone(), self.confirm.clone());
        outcomes.extend(environments.reconcile(&desired.beanstalk).await?);

        if let Some(database) = &desired.database {
            let resolver = NetworkTopologyResolver::new(
                self.clients.beanstalk.clone(),
                self.clients.ec2.clone(),
            );
            let topology = resolver
                .resolve(&desired.beanstalk.environment_name)
                .await?;
            let databases = DatabaseReconciler::new(
                self.clients.rds.clone(),
                self.clients.ec2.clone(),
                self.clients.secrets.clone(),
                self.clients.autoscaling.clone(),
            );
            outcomes.extend(
                databases
                    .converge(database, &desired.app_name, &desired.environment, &topology)
                    .await?,
            );
        }

        if let Some(dns) = &desired.dns {
            outcomes.push(
                self.reconcile_dns(dns, &desired.beanstalk.environment_name)
                    .await?,
            );
        }

        let summary = RunSummary { outcomes };
        info!(
            created = summary.count(Action::Created),
            updated = summary.count(Action::Updated),
            skipped = summary.count(Action::Skipped),
            warnings = summary.warnings().count(),
            "convergence run complete"
        );
        Ok(summary)
    }

    async fn reconcile_dns(&self, dns: &DnsSpec, environment: &str) -> Result<ResourceOutcome> {
        let resource = format!("dns/{}", dns.domain);

        let Some(load_balancer) = self
            .clients
            .beanstalk
            .environment_load_balancer(environment)
            .await?
        else {
            warn!(environment, "environment has no load balancer yet; skipping DNS");
            return Ok(ResourceOutcome::skipped(resource)
                .with_warning("environment has no load balancer; record deferred to the next run"));
        };

        let reconciler = DnsRecordReconciler::new(self.clients.dns.clone());
        match reconciler.reconcile(&dns.domain, &load_balancer).await? {
            DnsOutcome::Created => Ok(ResourceOutcome::created(resource)),
            DnsOutcome::Updated => Ok(ResourceOutcome::updated(resource)),
            DnsOutcome::Skipped => Ok(ResourceOutcome::skipped(resource)),
            DnsOutcome::NoZoneFound => {
                warn!(
                    domain = %dns.domain,
                    target = %load_balancer.dns_name,
                    "no hosted zone covers the domain; create the record manually"
                );
                Ok(ResourceOutcome::skipped(resource).with_warning(format!(
                    "no hosted zone covers '{}'; point it at '{}' manually",
                    dns.domain, load_balancer.dns_name
                )))
            }
        }
    }
}
