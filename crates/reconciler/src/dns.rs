//! DNS record convergence for the environment's load balancer.
//!
//! The record shape is derived, never configured: an apex domain (exactly
//! two labels) gets an ALIAS record pointing at the load balancer, anything
//! deeper gets a CNAME. Zone selection tries the domain itself first, then
//! its two-label parent. A missing zone is a reportable condition, not an
//! error; the operator may host DNS elsewhere.

use std::sync::Arc;

use tracing::{debug, info};

use groundwork_cloud::clients::DnsClient;
use groundwork_cloud::types::{
    AliasTarget, HostedZoneState, LoadBalancerState, RecordState, RecordTarget,
};
use groundwork_core::Result;

use crate::compare::{compare_record, strip_trailing_dot, Outcome};

/// TTL applied to CNAME records; ALIAS records carry none.
const CNAME_TTL: i64 = 300;

/// What the DNS reconciler did for the domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsOutcome {
    Created,
    Updated,
    Skipped,
    /// No hosted zone covers the domain; the record must be managed
    /// externally.
    NoZoneFound,
}

/// Converges a single record mapping the domain to the load balancer.
pub struct DnsRecordReconciler {
    dns: Arc<dyn DnsClient>,
}

impl DnsRecordReconciler {
    pub fn new(dns: Arc<dyn DnsClient>) -> Self {
        Self { dns }
    }

    /// Converge the record for `domain` pointing at `load_balancer`.
    ///
    /// # Errors
    ///
    /// API failures are fatal; an absent zone is [`DnsOutcome::NoZoneFound`],
    /// not an error.
    pub async fn reconcile(
        &self,
        domain: &str,
        load_balancer: &LoadBalancerState,
    ) -> Result<DnsOutcome> {
        let domain = strip_trailing_dot(domain);

        let Some(zone) = self.find_zone(domain).await? else {
            debug!(domain, "no hosted zone covers the domain");
            return Ok(DnsOutcome::NoZoneFound);
        };

        let desired = desired_record(domain, load_balancer);
        let observed = self
            .dns
            .find_record(&zone.id, domain, desired.record_type())
            .await?;

        match compare_record(&desired, observed.as_ref()) {
            Outcome::Matches => {
                debug!(domain, zone = %zone.id, "record already converged");
                Ok(DnsOutcome::Skipped)
            }
            Outcome::Absent => {
                info!(domain, zone = %zone.id, kind = ?desired.record_type(), "creating record");
                self.dns.upsert_record(&zone.id, &desired).await?;
                Ok(DnsOutcome::Created)
            }
            Outcome::Differs { .. } => {
                info!(domain, zone = %zone.id, "replacing record target");
                self.dns.upsert_record(&zone.id, &desired).await?;
                Ok(DnsOutcome::Updated)
            }
        }
    }

    /// Exact zone match first, then the two-label parent.
    async fn find_zone(&self, domain: &str) -> Result<Option<HostedZoneState>> {
        let zones = self.dns.list_hosted_zones().await?;
        let parent = apex_of(domain);

        let exact = zones
            .iter()
            .find(|z| strip_trailing_dot(&z.name) == domain)
            .cloned();
        if exact.is_some() {
            return Ok(exact);
        }
        Ok(zones
            .into_iter()
            .find(|z| strip_trailing_dot(&z.name) == parent))
    }
}

fn desired_record(domain: &str, load_balancer: &LoadBalancerState) -> RecordState {
    if is_apex(domain) {
        RecordState {
            name: domain.to_string(),
            ttl: None,
            target: RecordTarget::Alias(AliasTarget {
                dns_name: load_balancer.dns_name.clone(),
                hosted_zone_id: load_balancer.canonical_hosted_zone_id.clone(),
            }),
        }
    } else {
        RecordState {
            name: domain.to_string(),
            ttl: Some(CNAME_TTL),
            target: RecordTarget::Cname {
                value: load_balancer.dns_name.clone(),
            },
        }
    }
}

// Last two labels: "api.shop.example.com" -> "example.com".
fn apex_of(domain: &str) -> String {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() <= 2 {
        domain.to_string()
    } else {
        labels[labels.len() - 2..].join(".")
    }
}

fn is_apex(domain: &str) -> bool {
    domain.split('.').count() == 2
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use groundwork_cloud::clients::DnsClient as _;
    use groundwork_cloud::types::RecordType;
    use groundwork_cloud::InMemoryCloud;

    use super::*;

    fn load_balancer() -> LoadBalancerState {
        LoadBalancerState {
            dns_name: "shop-lb.eb.local".into(),
            canonical_hosted_zone_id: "Z32O12XQLNTSW2".into(),
        }
    }

    #[tokio::test]
    async fn test_apex_domain_gets_alias() {
        let cloud = InMemoryCloud::new_arc();
        cloud.seed_zone("Z1", "example.com.").await;
        let reconciler = DnsRecordReconciler::new(cloud.clone());

        let outcome = reconciler
            .reconcile("example.com", &load_balancer())
            .await
            .unwrap();
        assert_eq!(outcome, DnsOutcome::Created);

        let record = cloud
            .find_record("Z1", "example.com", RecordType::Alias)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.ttl, None);
        assert!(matches!(record.target, RecordTarget::Alias(_)));
    }

    #[tokio::test]
    async fn test_subdomain_gets_cname_with_ttl() {
        let cloud = InMemoryCloud::new_arc();
        cloud.seed_zone("Z1", "example.com.").await;
        let reconciler = DnsRecordReconciler::new(cloud.clone());

        let outcome = reconciler
            .reconcile("app.example.com", &load_balancer())
            .await
            .unwrap();
        assert_eq!(outcome, DnsOutcome::Created);

        let record = cloud
            .find_record("Z1", "app.example.com", RecordType::Cname)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.ttl, Some(CNAME_TTL));
        assert_eq!(
            record.target,
            RecordTarget::Cname {
                value: "shop-lb.eb.local".into()
            }
        );
    }

    #[tokio::test]
    async fn test_subdomain_found_via_parent_zone() {
        let cloud = InMemoryCloud::new_arc();
        cloud.seed_zone("Z1", "example.com.").await;
        let reconciler = DnsRecordReconciler::new(cloud.clone());

        // No zone named "api.shop.example.com"; the two-label parent hosts it.
        let outcome = reconciler
            .reconcile("api.example.com", &load_balancer())
            .await
            .unwrap();
        assert_eq!(outcome, DnsOutcome::Created);
    }

    #[tokio::test]
    async fn test_no_zone_is_not_an_error() {
        let cloud = InMemoryCloud::new_arc();
        let reconciler = DnsRecordReconciler::new(cloud.clone());

        let outcome = reconciler
            .reconcile("app.example.com", &load_balancer())
            .await
            .unwrap();
        assert_eq!(outcome, DnsOutcome::NoZoneFound);
        assert!(cloud.write_ops().await.is_empty());
    }

    #[tokio::test]
    async fn test_matching_record_skipped_despite_trailing_dot() {
        let cloud = InMemoryCloud::new_arc();
        cloud.seed_zone("Z1", "example.com.").await;
        cloud
            .upsert_record(
                "Z1",
                &RecordState {
                    name: "app.example.com.".into(),
                    ttl: Some(CNAME_TTL),
                    target: RecordTarget::Cname {
                        value: "shop-lb.eb.local.".into(),
                    },
                },
            )
            .await
            .unwrap();
        cloud.clear_write_ops().await;
        let reconciler = DnsRecordReconciler::new(cloud.clone());

        let outcome = reconciler
            .reconcile("app.example.com", &load_balancer())
            .await
            .unwrap();
        assert_eq!(outcome, DnsOutcome::Skipped);
        assert!(cloud.write_ops().await.is_empty());
    }

    #[tokio::test]
    async fn test_drifted_record_is_replaced() {
        let cloud = InMemoryCloud::new_arc();
        cloud.seed_zone("Z1", "example.com.").await;
        cloud
            .upsert_record(
                "Z1",
                &RecordState {
                    name: "app.example.com".into(),
                    ttl: Some(CNAME_TTL),
                    target: RecordTarget::Cname {
                        value: "stale-lb.eb.local".into(),
                    },
                },
            )
            .await
            .unwrap();
        let reconciler = DnsRecordReconciler::new(cloud.clone());

        let outcome = reconciler
            .reconcile("app.example.com", &load_balancer())
            .await
            .unwrap();
        assert_eq!(outcome, DnsOutcome::Updated);
    }
}
