//! Replica discovery via DNS SRV lookup.
//!
//! The directory publishes its API replicas under a well-known SRV name.
//! Records are sorted ascending by priority, mapped to HTTPS base URLs, and
//! then shuffled according to the configured policy.

use hickory_resolver::{
    config::{ResolverConfig, ResolverOpts},
    TokioAsyncResolver,
};
use rand::seq::SliceRandom;
use rand::Rng;

use super::DirectoryError;

/// How the sorted candidate list is randomized before failover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShufflePolicy {
    /// Shuffle the whole list, discarding the priority ordering.
    ///
    /// This matches the long-observed behavior of the service: load spreads
    /// across every replica, at the cost of sometimes trying a lower-priority
    /// replica first.
    FullyRandom,
    /// Keep the priority ordering and shuffle only within equal-priority
    /// tiers.
    PriorityTiers,
}

/// One SRV record relevant to candidate ordering.
#[derive(Debug, Clone)]
pub struct SrvCandidate {
    pub priority: u16,
    pub host: String,
}

/// Resolves directory replicas for a fixed SRV service name.
#[derive(Debug, Clone)]
pub struct SrvResolver {
    service: String,
    policy: ShufflePolicy,
}

impl SrvResolver {
    pub fn new(service: &str, policy: ShufflePolicy) -> Self {
        Self {
            service: service.to_string(),
            policy,
        }
    }

    /// Resolve the candidate base URLs for the directory API.
    ///
    /// Fails when the lookup errors or returns no records; there is no cached
    /// fallback list.
    pub async fn resolve(&self) -> Result<Vec<String>, DirectoryError> {
        let resolver =
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());

        let lookup = resolver
            .srv_lookup(&self.service)
            .await
            .map_err(|e| DirectoryError::Lookup(e.to_string()))?;

        let candidates: Vec<SrvCandidate> = lookup
            .iter()
            .map(|record| SrvCandidate {
                priority: record.priority(),
                host: record.target().to_utf8().trim_end_matches('.').to_string(),
            })
            .collect();

        if candidates.is_empty() {
            return Err(DirectoryError::NoServers);
        }

        let servers = order_candidates(candidates, self.policy, &mut rand::thread_rng());
        tracing::debug!("Resolved {} directory servers", servers.len());

        Ok(servers)
    }
}

/// Sort candidates by priority, map to HTTPS base URLs, and shuffle per the
/// given policy.
pub fn order_candidates<R: Rng>(
    mut candidates: Vec<SrvCandidate>,
    policy: ShufflePolicy,
    rng: &mut R,
) -> Vec<String> {
    candidates.sort_by_key(|c| c.priority);

    match policy {
        ShufflePolicy::FullyRandom => {
            let mut servers: Vec<String> = candidates
                .into_iter()
                .map(|c| format!("https://{}", c.host))
                .collect();
            servers.shuffle(rng);
            servers
        }
        ShufflePolicy::PriorityTiers => {
            let mut start = 0;
            while start < candidates.len() {
                let priority = candidates[start].priority;
                let mut end = start;
                while end < candidates.len() && candidates[end].priority == priority {
                    end += 1;
                }
                candidates[start..end].shuffle(rng);
                start = end;
            }
            candidates
                .into_iter()
                .map(|c| format!("https://{}", c.host))
                .collect()
        }
    }
}
