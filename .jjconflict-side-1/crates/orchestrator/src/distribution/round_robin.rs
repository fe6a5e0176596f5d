//! Round-robin distribution strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::strategy::{DistributionContext, DistributionStrategy};

/// Round-robin distribution strategy.
///
/// Distributes beads and agents in a rotating fashion for fairness.
#[derive(Debug)]
pub struct RoundRobinStrategy {
    /// Current bead index.
    bead_index: AtomicUsize,
    /// Current agent index.
    agent_index: AtomicUsize,
}

impl Default for RoundRobinStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundRobinStrategy {
    /// Create a new round-robin strategy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bead_index: AtomicUsize::new(0),
            agent_index: AtomicUsize::new(0),
        }
    }

    /// Reset the bead index.
    pub fn reset_bead_index(&self) {
        self.bead_index.store(0, Ordering::SeqCst);
    }

    /// Reset the agent index.
    pub fn reset_agent_index(&self) {
        self.agent_index.store(0, Ordering::SeqCst);
    }

    /// Reset both indices.
    pub fn reset(&self) {
        self.reset_bead_index();
        self.reset_agent_index();
    }

    /// Get current bead index.
    #[must_use]
    pub fn current_bead_index(&self) -> usize {
        self.bead_index.load(Ordering::SeqCst)
    }

    /// Get current agent index.
    #[must_use]
    pub fn current_agent_index(&self) -> usize {
        self.agent_index.load(Ordering::SeqCst)
    }
}

impl DistributionStrategy for RoundRobinStrategy {
    fn select_bead(&self, ready_beads: &[String], _ctx: &DistributionContext) -> Option<String> {
        if ready_beads.is_empty() {
            return None;
        }

        let index = self.bead_index.fetch_add(1, Ordering::SeqCst) % ready_beads.len();
        ready_beads.get(index).cloned()
    }

    fn select_agent(
        &self,
        _bead_id: &str,
        agents: &[String],
        _ctx: &DistributionContext,
    ) -> Option<String> {
        if agents.is_empty() {
            return None;
        }

        let index = self.agent_index.fetch_add(1, Ordering::SeqCst) % agents.len();
        agents.get(index).cloned()
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
