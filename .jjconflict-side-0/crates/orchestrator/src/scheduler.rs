//! Scheduler actor for managing workflow DAGs and bead scheduling.
//!
//! The SchedulerActor maintains one WorkflowDAG per workflow and orchestrates
//! bead scheduling by:
//! - Tracking workflow DAGs and their ready beads
//! - Subscribing to bead completion events
//! - Dispatching ready beads to appropriate queue actors
//! - Rebuilding DAG state from database on restart

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use im::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::dag::{DagError, DependencyType, WorkflowDAG};
use crate::{Error, Result};

// Re-export types from DAG module
pub use crate::dag::BeadId;

/// Unique identifier for a workflow
pub type WorkflowId = String;

/// Wrapper around WorkflowDAG that tracks workflow metadata
#[derive(Debug, Clone)]
pub struct WorkflowState {
    /// The workflow ID this state belongs to
    workflow_id: WorkflowId,
    /// The underlying DAG with dependency tracking
    dag: WorkflowDAG,
    /// Set of completed bead IDs for ready detection
    completed: HashSet<BeadId>,
}

impl WorkflowState {
    /// Create a new workflow state
    #[must_use]
    pub fn new(workflow_id: WorkflowId) -> Self {
        Self {
            workflow_id,
            dag: WorkflowDAG::new(),
            completed: HashSet::new(),
        }
    }

    /// Get the workflow ID
    #[must_use]
    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    /// Get the underlying DAG
    #[must_use]
    pub fn dag(&self) -> &WorkflowDAG {
        &self.dag
    }

    /// Get a mutable reference to the DAG
    pub fn dag_mut(&mut self) -> &mut WorkflowDAG {
        &mut self.dag
    }

    /// Add a bead to this workflow's DAG
    pub fn add_bead(&mut self, bead_id: BeadId) -> Result<()> {
        self.dag.add_node(bead_id).map_err(dag_error_to_error)
    }

    /// Add a dependency between beads
    pub fn add_dependency(
        &mut self,
        from_bead: BeadId,
        to_bead: BeadId,
        dep_type: DependencyType,
    ) -> Result<()> {
        self.dag
            .add_edge(from_bead, to_bead, dep_type)
            .map_err(dag_error_to_error)
    }

    /// Mark a bead as completed
    pub fn mark_completed(&mut self, bead_id: &BeadId) {
        self.completed = self.completed.update(bead_id.clone());
    }

    /// Get all beads that are ready to execute
    #[must_use]
    pub fn get_ready_beads(&self) -> Vec<BeadId> {
        self.dag.get_ready_nodes(&self.completed)
    }

    /// Check if a specific bead is ready
    pub fn is_bead_ready(&self, bead_id: &BeadId) -> Result<bool> {
        self.dag
            .is_ready(bead_id, &self.completed)
            .map_err(dag_error_to_error)
    }

    /// Check if DAG is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dag.node_count() == 0
    }

    /// Get the number of beads in the DAG
    #[must_use]
    pub fn len(&self) -> usize {
        self.dag.node_count()
    }

    /// Get the number of completed beads
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Check if workflow is complete (all beads done)
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed.len() == self.dag.node_count()
    }

    /// Get all bead IDs in this workflow
    #[must_use]
    pub fn beads(&self) -> Vec<BeadId> {
        self.dag.nodes().cloned().collect()
    }

    /// Check if a bead exists in this workflow
    #[must_use]
    pub fn contains_bead(&self, bead_id: &BeadId) -> bool {
        self.dag.contains_node(bead_id)
    }
}

/// Convert DagError to the crate Error type
fn dag_error_to_error(e: DagError) -> Error {
    Error::invalid_record(e.to_string())
}

/// Reference to a queue actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueActorRef {
    /// Queue identifier
    pub queue_id: String,
    /// Queue type (FIFO, LIFO, RoundRobin, Priority)
    pub queue_type: QueueType,
}

impl QueueActorRef {
    /// Create a new queue actor reference
    #[must_use]
    pub fn new(queue_id: String, queue_type: QueueType) -> Self {
        Self {
            queue_id,
            queue_type,
        }
    }
}

/// Queue type for routing beads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueType {
    /// First-in-first-out queue
    FIFO,
    /// Last-in-first-out queue (depth-first)
    LIFO,
    /// Round-robin fair queue
    RoundRobin,
    /// Priority-based queue
    Priority,
}

/// Event subscription handle (simplified)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSubscription {
    /// Subscription identifier
    pub subscription_id: String,
    /// Event types subscribed to
    pub event_types: Vec<String>,
}

impl EventSubscription {
    /// Create a new event subscription
    #[must_use]
    pub fn new(subscription_id: String, event_types: Vec<String>) -> Self {
        Self {
            subscription_id,
            event_types,
        }
    }
}

/// Messages that can be sent to the scheduler actor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SchedulerMessage {
    /// Schedule a new bead in a workflow
    ScheduleBead {
        workflow_id: WorkflowId,
        bead_id: BeadId,
    },
    /// Handle a bead completion event
    BeadCompleted {
        workflow_id: WorkflowId,
        bead_id: BeadId,
    },
    /// Register a workflow DAG
    RegisterWorkflow { workflow_id: WorkflowId },
    /// Unregister a workflow (workflow completed)
    UnregisterWorkflow { workflow_id: WorkflowId },
    /// Get ready beads for a workflow
    GetReadyBeads { workflow_id: WorkflowId },
    /// Rebuild DAG from database
    RebuildDAG { workflow_id: WorkflowId },
}

/// State of a scheduled bead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeadScheduleState {
    /// Bead is pending (waiting for dependencies)
    Pending,
    /// Bead is ready to be dispatched
    Ready,
    /// Bead has been dispatched to a queue
    Dispatched,
    /// Bead has been assigned to a worker
    Assigned,
    /// Bead is currently executing
    Running,
    /// Bead has completed
    Completed,
}

impl BeadScheduleState {
    /// Check if the bead is in a terminal state
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Check if the bead is ready to be scheduled
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Information about a scheduled bead
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledBead {
    /// Bead identifier
    pub bead_id: BeadId,
    /// Workflow this bead belongs to
    pub workflow_id: WorkflowId,
    /// Current schedule state
    pub state: BeadScheduleState,
    /// Queue assigned to (if dispatched)
    pub assigned_queue: Option<String>,
}

impl ScheduledBead {
    /// Create a new scheduled bead in pending state
    #[must_use]
    pub fn new(bead_id: BeadId, workflow_id: WorkflowId) -> Self {
        Self {
            bead_id,
            workflow_id,
            state: BeadScheduleState::Pending,
            assigned_queue: None,
        }
    }

    /// Update the state of this bead
    pub fn set_state(&mut self, state: BeadScheduleState) {
        self.state = state;
    }

    /// Assign this bead to a queue
    pub fn assign_to_queue(&mut self, queue_id: String) {
        self.assigned_queue = Some(queue_id);
        self.state = BeadScheduleState::Dispatched;
    }
}

use im::Vector;

/// Scheduler actor for managing workflow DAGs and bead scheduling.
///
/// Maintains the following invariants:
/// - One WorkflowState per workflow_id
/// - Each bead is tracked in exactly one workflow
/// - Event subscriptions are active while actor is running
#[derive(Debug, Clone)]
pub struct SchedulerActor {
    /// Map of workflow IDs to their state (DAG + completed tracking)
    /// Invariant: One WorkflowState per workflow_id
    workflows: HashMap<WorkflowId, WorkflowState>,

    /// Pending beads waiting to be scheduled
    pending_beads: HashMap<BeadId, ScheduledBead>,

    /// Ready beads that can be dispatched to queues
    ready_beads: Vector<BeadId>,

    /// Worker assignments (bead_id -> worker_id)
    worker_assignments: HashMap<BeadId, String>,

    /// References to queue actors for dispatching
    queue_refs: Vector<QueueActorRef>,

    /// Event subscriptions (for bead completion events)
    event_subscriptions: Vector<EventSubscription>,
}

impl SchedulerActor {
    /// Create a new scheduler actor with no workflows
    #[must_use]
    pub fn new() -> Self {
        Self {
            workflows: HashMap::new(),
            pending_beads: HashMap::new(),
            ready_beads: Vector::new(),
            worker_assignments: HashMap::new(),
            queue_refs: Vector::new(),
            event_subscriptions: Vector::new(),
        }
    }

    /// Register a new workflow with the scheduler
    ///
    /// Returns Ok(()) if registered successfully, Err if workflow already exists
    pub fn register_workflow(&mut self, workflow_id: WorkflowId) -> Result<()> {
        if self.workflows.contains_key(&workflow_id) {
            return Err(Error::invalid_record(format!(
                "workflow {} already registered",
                workflow_id
            )));
        }

        self.workflows
            .insert(workflow_id.clone(), WorkflowState::new(workflow_id));
        Ok(())
    }

    /// Unregister a workflow (when it completes)
    ///
    /// Returns the removed state if it existed, None otherwise
    pub fn unregister_workflow(&mut self, workflow_id: &WorkflowId) -> Option<WorkflowState> {
        self.workflows.remove(workflow_id)
    }

    /// Get a workflow state by ID
    #[must_use]
    pub fn get_workflow(&self, workflow_id: &WorkflowId) -> Option<&WorkflowState> {
        self.workflows.get(workflow_id)
    }

    /// Get a mutable reference to a workflow state
    pub fn get_workflow_mut(&mut self, workflow_id: &WorkflowId) -> Option<&mut WorkflowState> {
        self.workflows.get_mut(workflow_id)
    }

    /// Get the number of registered workflows
    #[must_use]
    pub fn workflow_count(&self) -> usize {
        self.workflows.len()
    }

    /// Schedule a bead in a workflow
    ///
    /// Adds the bead to the workflow's DAG and marks it as pending
    pub fn schedule_bead(&mut self, workflow_id: WorkflowId, bead_id: BeadId) -> Result<()> {
        // Ensure workflow exists
        let workflow_state = self
            .workflows
            .get_mut(&workflow_id)
            .ok_or_else(|| Error::invalid_record(format!("workflow {} not found", workflow_id)))?;

        // Add bead to workflow DAG
        workflow_state.add_bead(bead_id.clone())?;

        // Track bead as pending
        let scheduled_bead = ScheduledBead::new(bead_id.clone(), workflow_id);
        self.pending_beads.insert(bead_id, scheduled_bead);

        Ok(())
    }

    /// Add a dependency between beads in a workflow
    ///
    /// The `from_bead` must complete before `to_bead` can start
    pub fn add_dependency(
        &mut self,
        workflow_id: &WorkflowId,
        from_bead: BeadId,
        to_bead: BeadId,
    ) -> Result<()> {
        let workflow_state = self
            .workflows
            .get_mut(workflow_id)
            .ok_or_else(|| Error::invalid_record(format!("workflow {} not found", workflow_id)))?;

        workflow_state.add_dependency(from_bead, to_bead, DependencyType::BlockingDependency)
    }

    /// Get all beads ready to execute in a workflow (based on DAG dependencies)
    pub fn get_workflow_ready_beads(&self, workflow_id: &WorkflowId) -> Result<Vec<BeadId>> {
        let workflow_state = self
            .workflows
            .get(workflow_id)
            .ok_or_else(|| Error::invalid_record(format!("workflow {} not found", workflow_id)))?;

        Ok(workflow_state.get_ready_beads())
    }

    /// Mark a bead as ready for dispatch
    pub fn mark_ready(&mut self, bead_id: &BeadId) -> Result<()> {
        let bead = self
            .pending_beads
            .get_mut(bead_id)
            .ok_or_else(|| Error::invalid_record(format!("bead {} not found", bead_id)))?;

        bead.set_state(BeadScheduleState::Ready);

        if !self.ready_beads.contains(bead_id) {
            self.ready_beads.push_back(bead_id.clone());
        }

        Ok(())
    }

    /// Get all ready beads
    #[must_use]
    pub fn get_ready_beads(&self) -> Vec<BeadId> {
        self.ready_beads.iter().cloned().collect()
    }

    /// Handle a bead completion event
    ///
    /// This method is called when a BeadCompleted event is received from the event bus.
    /// It updates both the bead's schedule state AND the workflow DAG's completed set.
    pub fn handle_bead_completed(&mut self, bead_id: &BeadId) -> Result<()> {
        // Update bead state
        if let Some(bead) = self.pending_beads.get_mut(bead_id) {
            bead.set_state(BeadScheduleState::Completed);
        }

        // Remove from ready list
        self.ready_beads.retain(|id| id != bead_id);

        // Remove worker assignment
        self.worker_assignments.remove(bead_id);

        // MARK BEAD AS COMPLETED IN WORKFLOW DAG
        // This is the key change - we need to update the WorkflowState's completed set
        // so that dependent beads become ready
        if let Some(scheduled_bead) = self.pending_beads.get(bead_id) {
            let workflow_id = scheduled_bead.workflow_id.clone();
            if let Some(workflow_state) = self.workflows.get_mut(&workflow_id) {
                workflow_state.mark_completed(bead_id);
            }
        }

        Ok(())
    }

    /// Assign a bead to a worker
    pub fn assign_to_worker(&mut self, bead_id: &BeadId, worker_id: String) -> Result<()> {
        if !self.pending_beads.contains_key(bead_id) {
            return Err(Error::invalid_record(format!("bead {} not found", bead_id)));
        }

        self.worker_assignments.insert(bead_id.clone(), worker_id);

        if let Some(bead) = self.pending_beads.get_mut(bead_id) {
            bead.set_state(BeadScheduleState::Assigned);
        }

        Ok(())
    }

    /// Get worker assignment for a bead
    #[must_use]
    pub fn get_worker_assignment(&self, bead_id: &BeadId) -> Option<&String> {
        self.worker_assignments.get(bead_id)
    }

    /// Add a queue actor reference
    pub fn add_queue_ref(&mut self, queue_ref: QueueActorRef) {
        if !self.queue_refs.contains(&queue_ref) {
            self.queue_refs.push_back(queue_ref);
        }
    }

    /// Get all queue references
    #[must_use]
    pub fn get_queue_refs(&self) -> Vector<QueueActorRef> {
        self.queue_refs.clone()
    }

    /// Add an event subscription
    pub fn subscribe_to_events(&mut self, subscription: EventSubscription) {
        self.event_subscriptions.push_back(subscription);
    }

    /// Get all event subscriptions
    #[must_use]
    pub fn get_subscriptions(&self) -> Vector<EventSubscription> {
        self.event_subscriptions.clone()
    }

    /// Get the number of pending beads
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending_beads
            .values()
            .filter(|b| matches!(b.state, BeadScheduleState::Pending))
            .count()
    }

    /// Get the number of ready beads
    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.ready_beads.len()
    }

    /// Get statistics about the scheduler state
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            workflow_count: self.workflows.len(),
            pending_count: self.pending_count(),
            ready_count: self.ready_count(),
            assigned_count: self.worker_assignments.len(),
            queue_count: self.queue_refs.len(),
        }
    }

    /// Clear all state (for testing)
    pub fn clear(&mut self) {
        self.workflows.clear();
        self.pending_beads.clear();
        self.ready_beads.clear();
        self.worker_assignments.clear();
        self.queue_refs.clear();
        self.event_subscriptions.clear();
    }
}

impl Default for SchedulerActor {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about scheduler state
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Number of registered workflows
    pub workflow_count: usize,
    /// Number of pending beads
    pub pending_count: usize,
    /// Number of ready beads
    pub ready_count: usize,
    /// Number of assigned beads
    pub assigned_count: usize,
    /// Number of queue references
    pub queue_count: usize,
}
