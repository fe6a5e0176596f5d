//! Checkpoint persistence operations.
//!
//! CRUD operations for checkpoint records used in replay/recovery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use surrealdb::sql::Datetime as SurrealDatetime;

use super::client::OrchestratorStore;
use super::error::{PersistenceError, PersistenceResult, from_surrealdb_error};

/// Checkpoint record stored in the database.
///
/// Checkpoints capture the scheduler state at a point in time for recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// SurrealDB record ID
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "id")]
    pub record_id: Option<RecordId>,
    /// Checkpoint identifier
    pub checkpoint_id: String,
    /// Serialized scheduler state
    pub scheduler_state: String,
    /// Event sequence number at checkpoint time
    pub event_sequence: u64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Serialized workflow snapshots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_snapshots: Option<String>,
    /// Additional metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl CheckpointRecord {
    /// Create a new checkpoint record.
    #[must_use]
    pub fn new(
        checkpoint_id: impl Into<String>,
        scheduler_state: impl Into<String>,
        event_sequence: u64,
    ) -> Self {
        Self {
            record_id: None,
            checkpoint_id: checkpoint_id.into(),
            scheduler_state: scheduler_state.into(),
            event_sequence,
            created_at: Utc::now(),
            workflow_snapshots: None,
            metadata: None,
        }
    }

    /// Set workflow snapshots.
    #[must_use]
    pub fn with_workflow_snapshots(mut self, snapshots: impl Into<String>) -> Self {
        self.workflow_snapshots = Some(snapshots.into());
        self
    }

    /// Set metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Input for creating a checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CheckpointInput {
    checkpoint_id: String,
    scheduler_state: String,
    event_sequence: u64,
    created_at: SurrealDatetime,
    workflow_snapshots: Option<String>,
    metadata: Option<serde_json::Value>,
}

impl From<&CheckpointRecord> for CheckpointInput {
    fn from(record: &CheckpointRecord) -> Self {
        Self {
            checkpoint_id: record.checkpoint_id.clone(),
            scheduler_state: record.scheduler_state.clone(),
            event_sequence: record.event_sequence,
            created_at: SurrealDatetime::from(record.created_at),
            workflow_snapshots: record.workflow_snapshots.clone(),
            metadata: record.metadata.clone(),
        }
    }
}

impl OrchestratorStore {
    /// Save a checkpoint to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn save_checkpoint(
        &self,
        record: &CheckpointRecord,
    ) -> PersistenceResult<CheckpointRecord> {
        let input = CheckpointInput::from(record);

        let result: Option<CheckpointRecord> = self
            .db()
            .create(("checkpoint", &record.checkpoint_id))
            .content(input)
            .await
            .map_err(from_surrealdb_error)?;

        result.ok_or_else(|| PersistenceError::query_failed("failed to save checkpoint"))
    }

    /// Get the latest checkpoint (highest event sequence).
    ///
    /// # Errors
    ///
    /// Returns an error if no checkpoints exist or the query fails.
    pub async fn get_latest_checkpoint(&self) -> PersistenceResult<CheckpointRecord> {
        let checkpoints: Vec<CheckpointRecord> = self
            .db()
            .query("SELECT * FROM checkpoint ORDER BY event_sequence DESC LIMIT 1")
            .await
            .map_err(from_surrealdb_error)?
            .take(0)
            .map_err(from_surrealdb_error)?;

        checkpoints
            .into_iter()
            .next()
            .ok_or_else(|| PersistenceError::not_found("checkpoint", "latest"))
    }

    /// Get a checkpoint by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint is not found.
    pub async fn get_checkpoint(&self, checkpoint_id: &str) -> PersistenceResult<CheckpointRecord> {
        let result: Option<CheckpointRecord> = self
            .db()
            .select(("checkpoint", checkpoint_id))
            .await
            .map_err(from_surrealdb_error)?;

        result.ok_or_else(|| PersistenceError::not_found("checkpoint", checkpoint_id))
    }

    /// List checkpoints, optionally limited and ordered by sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_checkpoints(
        &self,
        limit: Option<usize>,
    ) -> PersistenceResult<Vec<CheckpointRecord>> {
        let query = match limit {
            Some(n) => format!(
                "SELECT * FROM checkpoint ORDER BY event_sequence DESC LIMIT {}",
                n
            ),
            None => "SELECT * FROM checkpoint ORDER BY event_sequence DESC".to_string(),
        };

        let checkpoints: Vec<CheckpointRecord> = self
            .db()
            .query(&query)
            .await
            .map_err(from_surrealdb_error)?
            .take(0)
            .map_err(from_surrealdb_error)?;

        Ok(checkpoints)
    }

    /// Get checkpoint by event sequence number.
    ///
    /// # Errors
    ///
    /// Returns an error if no checkpoint exists at that sequence.
    pub async fn get_checkpoint_by_sequence(
        &self,
        sequence: u64,
    ) -> PersistenceResult<CheckpointRecord> {
        let checkpoints: Vec<CheckpointRecord> = self
            .db()
            .query("SELECT * FROM checkpoint WHERE event_sequence = $seq LIMIT 1")
            .bind(("seq", sequence))
            .await
            .map_err(from_surrealdb_error)?
            .take(0)
            .map_err(from_surrealdb_error)?;

        checkpoints.into_iter().next().ok_or_else(|| {
            PersistenceError::not_found("checkpoint", format!("sequence:{}", sequence))
        })
    }

    /// Get checkpoints since a specific sequence number.
    ///
    /// Returns checkpoints with sequence > the given sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_checkpoints_since(
        &self,
        sequence: u64,
    ) -> PersistenceResult<Vec<CheckpointRecord>> {
        let checkpoints: Vec<CheckpointRecord> = self
            .db()
            .query(
                "SELECT * FROM checkpoint WHERE event_sequence > $seq ORDER BY event_sequence ASC",
            )
            .bind(("seq", sequence))
            .await
            .map_err(from_surrealdb_error)?
            .take(0)
            .map_err(from_surrealdb_error)?;

        Ok(checkpoints)
    }

    /// Delete old checkpoints, keeping only the most recent N.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    pub async fn prune_checkpoints(&self, keep_count: usize) -> PersistenceResult<u64> {
        // Get checkpoints to delete (skip first keep_count ordered by sequence DESC)
        let checkpoints: Vec<CheckpointRecord> = self
            .db()
            .query("SELECT * FROM checkpoint ORDER BY event_sequence DESC")
            .await
            .map_err(from_surrealdb_error)?
            .take(0)
            .map_err(from_surrealdb_error)?;

        // Skip the first keep_count records
        let to_delete: Vec<String> = checkpoints
            .into_iter()
            .skip(keep_count)
            .map(|cp| cp.checkpoint_id)
            .collect();

        let deleted_count = to_delete.len() as u64;

        // Delete each checkpoint by its ID
        for checkpoint_id in to_delete {
            let _: Option<CheckpointRecord> = self
                .db()
                .delete(("checkpoint", &checkpoint_id))
                .await
                .map_err(from_surrealdb_error)?;
        }

        Ok(deleted_count)
    }

    /// Delete a specific checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint is not found.
    pub async fn delete_checkpoint(&self, checkpoint_id: &str) -> PersistenceResult<()> {
        let result: Option<CheckpointRecord> = self
            .db()
            .delete(("checkpoint", checkpoint_id))
            .await
            .map_err(from_surrealdb_error)?;

        if result.is_some() {
            Ok(())
        } else {
            Err(PersistenceError::not_found("checkpoint", checkpoint_id))
        }
    }
}
