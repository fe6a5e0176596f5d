//! Tests for merge queue and conflict resolution.
//!
//! Validates parallel task merging, conflict detection, and queue operations.

use oya_core::{Error, Result};

#[test]
fn test_queue_module_exists() {
    let _ = oya_merge_queue::Queue::new();
}

#[test]
fn test_conflict_module_exists() {
    let _ = oya_merge_queue::Conflict::new();
}
