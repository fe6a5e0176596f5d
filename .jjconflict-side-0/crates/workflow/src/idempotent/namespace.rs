//! UUID v5 namespace generation from bead IDs.
//!
//! This module provides deterministic namespace generation for UUID v5 based idempotency keys.
//! All namespaces are derived from the DNS namespace to ensure global uniqueness and
//! determinism across systems.
//!
//! # Examples
//!
//! ```
//! use oya_workflow::idempotent::namespace::namespace_from_bead;
//!
//! let namespace1 = namespace_from_bead("bead-123");
//! let namespace2 = namespace_from_bead("bead-123");
//! assert_eq!(namespace1, namespace2); // Deterministic
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]

use uuid::Uuid;

/// Generates a deterministic UUID v5 namespace from a bead ID.
///
/// This function creates a unique namespace for each bead ID by hashing the bead ID
/// using UUID v5 with the DNS namespace as the base. The same bead ID will always
/// produce the same namespace UUID, ensuring idempotency across different executions
/// and systems.
///
/// # Examples
///
/// ```
/// use oya_workflow::idempotent::namespace::namespace_from_bead;
///
/// let namespace = namespace_from_bead("bead-abc-123");
/// // Same input always produces same output
/// assert_eq!(
///     namespace_from_bead("bead-abc-123"),
///     namespace
/// );
/// ```
///
/// # Implementation Details
///
/// - Base namespace: `Uuid::NAMESPACE_DNS` (RFC 4122 DNS namespace)
/// - Hash algorithm: SHA-1 (as specified by UUID v5)
/// - Input: `bead_id` as UTF-8 bytes
/// - Output: Deterministic UUID v5
///
/// # Determinism Guarantee
///
/// This function is **pure** and **deterministic**:
/// - Same `bead_id` â†’ Same namespace UUID
/// - No side effects
/// - No randomness
/// - Thread-safe
#[must_use]
pub fn namespace_from_bead(bead_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, bead_id.as_bytes())
}
