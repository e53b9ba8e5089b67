//! Structural errors for a mapping pass.
//!
//! Only upstream contract violations are errors; inference edge cases
//! (unresolved or ambiguous names, individual rule failures, malformed
//! records) are reported as [`crate::PassWarning`]s and never abort a pass.

use relmap_core::ElementId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    /// Two analyzer records claimed the same `(kind, qualified_name,
    /// location)` identity. This usually signals an analyzer bug, so it is
    /// surfaced instead of silently merged.
    #[error("duplicate element {id}: already defined at {existing}, redefined at {incoming}")]
    DuplicateElement {
        id: ElementId,
        existing: String,
        incoming: String,
    },

    /// The requested operation would violate a graph invariant, e.g. a
    /// confidence outside [0, 1] or an edge to an unknown element.
    #[error("graph invariant violated: {0}")]
    InvariantViolation(String),
}
