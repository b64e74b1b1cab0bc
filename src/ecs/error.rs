use thiserror::Error;

use super::EntityId;

/// A broken link between a pool's sparse, dense and owner arrays.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    #[error("{component}: {dense} components but {owners} owners")]
    LengthMismatch {
        component: &'static str,
        dense: usize,
        owners: usize,
    },
    #[error("{component}: slot {slot} is owned by {entity}, whose sparse entry is {found:?}")]
    BrokenBackReference {
        component: &'static str,
        slot: usize,
        entity: EntityId,
        found: Option<usize>,
    },
    #[error("{component}: sparse entry of {entity} points at slot {slot}, which it does not own")]
    DanglingSparse {
        component: &'static str,
        entity: EntityId,
        slot: usize,
    },
}
