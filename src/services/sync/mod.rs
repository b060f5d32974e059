// Sync module
// Optimistic local edits with debounced, serialized background commits

pub mod cache;
pub mod engine;
pub mod mutator;

pub use cache::{CollectionCache, RevalidationReport};
pub use engine::{SyncEngine, SyncNotice, Waker};
pub use mutator::{CommitOp, CommitOutcome, CommitRequest, MutationEvent, MutationStatus, OptimisticMutator};
