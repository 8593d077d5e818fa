pub mod group;
pub mod pool;
pub mod refinement_state;

pub use group::{Group, GroupId, GroupSummary, Provenance, Relevance};
pub use pool::UnclusteredPool;
pub use refinement_state::{AppliedOp, RefinementState, Termination};
