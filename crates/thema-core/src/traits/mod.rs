//! Collaborator capability contracts. Consumed by the engine, implemented
//! by ingestion/transport layers outside this workspace (and by stubs in
//! tests).

pub mod embedding;
pub mod judge;
pub mod llm;
pub mod report;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use judge::{
    Decision, Judge, MergeProposal, ReassignProposal, RepresentativeReview, SplitProposal,
    SummaryRequest, SummaryVerdict,
};
pub use llm::LlmClient;
pub use report::{BufferSink, ReportSink};
pub use vector_store::VectorStore;
