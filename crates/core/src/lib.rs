//! # studentdesk core
//!
//! Domain types, collaborator traits, and error definitions for the
//! studentdesk response router. This crate has **no framework dependencies**:
//! it defines the domain model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator of the router is a trait here:
//! - [`Provider`] is the generation backend (free text or a function call)
//! - [`KnowledgeStore`] is the similarity search over FAQ and knowledge partitions
//! - [`FunctionDispatcher`] runs the fixed set of declared data functions
//!
//! Implementations live in their own crates, so the router can be built
//! against test doubles and production backends alike.

pub mod error;
pub mod function;
pub mod knowledge;
pub mod message;
pub mod provider;
pub mod routing;

// Re-export key types at crate root for ergonomics
pub use error::{DispatchError, Error, KnowledgeError, ProviderError, Result};
pub use function::{
    FunctionCall, FunctionDefinition, FunctionDispatcher, FunctionName, FunctionOutcome,
};
pub use knowledge::{
    KnowledgeRecord, KnowledgeStore, Partition, RetrievalMatch, SearchHit, StoredRecord,
    score_from_distance,
};
pub use message::{ConversationSession, Message, Role};
pub use provider::{
    Completion, EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse,
    Usage,
};
pub use routing::{ResponseSource, RoutingDecision};
