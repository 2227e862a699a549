//! Ripple collaborator contracts
//!
//! The engine never owns persistence. This crate defines the traits it
//! consumes:
//! - [`AttributeStore`] owns attribute identity and schema persistence
//! - [`RuleStore`] owns rule persistence with optimistic concurrency
//! - [`RuleCompiler`] regenerates a rule's derived executable form
//!
//! In-memory reference implementations back the engine's tests and are
//! embeddable by callers that do not need durable storage.

#![warn(unreachable_pub)]

pub mod attribute_store;
pub mod compiler;
pub mod error;
pub mod memory;
pub mod rule_store;

// Re-exports for convenience
pub use attribute_store::AttributeStore;
pub use compiler::{RuleCompiler, TextRuleCompiler};
pub use error::{CompileError, StoreError};
pub use memory::{MemoryAttributeStore, MemoryRuleStore};
pub use rule_store::RuleStore;
