//! Semantic analysis: field resolution and the typing pass

pub mod provider;
pub mod typing;

pub use provider::{FieldTypeProvider, LookupTarget, ResolvedField, UnresolvedField};
pub use typing::TypingPass;
