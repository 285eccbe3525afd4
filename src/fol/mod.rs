//! First-order (and rank-1 polymorphic / applicative higher-order) data
//! structures: signatures, hash-consed terms, literals.

pub mod literal;
pub mod signature;
pub mod term;

// Re-export commonly used types
pub use literal::{ClauseId, Literal};
pub use signature::{FunctionId, PredicateId, Signature, SortRule, Theory};
pub use term::{FlatView, TermData, TermId, TermStore, TypedTermList};
