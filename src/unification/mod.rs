//! Unification over bank-tagged terms: substitutions, the mismatch
//! handler, and the abstracting unifier.

pub mod handler;
#[cfg(test)]
mod proptest_tests;
pub mod substitution;
pub mod unifier;

pub use handler::{Classification, MismatchHandler, UnificationConstraint};
pub use substitution::{Checkpoint, Substitution, TermSpec, VarBank, VarSpec};
pub use unifier::{AbstractingUnifier, ConstraintStore, UnifierCheckpoint};
