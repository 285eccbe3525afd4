//! Retrieval indices over the substitution tree.

pub mod literal_index;
pub mod substitution_tree;
pub mod term_index;

pub use literal_index::LiteralSubstitutionTree;
pub use substitution_tree::{LeafData, QueryResult, SubstitutionTree, TreeQuery};
pub use term_index::TermSubstitutionTree;
