//! Error types for termatlas

use crate::fol::FunctionId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TermError {
    #[error("arity mismatch for functor {functor:?}: declared {declared}, got {got}")]
    ArityMismatch {
        functor: FunctionId,
        declared: usize,
        got: usize,
    },

    #[error("first argument of an application must have an arrow sort")]
    NotAFunction,
}

pub type Result<T> = std::result::Result<T, TermError>;
