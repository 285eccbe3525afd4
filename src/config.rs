//! Abstraction policy configuration.

use serde::{Deserialize, Serialize};

/// Policy deciding which unification subproblems may be deferred as
/// residual disequality constraints instead of failing.
///
/// Mirrors the prover option of the same name:
/// - `Off`: pure Robinson unification, every mismatch is a failure
/// - `InterpOnly`: defer mismatches between two interpreted terms
/// - `OneInterp`: defer mismatches where at least one side is interpreted
/// - `FuncExt`: defer extensional mismatches on arrow-sorted heads
/// - `Ac1`: defer any residue under an AC symbol (over-approximates)
/// - `Ac2`: `Ac1` plus peeling of equal summand multisets before deferring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnificationWithAbstraction {
    Off,
    InterpOnly,
    OneInterp,
    FuncExt,
    Ac1,
    Ac2,
}

impl Default for UnificationWithAbstraction {
    fn default() -> Self {
        UnificationWithAbstraction::Off
    }
}

impl UnificationWithAbstraction {
    /// Whether this policy can defer anything at all.
    pub fn is_abstracting(self) -> bool {
        self != UnificationWithAbstraction::Off
    }

    /// Whether this policy treats `+` as an AC symbol.
    pub fn is_ac(self) -> bool {
        matches!(
            self,
            UnificationWithAbstraction::Ac1 | UnificationWithAbstraction::Ac2
        )
    }
}
