//! Error types shared across the crate.
//!
//! Contract violations (child access on a leaf, out-of-range child index,
//! operating on an empty handle) panic and are documented per function;
//! everything here covers the recoverable failures raised at API
//! boundaries.

use std::fmt;

use crate::{Arity, Cost, FunctionIndex, Kind, Position, SelectFunctionIndex};

/// Recoverable tree-level failures: range and lookup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// A node number beyond the available matching count was requested.
    NodeOutOfRange {
        /// The node number that was asked for.
        requested: usize,
    },
    /// A child cursor beyond the node's arity was requested.
    ArgumentOutOfRange {
        /// The node's actual arity.
        arity: Arity,
        /// The argument number that was asked for.
        requested: Arity,
    },
    /// A node replacement would change the arity of the slot.
    ArityMismatch {
        /// Arity of the node currently in the slot.
        expected: Arity,
        /// Arity of the replacement symbol.
        found: Arity,
    },
    /// No statistics are tracked for the requested pool.
    StatsItemNotFound {
        /// Requested node kind.
        kind: Kind,
        /// Requested arity.
        arity: Arity,
    },
    /// The operation needs a non-empty node.
    EmptyNode,
    /// Two trees share no common region under the given predicate.
    EmptyRegion,
    /// A symbol lookup or registration failed.
    Symbol(SymbolError),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::NodeOutOfRange { requested } => {
                write!(f, "node number {requested} is out of range")
            }
            TreeError::ArgumentOutOfRange { arity, requested } => {
                write!(f, "argument {requested} requested on a node of arity {arity}")
            }
            TreeError::ArityMismatch { expected, found } => {
                write!(f, "arity mismatch: slot holds arity {expected}, symbol has {found}")
            }
            TreeError::StatsItemNotFound { kind, arity } => {
                write!(f, "no statistics item for {kind} pool of arity {arity}")
            }
            TreeError::EmptyNode => write!(f, "operation on an empty node"),
            TreeError::EmptyRegion => write!(f, "trees share no common region"),
            TreeError::Symbol(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for TreeError {}

impl From<SymbolError> for TreeError {
    fn from(e: SymbolError) -> Self {
        TreeError::Symbol(e)
    }
}

/// Result type for tree-level operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Symbol table registration and lookup failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    /// A symbol with this name is already registered.
    Duplicate(String),
    /// A positional symbol with this parameter position is already registered.
    PositionTaken(Position),
    /// No symbol with this name exists.
    NotFound(String),
    /// No positional symbol covers this parameter position.
    PositionNotFound(Position),
    /// No function symbol is registered under this index.
    FunctionNotFound(FunctionIndex),
    /// No select symbol is registered under this index.
    SelectNotFound(SelectFunctionIndex),
    /// Constant nodes carry a literal, not a declaring symbol.
    ConstHasNoSymbol,
    /// The 8-bit callable index space is exhausted.
    TableFull,
}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolError::Duplicate(name) => write!(f, "symbol `{name}' already exists"),
            SymbolError::PositionTaken(p) => {
                write!(f, "positional with position {p} already exists")
            }
            SymbolError::NotFound(name) => write!(f, "symbol `{name}' not found"),
            SymbolError::PositionNotFound(p) => {
                write!(f, "positional with position {p} not found")
            }
            SymbolError::FunctionNotFound(i) => write!(f, "function with index {i} not found"),
            SymbolError::SelectNotFound(i) => {
                write!(f, "select function with index {i} not found")
            }
            SymbolError::ConstHasNoSymbol => {
                write!(f, "constant nodes have no declaring symbol")
            }
            SymbolError::TableFull => write!(f, "callable index space is exhausted"),
        }
    }
}

impl std::error::Error for SymbolError {}

/// Failures of the resumable execution engine.
///
/// A cost-limit breach is a hard stop of that evaluation, kept distinct
/// from ordinary errors so a scheduler can treat "ran too long" differently
/// from "is buggy".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExecError {
    /// The configured cost limit would be exceeded by the next dispatch.
    CostLimitExceeded {
        /// The configured limit.
        limit: Cost,
        /// Cost accounted before the dispatch that failed.
        used: Cost,
    },
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::CostLimitExceeded { limit, used } => {
                write!(f, "cost limit exceeded: {used} used of limit {limit}")
            }
        }
    }
}

impl std::error::Error for ExecError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = TreeError::NodeOutOfRange { requested: 9 };
        assert_eq!(e.to_string(), "node number 9 is out of range");

        let e = TreeError::Symbol(SymbolError::NotFound("x".to_string()));
        assert_eq!(e.to_string(), "symbol `x' not found");

        let e = ExecError::CostLimitExceeded { limit: 2.0, used: 1.5 };
        assert!(e.to_string().contains("cost limit exceeded"));
    }
}
