//! Cursor-based tree builder.
//!
//! A [`Builder`] keeps a cursor into a tree under construction: `set`
//! replaces the node at the cursor (destroying what was there), `down`
//! moves into a child slot, `up` moves back toward the root. Call nodes
//! start with empty child slots; the built tree satisfies the validity
//! contract once every reachable slot has been filled, which
//! [`Builder::is_valid`] checks before the root is handed to an evaluator.

use crate::arena::NodeId;
use crate::env::Environment;
use crate::error::{SymbolError, TreeError, TreeResult};
use crate::symbol::SymbolId;
use crate::traverse::is_valid_subtree;
use crate::{Arity, Value};

/// Cursor position: the node and which argument slot of its parent it
/// occupies.
#[derive(Debug, Clone, Copy)]
struct Spot {
    id: NodeId,
    slot: Arity,
}

/// Incremental tree builder with a movable cursor.
#[derive(Debug)]
pub struct Builder {
    stack: Vec<Spot>,
    root: NodeId,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Create a builder with the cursor on an empty root.
    #[must_use]
    pub fn new() -> Builder {
        Builder { stack: vec![Spot { id: NodeId::EMPTY, slot: 0 }], root: NodeId::EMPTY }
    }

    /// The root handle built so far. Empty until the first `set`.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Release the built root. The builder does not destroy nodes on
    /// drop; ownership of the subtree passes to the caller.
    #[must_use]
    pub fn into_root(self) -> NodeId {
        self.root
    }

    /// Whether the built tree satisfies the validity contract (every
    /// reachable node non-empty).
    #[must_use]
    pub fn is_valid<C>(&self, env: &Environment<C>) -> bool {
        is_valid_subtree(env.arena(), self.root)
    }

    /// Replace the node at the cursor with one declared by the symbol
    /// named `name`, destroying the replaced subtree.
    ///
    /// # Errors
    ///
    /// Fails if no such symbol exists.
    pub fn set<C>(&mut self, env: &mut Environment<C>, name: &str) -> Result<(), SymbolError> {
        let symbol = env
            .symbol_id(name)
            .ok_or_else(|| SymbolError::NotFound(name.to_string()))?;
        self.set_symbol(env, symbol);
        Ok(())
    }

    /// Replace the node at the cursor with one declared by `symbol`,
    /// destroying the replaced subtree.
    pub fn set_symbol<C>(&mut self, env: &mut Environment<C>, symbol: SymbolId) {
        let id = env.make_id(symbol);
        self.set_id(env, id);
    }

    /// Replace the node at the cursor with an anonymous constant,
    /// destroying the replaced subtree.
    pub fn set_value<C>(&mut self, env: &mut Environment<C>, value: Value) {
        let id = env.make_const(value);
        self.set_id(env, id);
    }

    /// Move the cursor into the current node's `n`-th child slot.
    ///
    /// # Errors
    ///
    /// Fails if the cursor is on an empty node or `n` is not a valid slot.
    pub fn down<C>(&mut self, env: &Environment<C>, n: Arity) -> TreeResult<()> {
        let current = self.current();
        if current.is_empty() {
            return Err(TreeError::EmptyNode);
        }
        if n >= current.arity() {
            return Err(TreeError::ArgumentOutOfRange { arity: current.arity(), requested: n });
        }
        let child = env.arena().argument(current, n);
        self.stack.push(Spot { id: child, slot: n });
        Ok(())
    }

    /// Move the cursor `n` levels toward the root. Stops at the root.
    pub fn up(&mut self, n: usize) {
        for _ in 0..n {
            if self.stack.len() <= 1 {
                break;
            }
            self.stack.pop();
        }
    }

    fn current(&self) -> NodeId {
        match self.stack.last() {
            Some(spot) => spot.id,
            None => unreachable!("builder cursor stack is never empty"),
        }
    }

    fn set_id<C>(&mut self, env: &mut Environment<C>, id: NodeId) {
        let spot = match self.stack.last() {
            Some(spot) => *spot,
            None => unreachable!("builder cursor stack is never empty"),
        };
        if !spot.id.is_empty() {
            env.arena_mut().destroy_subtree(spot.id);
        }
        if self.stack.len() == 1 {
            self.root = id;
        } else {
            let parent = self.stack[self.stack.len() - 2].id;
            debug_assert!(!parent.is_empty());
            env.arena_mut().set_argument(parent, spot.slot, id);
        }
        match self.stack.last_mut() {
            Some(spot) => spot.id = id,
            None => unreachable!("builder cursor stack is never empty"),
        }
    }
}
