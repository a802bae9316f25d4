//! Per-pool allocation statistics, for tests and instrumentation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arena::{Arena, Kind, MAX_ARITY};
use crate::error::{TreeError, TreeResult};
use crate::Arity;

/// Slot counts of one (kind, arity) pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsItem {
    /// Node kind of the pool.
    pub kind: Kind,
    /// Arity of the pool (0 for leaf kinds).
    pub arity: Arity,
    /// Total slots ever allocated in the pool.
    pub allocated: usize,
    /// Slots currently on the free queue.
    pub free: usize,
}

impl StatsItem {
    /// Slots currently holding live nodes.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.allocated - self.free
    }
}

impl fmt::Display for StatsItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.kind)?;
        if matches!(self.kind, Kind::Function | Kind::Select) {
            write!(f, " {}", self.arity)?;
        }
        write!(f, "] {} slots, {} used, {} free", self.allocated, self.in_use(), self.free)
    }
}

/// Snapshot of every pool of an [`Arena`].
///
/// Snapshots compare by value, which is what tests use to assert that an
/// operation conserved or recycled allocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaStats {
    items: Vec<StatsItem>,
}

impl ArenaStats {
    /// Capture the current slot counts of every pool.
    #[must_use]
    pub fn collect(arena: &Arena) -> ArenaStats {
        let mut items = Vec::new();
        for kind in [Kind::Const, Kind::Positional] {
            let (allocated, free) = arena.pool_usage(kind, 0);
            items.push(StatsItem { kind, arity: 0, allocated, free });
        }
        for kind in [Kind::Function, Kind::Select] {
            for arity in 0..=MAX_ARITY {
                let (allocated, free) = arena.pool_usage(kind, arity);
                items.push(StatsItem { kind, arity, allocated, free });
            }
        }
        ArenaStats { items }
    }

    /// All pool snapshots.
    #[must_use]
    pub fn items(&self) -> &[StatsItem] {
        &self.items
    }

    /// The snapshot of one pool.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StatsItemNotFound`] for an arity beyond
    /// [`MAX_ARITY`].
    pub fn item(&self, kind: Kind, arity: Arity) -> TreeResult<StatsItem> {
        self.items
            .iter()
            .find(|item| item.kind == kind && item.arity == arity)
            .copied()
            .ok_or(TreeError::StatsItemNotFound { kind, arity })
    }

    /// Total slots currently holding live nodes, across all pools.
    #[must_use]
    pub fn total_in_use(&self) -> usize {
        self.items.iter().map(StatsItem::in_use).sum()
    }
}

impl fmt::Display for ArenaStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{item}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;
    use crate::env::Environment;
    use crate::parser::Parser;

    fn noop(_: &[Value], _: &mut ()) -> Value {
        0.0
    }

    fn test_env() -> Environment {
        let mut env = Environment::new();
        env.add_function("+", 2, noop).unwrap();
        env.add_positional("x", 0).unwrap();
        env
    }

    #[test]
    fn test_destroying_a_subtree_recycles_every_slot() {
        let mut env = test_env();
        let root = Parser::parse(&mut env, "(+ (+ x 1) x)").unwrap();
        let before = ArenaStats::collect(env.arena());
        assert_eq!(before.item(Kind::Function, 2).unwrap().in_use(), 2);
        assert_eq!(before.item(Kind::Positional, 0).unwrap().in_use(), 2);
        assert_eq!(before.item(Kind::Const, 0).unwrap().in_use(), 1);

        env.arena_mut().destroy_subtree(root);
        let after = ArenaStats::collect(env.arena());
        // Freeing recycles without shrinking the pools.
        assert_eq!(after.item(Kind::Function, 2).unwrap(), StatsItem {
            kind: Kind::Function,
            arity: 2,
            allocated: 2,
            free: 2,
        });
        assert_eq!(after.total_in_use(), 0);

        // The next allocation of the same shape reuses a freed slot.
        let reused = Parser::parse(&mut env, "(+ x x)").unwrap();
        let stats = ArenaStats::collect(env.arena());
        assert_eq!(stats.item(Kind::Function, 2).unwrap().allocated, 2);
        assert_eq!(stats.item(Kind::Function, 2).unwrap().free, 1);
        env.arena_mut().destroy_subtree(reused);
    }

    #[test]
    fn test_unknown_pool_is_an_error() {
        let env = test_env();
        let stats = ArenaStats::collect(env.arena());
        assert_eq!(
            stats.item(Kind::Function, MAX_ARITY + 1),
            Err(TreeError::StatsItemNotFound { kind: Kind::Function, arity: MAX_ARITY + 1 })
        );
    }

    #[test]
    fn test_display_format() {
        let env = test_env();
        let stats = ArenaStats::collect(env.arena());
        let text = stats.item(Kind::Const, 0).unwrap().to_string();
        assert_eq!(text, "[const] 0 slots, 0 used, 0 free");
    }
}
