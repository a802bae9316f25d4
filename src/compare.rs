//! Configurable node equivalence predicate for structural comparison.

use crate::arena::{Kind, NodeId};
use crate::env::Environment;

/// How arities are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArityMatch {
    /// Arities must be identical.
    #[default]
    Exact,
    /// Coarser: both terminal, or both nonterminal.
    Terminality,
}

/// Equivalence predicate over node pairs: an arity comparison combined
/// with an optional symbol-identity comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeCompare {
    /// Arity comparison mode.
    pub arity: ArityMatch,
    /// Also require both nodes to resolve to the same declaring symbol.
    /// Constants carry no symbol and compare by literal value instead.
    pub symbols: bool,
}

impl NodeCompare {
    /// Exact-arity comparison without symbol identity.
    #[must_use]
    pub fn by_arity() -> NodeCompare {
        NodeCompare::default()
    }

    /// Terminal-vs-nonterminal comparison without symbol identity.
    #[must_use]
    pub fn by_terminality() -> NodeCompare {
        NodeCompare { arity: ArityMatch::Terminality, symbols: false }
    }

    /// Whether the pair is equivalent under this predicate.
    #[must_use]
    pub fn equal<C>(&self, env: &Environment<C>, a: NodeId, b: NodeId) -> bool {
        self.match_arity(a, b) && self.match_symbols(env, a, b)
    }

    fn match_arity(&self, a: NodeId, b: NodeId) -> bool {
        match self.arity {
            ArityMatch::Exact => a.arity() == b.arity(),
            ArityMatch::Terminality => a.is_terminal() == b.is_terminal(),
        }
    }

    fn match_symbols<C>(&self, env: &Environment<C>, a: NodeId, b: NodeId) -> bool {
        if !self.symbols {
            return true;
        }
        if a.kind() == Kind::Const && b.kind() == Kind::Const {
            return env.arena().value(a) == env.arena().value(b);
        }
        match (env.resolve(a), env.resolve(b)) {
            (Ok(sa), Ok(sb)) => sa == sb,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    fn noop(_: &[Value], _: &mut ()) -> Value {
        0.0
    }

    fn test_env() -> Environment {
        let mut env = Environment::new();
        env.add_function("+", 2, noop).unwrap();
        env.add_function("neg", 1, noop).unwrap();
        env.add_positional("x", 0).unwrap();
        env.add_positional("y", 1).unwrap();
        env
    }

    #[test]
    fn test_exact_arity() {
        let mut env = test_env();
        let plus = env.make_named("+").unwrap();
        let neg = env.make_named("neg").unwrap();
        let x = env.make_named("x").unwrap();
        let y = env.make_named("y").unwrap();

        let compare = NodeCompare::by_arity();
        assert!(compare.equal(&env, x, y));
        assert!(!compare.equal(&env, plus, neg));
        assert!(!compare.equal(&env, plus, x));
    }

    #[test]
    fn test_terminality() {
        let mut env = test_env();
        let plus = env.make_named("+").unwrap();
        let neg = env.make_named("neg").unwrap();
        let x = env.make_named("x").unwrap();

        let compare = NodeCompare::by_terminality();
        assert!(compare.equal(&env, plus, neg));
        assert!(!compare.equal(&env, plus, x));
    }

    #[test]
    fn test_symbol_identity() {
        let mut env = test_env();
        let x1 = env.make_named("x").unwrap();
        let x2 = env.make_named("x").unwrap();
        let y = env.make_named("y").unwrap();

        let compare = NodeCompare { arity: ArityMatch::Exact, symbols: true };
        assert!(compare.equal(&env, x1, x2));
        assert!(!compare.equal(&env, x1, y));
    }

    #[test]
    fn test_constants_compare_by_value_under_symbol_identity() {
        let mut env = test_env();
        let one = env.make_const(1.0);
        let also_one = env.make_const(1.0);
        let two = env.make_const(2.0);
        let x = env.make_named("x").unwrap();

        let compare = NodeCompare { arity: ArityMatch::Exact, symbols: true };
        assert!(compare.equal(&env, one, also_one));
        assert!(!compare.equal(&env, one, two));
        assert!(!compare.equal(&env, one, x));
    }
}
