//! Recursive evaluator: a stateless tree walk over valid subtrees.
//!
//! The resumable engine in [`crate::exec`] implements identical semantics
//! on an explicit stack; [`argument_count`] is the single source of truth
//! both share for how many children must be ready before a node can act.

use crate::arena::{Kind, NodeId};
use crate::env::Environment;
use crate::tree::Tree;
use crate::{Arity, Value};

/// Evaluate the subtree under `id` against a parameter vector and a caller
/// context.
///
/// Select nodes evaluate only their first `selector_arity` children before
/// invoking the predicate. When the returned branch index refers to one of
/// those selector arguments, the already-computed value is the result and
/// the child is not evaluated again; otherwise the indexed child is
/// evaluated on demand.
///
/// # Panics
///
/// Panics on malformed trees that upstream validation should have
/// rejected: an empty handle, a parameter position at or beyond
/// `params.len()`, or a branch index at or beyond the node's arity.
pub fn eval<C>(env: &Environment<C>, id: NodeId, params: &[Value], ctx: &mut C) -> Value {
    assert!(!id.is_empty(), "cannot evaluate an empty handle");
    let arena = env.arena();
    match id.kind() {
        Kind::Const => arena.value(id),
        Kind::Positional => {
            let position = usize::from(arena.position(id));
            assert!(
                position < params.len(),
                "parameter position {position} out of range for {} parameters",
                params.len()
            );
            params[position]
        }
        Kind::Function => {
            let mut args = Vec::with_capacity(usize::from(id.arity()));
            for n in 0..id.arity() {
                args.push(eval(env, arena.argument(id, n), params, ctx));
            }
            env.invoke_function(arena.fid(id), &args, ctx)
        }
        Kind::Select => {
            let sfid = arena.sfid(id);
            let selector_arity = env.selector_arity(sfid);
            let mut args = Vec::with_capacity(usize::from(selector_arity));
            for n in 0..selector_arity {
                args.push(eval(env, arena.argument(id, n), params, ctx));
            }
            let branch = env.invoke_select(sfid, &args, ctx);
            if branch < usize::from(selector_arity) {
                // The branch is one of the selector arguments, already
                // evaluated above.
                args[branch]
            } else {
                assert!(
                    branch < usize::from(id.arity()),
                    "select branch {branch} out of range for arity {}",
                    id.arity()
                );
                eval(env, arena.argument(id, branch as Arity), params, ctx)
            }
        }
    }
}

/// Evaluate a whole tree. Convenience wrapper over [`eval`].
pub fn eval_tree<C>(env: &Environment<C>, tree: &Tree, params: &[Value], ctx: &mut C) -> Value {
    eval(env, tree.root(), params, ctx)
}

/// How many children of `id` must be evaluated before the node can act:
/// 0 for leaves, the full arity for functions, and the selector arity for
/// select nodes.
#[must_use]
pub fn argument_count<C>(env: &Environment<C>, id: NodeId) -> Arity {
    match id.kind() {
        Kind::Const | Kind::Positional => 0,
        Kind::Function => id.arity(),
        Kind::Select => env.selector_arity(env.arena().sfid(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn sum(args: &[Value], _: &mut u32) -> Value {
        args.iter().sum()
    }

    fn mul(args: &[Value], _: &mut u32) -> Value {
        args.iter().product()
    }

    /// Increments the context counter on every call.
    fn counting(args: &[Value], calls: &mut u32) -> Value {
        *calls += 1;
        args.first().copied().unwrap_or(0.0)
    }

    /// Selects the branch named by its first selector argument.
    fn branch_by_value(args: &[Value], _: &mut u32) -> usize {
        args[0] as usize
    }

    fn test_env() -> Environment<u32> {
        let mut env = Environment::new();
        env.add_function("+", 2, sum).unwrap();
        env.add_function("*", 2, mul).unwrap();
        env.add_function("probe", 1, counting).unwrap();
        env.add_select_function("choose", 4, 2, branch_by_value).unwrap();
        env.add_positional("x", 0).unwrap();
        env.add_positional("y", 1).unwrap();
        env
    }

    #[test]
    fn test_eval_addition() {
        let mut env = test_env();
        let root = Parser::parse(&mut env, "(+ x x)").unwrap();
        assert_eq!(eval(&env, root, &[2.0], &mut 0), 4.0);
    }

    #[test]
    fn test_eval_nested() {
        let mut env = test_env();
        let root = Parser::parse(&mut env, "(+ (* x 3) (+ y 1))").unwrap();
        assert_eq!(eval(&env, root, &[2.0, 10.0], &mut 0), 17.0);
    }

    #[test]
    fn test_eval_constant_and_positional() {
        let mut env = test_env();
        let c = env.make_const(5.5);
        assert_eq!(eval(&env, c, &[], &mut 0), 5.5);
        let x = env.make_named("x").unwrap();
        assert_eq!(eval(&env, x, &[7.0], &mut 0), 7.0);
    }

    #[test]
    fn test_select_short_circuit_keeps_selector_value() {
        let mut env = test_env();
        // Branch index 1 names the second selector argument: its value is
        // reused, and the probe wrapped around it must run exactly once.
        let root = Parser::parse(&mut env, "(choose 1 (probe 9) x y)").unwrap();
        let mut calls = 0;
        assert_eq!(eval(&env, root, &[0.0, 0.0], &mut calls), 9.0);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_select_evaluates_nonselector_branch_on_demand() {
        let mut env = test_env();
        // Branch index 3 is past the selector arity, so child 3 is
        // evaluated; the probe in the unselected child 2 must not run.
        let root = Parser::parse(&mut env, "(choose 3 0 (probe 9) (+ x 1))").unwrap();
        let mut calls = 0;
        assert_eq!(eval(&env, root, &[41.0], &mut calls), 42.0);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_argument_count_by_kind() {
        let mut env = test_env();
        let c = env.make_const(0.0);
        let x = env.make_named("x").unwrap();
        let plus = env.make_named("+").unwrap();
        let choose = env.make_named("choose").unwrap();
        assert_eq!(argument_count(&env, c), 0);
        assert_eq!(argument_count(&env, x), 0);
        assert_eq!(argument_count(&env, plus), 2);
        assert_eq!(argument_count(&env, choose), 2);
    }

    #[test]
    #[should_panic(expected = "parameter position")]
    fn test_positional_out_of_range_panics() {
        let mut env = test_env();
        let x = env.make_named("y").unwrap();
        let _ = eval(&env, x, &[1.0], &mut 0);
    }

    #[test]
    #[should_panic(expected = "empty")]
    fn test_eval_empty_panics() {
        let env = test_env();
        let _ = eval(&env, NodeId::EMPTY, &[], &mut 0);
    }
}
