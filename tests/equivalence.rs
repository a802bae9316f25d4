//! Differential tests: the resumable execution engine must agree with the
//! recursive evaluator on every valid tree.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::float_cmp)]

use proptest::prelude::*;

use sylva::{Environment, Exec, Parser, Value, eval, exec};

fn add(args: &[Value], _: &mut ()) -> Value {
    args[0] + args[1]
}

fn sub(args: &[Value], _: &mut ()) -> Value {
    args[0] - args[1]
}

fn mul(args: &[Value], _: &mut ()) -> Value {
    args[0] * args[1]
}

fn rem(args: &[Value], _: &mut ()) -> Value {
    if args[1] == 0.0 { 0.0 } else { args[0] % args[1] }
}

fn if_less(args: &[Value], _: &mut ()) -> usize {
    if args[0] < args[1] { 2 } else { 3 }
}

fn test_env() -> Environment {
    let mut env = Environment::new();
    env.add_function("+", 2, add).unwrap();
    env.add_function("-", 2, sub).unwrap();
    env.add_function("*", 2, mul).unwrap();
    env.add_function("%", 2, rem).unwrap();
    env.add_select_function("if<", 4, 2, if_less).unwrap();
    for (position, name) in ["a", "b", "c", "d", "e", "f"].iter().enumerate() {
        env.add_positional(name, position as u8).unwrap();
    }
    env
}

fn expr_strategy() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        prop::sample::select(&["a", "b", "c", "d", "e", "f"][..]).prop_map(str::to_string),
        (0u32..1000).prop_map(|n| n.to_string()),
    ];
    leaf.prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            4 => (prop::sample::select(&["+", "-", "*", "%"][..]), inner.clone(), inner.clone())
                .prop_map(|(op, lhs, rhs)| format!("({op} {lhs} {rhs})")),
            1 => (inner.clone(), inner.clone(), inner.clone(), inner)
                .prop_map(|(s1, s2, t, e)| format!("(if< {s1} {s2} {t} {e})")),
        ]
    })
}

fn params_strategy() -> impl Strategy<Value = Vec<Value>> {
    proptest::collection::vec(-100.0f64..100.0, 6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Running the execution engine to completion yields the same value
    /// as the recursive evaluator, for any tree and parameter vector.
    #[test]
    fn prop_exec_matches_eval(expr in expr_strategy(), params in params_strategy()) {
        let mut env = test_env();
        let root = Parser::parse(&mut env, &expr).unwrap();

        let expected = eval(&env, root, &params, &mut ());

        let mut machine = Exec::new(&env, root);
        machine.init(params);
        let actual = machine.run_to_completion(&mut ()).unwrap();
        prop_assert_eq!(actual, expected);
    }

    /// Stopping after every function dispatch must not change the result.
    #[test]
    fn prop_stepped_execution_matches_eval(expr in expr_strategy(), params in params_strategy()) {
        let mut env = test_env();
        let root = Parser::parse(&mut env, &expr).unwrap();

        let expected = eval(&env, root, &params, &mut ());

        let mut machine = Exec::new(&env, root);
        machine.init(params);
        machine.set_flag(exec::RUN_LOOP | exec::STOP_ON_FUNCTION | exec::STOP_ON_SELECT);
        while !machine.is_finished() {
            machine.run(&mut ()).unwrap();
        }
        prop_assert_eq!(machine.result(), Some(expected));
    }

    /// Restarting and re-running is idempotent.
    #[test]
    fn prop_restart_reproduces_result(expr in expr_strategy(), params in params_strategy()) {
        let mut env = test_env();
        let root = Parser::parse(&mut env, &expr).unwrap();

        let mut machine = Exec::new(&env, root);
        machine.init(params);
        let first = machine.run_to_completion(&mut ()).unwrap();
        machine.restart();
        let second = machine.run_to_completion(&mut ()).unwrap();
        prop_assert_eq!(first, second);
    }
}

#[test]
fn test_interleaved_machines_are_independent() {
    let mut env = test_env();
    let root1 = Parser::parse(&mut env, "(+ (* a 2) b)").unwrap();
    let root2 = Parser::parse(&mut env, "(- (% a 7) (+ b 1))").unwrap();
    let params = vec![9.0, 4.0];

    let expected1 = eval(&env, root1, &params, &mut ());
    let expected2 = eval(&env, root2, &params, &mut ());

    // Round-robin stepping of two machines over one environment.
    let mut m1 = Exec::new(&env, root1);
    let mut m2 = Exec::new(&env, root2);
    m1.init(params.clone());
    m2.init(params);
    while !m1.is_finished() || !m2.is_finished() {
        if !m1.is_finished() {
            m1.step(&mut ()).unwrap();
        }
        if !m2.is_finished() {
            m2.step(&mut ()).unwrap();
        }
    }
    assert_eq!(m1.result(), Some(expected1));
    assert_eq!(m2.result(), Some(expected2));
}
