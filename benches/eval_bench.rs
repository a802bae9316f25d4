//! Benchmarks comparing the recursive evaluator with the step machine.

#![allow(missing_docs)] // Benchmark macros generate undocumented functions
#![allow(clippy::unwrap_used)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use sylva::{Environment, Exec, Parser, Value, eval};

fn add(args: &[Value], _: &mut ()) -> Value {
    args[0] + args[1]
}

fn sub(args: &[Value], _: &mut ()) -> Value {
    args[0] - args[1]
}

fn mul(args: &[Value], _: &mut ()) -> Value {
    args[0] * args[1]
}

fn bench_env() -> Environment {
    let mut env = Environment::new();
    env.add_function("+", 2, add).unwrap();
    env.add_function("-", 2, sub).unwrap();
    env.add_function("*", 2, mul).unwrap();
    env.add_positional("a", 0).unwrap();
    env.add_positional("b", 1).unwrap();
    env
}

/// A balanced tree of the given depth over `+`, `-`, `*`.
fn deep_expr(depth: usize) -> String {
    if depth == 0 {
        return "a".to_string();
    }
    let child = deep_expr(depth - 1);
    let op = ["+", "-", "*"][depth % 3];
    format!("({op} {child} {child})")
}

fn bench_recursive_eval(c: &mut Criterion) {
    let mut env = bench_env();
    let root = Parser::parse(&mut env, &deep_expr(10)).unwrap();
    let params = [1.5, 2.5];

    c.bench_function("eval_depth10", |b| {
        b.iter(|| black_box(eval(&env, root, &params, &mut ())));
    });
}

fn bench_exec_machine(c: &mut Criterion) {
    let mut env = bench_env();
    let root = Parser::parse(&mut env, &deep_expr(10)).unwrap();

    c.bench_function("exec_depth10", |b| {
        let mut machine = Exec::new(&env, root);
        machine.init(vec![1.5, 2.5]);
        b.iter(|| {
            machine.restart();
            black_box(machine.run_to_completion(&mut ()).unwrap())
        });
    });
}

fn bench_parse(c: &mut Criterion) {
    let expr = deep_expr(8);

    c.bench_function("parse_depth8", |b| {
        b.iter(|| {
            let mut env = bench_env();
            black_box(Parser::parse(&mut env, &expr).unwrap())
        });
    });
}

criterion_group!(benches, bench_recursive_eval, bench_exec_machine, bench_parse);
criterion_main!(benches);
