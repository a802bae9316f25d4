#![no_main]

use libfuzzer_sys::fuzz_target;
use sylva::{ArenaStats, Environment, Parser, Value, render};

fn noop(_: &[Value], _: &mut ()) -> Value {
    0.0
}

fn pick(_: &[Value], _: &mut ()) -> usize {
    0
}

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let mut env: Environment = Environment::new();
    env.add_function("+", 2, noop).expect("registration");
    env.add_function("inc", 0, noop).expect("registration");
    env.add_select_function("sel", 2, 1, pick).expect("registration");
    env.add_positional("x", 0).expect("registration");
    env.add_constant("pi", 3.5).expect("registration");

    // The parser must never panic; failures surface as ParseError, and a
    // failed parse must not leak arena slots.
    match Parser::parse(&mut env, input) {
        Ok(root) => {
            // A successful parse yields a renderable tree that reparses to
            // the same canonical form.
            let rendered = render(&env, root).expect("parsed trees render");
            let reparsed = Parser::parse(&mut env, &rendered).expect("rendered trees reparse");
            let again = render(&env, reparsed).expect("parsed trees render");
            assert_eq!(rendered, again);
        }
        Err(_) => {
            assert_eq!(ArenaStats::collect(env.arena()).total_in_use(), 0);
        }
    }
});
