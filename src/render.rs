//! Textual rendering of subtrees as parenthesized prefix expressions.
//!
//! The output is the exact grammatical inverse of [`crate::Parser`]:
//! constants render their literal, other leaves their symbol name, calls
//! render as `(name arg0 ... argN)`. Parsing a rendered string yields a
//! structurally identical tree, and rendering a parsed canonical string
//! reproduces it exactly.

use crate::arena::{Kind, NodeId};
use crate::env::Environment;
use crate::error::SymbolError;

/// Render the subtree under `id`.
///
/// Empty handles render as `<empty>`, which is deliberately not
/// parseable: it marks holes of partially built trees in debug output.
///
/// # Errors
///
/// Fails if a node references an unregistered symbol.
pub fn render<C>(env: &Environment<C>, id: NodeId) -> Result<String, SymbolError> {
    let mut out = String::new();
    render_into(env, id, &mut out)?;
    Ok(out)
}

fn render_into<C>(env: &Environment<C>, id: NodeId, out: &mut String) -> Result<(), SymbolError> {
    if id.is_empty() {
        out.push_str("<empty>");
        return Ok(());
    }
    if id.kind() == Kind::Const {
        out.push_str(&env.arena().value(id).to_string());
        return Ok(());
    }
    let symbol = env.symbols().get(env.resolve(id)?);
    if symbol.is_callable() {
        out.push('(');
    }
    out.push_str(symbol.name());
    for n in 0..id.arity() {
        out.push(' ');
        render_into(env, env.arena().argument(id, n), out)?;
    }
    if symbol.is_callable() {
        out.push(')');
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;
    use crate::parser::Parser;

    fn noop(_: &[Value], _: &mut ()) -> Value {
        0.0
    }

    fn pick(_: &[Value], _: &mut ()) -> usize {
        0
    }

    fn test_env() -> Environment {
        let mut env = Environment::new();
        env.add_function("+", 2, noop).unwrap();
        env.add_function("*", 2, noop).unwrap();
        env.add_function("%", 2, noop).unwrap();
        env.add_function("inc", 0, noop).unwrap();
        env.add_select_function("sel", 2, 0, pick).unwrap();
        env.add_positional("a", 0).unwrap();
        env.add_positional("b", 1).unwrap();
        env.add_positional("c", 2).unwrap();
        env
    }

    #[test]
    fn test_roundtrip_canonical_strings() {
        let mut env = test_env();
        let cases = [
            "a",
            "3",
            "2.5",
            "(inc)",
            "(+ a b)",
            "(+ (* a b) (% c 1))",
            "(sel 1.5 (+ a (inc)))",
        ];
        for expr in cases {
            let root = Parser::parse(&mut env, expr).unwrap();
            assert_eq!(render(&env, root).unwrap(), expr);
        }
    }

    #[test]
    fn test_integer_valued_literal_renders_without_dot() {
        let mut env = test_env();
        let root = Parser::parse(&mut env, "(+ a 1.0)").unwrap();
        assert_eq!(render(&env, root).unwrap(), "(+ a 1)");
    }

    #[test]
    fn test_empty_slot_renders_placeholder() {
        let mut env = test_env();
        let plus = env.make_named("+").unwrap();
        assert_eq!(render(&env, plus).unwrap(), "(+ <empty> <empty>)");
        assert_eq!(render(&env, NodeId::EMPTY).unwrap(), "<empty>");
    }
}
