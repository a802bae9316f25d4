//! CLI command implementations for the `sylva` binary.

// Allow print in the CLI module
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::error::Error;
use std::fmt;

use clap::ValueEnum;

use sylva::{
    ArenaStats, ArityMatch, Environment, Exec, NodeCompare, ParseError, Parser, SymbolError, Tree,
    Value, common_region, eval, render,
};

/// Output format for the `describe` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<ParseError> for CliError {
    fn from(e: ParseError) -> Self {
        Self::new(format!("parse error: {e}"))
    }
}

fn add(args: &[Value], _: &mut ()) -> Value {
    args[0] + args[1]
}

fn sub(args: &[Value], _: &mut ()) -> Value {
    args[0] - args[1]
}

fn mul(args: &[Value], _: &mut ()) -> Value {
    args[0] * args[1]
}

/// Protected division: division by zero yields zero.
fn div(args: &[Value], _: &mut ()) -> Value {
    if args[1] == 0.0 { 0.0 } else { args[0] / args[1] }
}

/// Protected remainder: a zero divisor yields zero.
fn rem(args: &[Value], _: &mut ()) -> Value {
    if args[1] == 0.0 { 0.0 } else { args[0] % args[1] }
}

fn min(args: &[Value], _: &mut ()) -> Value {
    args[0].min(args[1])
}

fn max(args: &[Value], _: &mut ()) -> Value {
    args[0].max(args[1])
}

/// `(if< a b then else)`: picks child 2 when `a < b`, child 3 otherwise.
fn if_less(args: &[Value], _: &mut ()) -> usize {
    if args[0] < args[1] { 2 } else { 3 }
}

/// The arithmetic environment the CLI evaluates against: protected binary
/// operators, an `if<` select, and positionals `a`..`f`.
pub(crate) fn default_environment() -> Environment {
    let mut env = Environment::new();
    let result: Result<(), SymbolError> = (|| {
        env.add_function("+", 2, add)?;
        env.add_function("-", 2, sub)?;
        env.add_function("*", 2, mul)?;
        env.add_function("/", 2, div)?;
        env.add_function("%", 2, rem)?;
        env.add_function("min", 2, min)?;
        env.add_function("max", 2, max)?;
        env.add_select_function("if<", 4, 2, if_less)?;
        for (position, name) in ["a", "b", "c", "d", "e", "f"].iter().enumerate() {
            env.add_positional(name, position as u8)?;
        }
        for name in ["+", "-", "*", "/", "%", "min", "max", "if<"] {
            env.set_cost(name, 1.0)?;
        }
        Ok(())
    })();
    match result {
        Ok(()) => env,
        Err(e) => unreachable!("default environment registration failed: {e}"),
    }
}

fn parse_params(params: Option<&str>) -> Result<Vec<Value>, CliError> {
    let Some(params) = params else {
        return Ok(Vec::new());
    };
    params
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Value>().map_err(|_| CliError::new(format!("invalid parameter `{s}'")))
        })
        .collect()
}

/// Execute the `eval` command.
pub(crate) fn eval_command(
    expr: &str,
    params: Option<&str>,
    cost_limit: Option<f64>,
    trace: bool,
) -> Result<(), CliError> {
    let mut env = default_environment();
    let params = parse_params(params)?;
    let root = Parser::parse(&mut env, expr)?;

    if trace || cost_limit.is_some() {
        let mut exec = Exec::new(&env, root);
        exec.init(params);
        if let Some(limit) = cost_limit {
            exec.set_cost_limit(limit);
        }
        while !exec.is_finished() {
            if trace {
                println!("step trace:");
                print!("{}", exec.backtrace());
            }
            exec.step(&mut ()).map_err(|e| CliError::new(e.to_string()))?;
        }
        match exec.result() {
            Some(result) => println!("{result}"),
            None => return Err(CliError::new("evaluation produced no result")),
        }
        if trace {
            println!("cost used: {}", exec.cost_used());
        }
    } else {
        let result = eval(&env, root, &params, &mut ());
        println!("{result}");
    }
    Ok(())
}

/// Execute the `describe` command.
pub(crate) fn describe_command(expr: &str, format: OutputFormat) -> Result<(), CliError> {
    let mut env = default_environment();
    let root = Parser::parse(&mut env, expr)?;
    let tree = Tree::new(root);
    let description = tree.describe(&env);
    let width = tree.width(&env);
    let rendered = tree.render(&env).map_err(|e| CliError::new(e.to_string()))?;
    let stats = ArenaStats::collect(env.arena());

    match format {
        OutputFormat::Text => {
            println!("expression:   {rendered}");
            println!("size:         {}", description.size);
            println!("depth:        {}", description.depth);
            println!("terminals:    {}", description.term_count);
            println!("nonterminals: {}", description.nonterm_count);
            println!("width:        {width}");
            println!("pools:");
            for item in stats.items().iter().filter(|item| item.allocated > 0) {
                println!("  {item}");
            }
        }
        OutputFormat::Json => {
            let pools: Vec<_> =
                stats.items().iter().filter(|item| item.allocated > 0).collect();
            let report = serde_json::json!({
                "expression": rendered,
                "size": description.size,
                "depth": description.depth,
                "terminals": description.term_count,
                "nonterminals": description.nonterm_count,
                "width": width,
                "pools": pools,
            });
            match serde_json::to_string_pretty(&report) {
                Ok(text) => println!("{text}"),
                Err(e) => return Err(CliError::new(e.to_string())),
            }
        }
    }
    Ok(())
}

/// Execute the `region` command.
pub(crate) fn region_command(
    expr1: &str,
    expr2: &str,
    terminality: bool,
    symbols: bool,
) -> Result<(), CliError> {
    let mut env = default_environment();
    let root1 = Parser::parse(&mut env, expr1)?;
    let root2 = Parser::parse(&mut env, expr2)?;

    let compare = NodeCompare {
        arity: if terminality { ArityMatch::Terminality } else { ArityMatch::Exact },
        symbols,
    };
    let region = common_region(&env, root1, root2, &compare);

    println!(
        "{} matched pairs ({} terminal, {} nonterminal)",
        region.len(),
        region.terminal_count(),
        region.nonterminal_count()
    );
    for item in &region {
        let left = render(&env, item.id1).map_err(|e| CliError::new(e.to_string()))?;
        let right = render(&env, item.id2).map_err(|e| CliError::new(e.to_string()))?;
        println!("#{:<3} {left}  |  {right}", item.seq);
    }
    Ok(())
}
