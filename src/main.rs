//! Sylva CLI - parse, inspect and evaluate expression trees from the
//! command line.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

/// Sylva - arena-backed expression trees for genetic programming
#[derive(Parser, Debug)]
#[command(name = "sylva")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse an expression and evaluate it
    Eval {
        /// Expression in prefix form, e.g. "(+ a (* b 2))"
        expr: String,

        /// Comma-separated parameter values bound to a,b,c,...
        #[arg(short, long)]
        params: Option<String>,

        /// Fail with a distinct error when the accounted cost would
        /// exceed this limit (values <= 0 mean unlimited)
        #[arg(short, long)]
        cost_limit: Option<f64>,

        /// Step the resumable engine, printing a backtrace per step
        #[arg(short, long)]
        trace: bool,
    },

    /// Parse an expression and report its structural statistics
    Describe {
        /// Expression in prefix form
        expr: String,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Report the common region of two expressions
    Region {
        /// First expression
        expr1: String,

        /// Second expression
        expr2: String,

        /// Compare terminal-vs-nonterminal instead of exact arity
        #[arg(short, long)]
        terminality: bool,

        /// Additionally require symbol identity
        #[arg(short, long)]
        symbols: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let result = match args.command {
        Commands::Eval { expr, params, cost_limit, trace } => {
            cli::eval_command(&expr, params.as_deref(), cost_limit, trace)
        }
        Commands::Describe { expr, format } => cli::describe_command(&expr, format),
        Commands::Region { expr1, expr2, terminality, symbols } => {
            cli::region_command(&expr1, &expr2, terminality, symbols)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
