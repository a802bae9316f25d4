//! Hand-written state-machine parser for parenthesized prefix expressions.
//!
//! The grammar is the exact inverse of [`crate::render`]: leaves are
//! symbol names or numeric literals, calls are `(name arg0 ... argN)`.
//! The parser consumes one character at a time, builds nodes in the
//! environment's arena as it goes, and reports failures as a
//! [`ParseError`] with line and column — parse failures never surface as
//! panics.

use std::fmt;

use crate::arena::NodeId;
use crate::env::Environment;
use crate::symbol::SymbolId;
use crate::Value;

/// What went wrong during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The input contained no expression.
    Empty,
    /// The input ended in the middle of an expression.
    UnexpectedEnd,
    /// A character outside the identifier, digit and space alphabets.
    InvalidChar(char),
    /// `(` where no expression may start.
    UnexpectedLeftParen,
    /// `)` without an open call.
    UnexpectedRightParen,
    /// A digit where a callable symbol is required.
    UnexpectedNumber,
    /// A non-digit inside a numeric literal.
    UnexpectedNonNumber,
    /// An identifier that names no registered symbol.
    SymbolNotFound(String),
    /// A variable name in callable position.
    UnexpectedVariable(String),
    /// A callable name in variable position.
    UnexpectedCallable(String),
    /// A call received more arguments than its symbol's arity.
    TooManyArguments,
    /// A call closed before all its arguments were supplied.
    NotEnoughArguments,
    /// A numeric literal that does not parse.
    InvalidNumber(String),
    /// A numeric literal outside the value range.
    NumberOutOfRange(String),
    /// A second dot inside a numeric literal.
    UnexpectedDot,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::Empty => write!(f, "empty input"),
            ParseErrorKind::UnexpectedEnd => write!(f, "unexpected end of input"),
            ParseErrorKind::InvalidChar(c) => write!(f, "invalid character `{c}'"),
            ParseErrorKind::UnexpectedLeftParen => write!(f, "unexpected `('"),
            ParseErrorKind::UnexpectedRightParen => write!(f, "unexpected `)'"),
            ParseErrorKind::UnexpectedNumber => write!(f, "unexpected number"),
            ParseErrorKind::UnexpectedNonNumber => {
                write!(f, "unexpected non-numeric character")
            }
            ParseErrorKind::SymbolNotFound(name) => write!(f, "symbol `{name}' not found"),
            ParseErrorKind::UnexpectedVariable(name) => {
                write!(f, "unexpected variable `{name}'")
            }
            ParseErrorKind::UnexpectedCallable(name) => {
                write!(f, "unexpected callable `{name}'")
            }
            ParseErrorKind::TooManyArguments => write!(f, "too many arguments"),
            ParseErrorKind::NotEnoughArguments => write!(f, "not enough arguments"),
            ParseErrorKind::InvalidNumber(s) => write!(f, "invalid number `{s}'"),
            ParseErrorKind::NumberOutOfRange(s) => write!(f, "number `{s}' is out of range"),
            ParseErrorKind::UnexpectedDot => write!(f, "unexpected dot"),
        }
    }
}

/// A parse failure with its position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// What went wrong.
    pub kind: ParseErrorKind,
    /// State the parser was in when the failure was recorded.
    pub state: ParserState,
    /// 1-based line of the offending character.
    pub line: usize,
    /// 1-based column of the offending character.
    pub column: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at line {}, column {}", self.kind, self.line, self.column)
    }
}

impl std::error::Error for ParseError {}

/// Parser states, visible for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    /// Waiting for the start of an expression.
    #[default]
    Ready,
    /// After `(`: a callable symbol must follow.
    ExpectCallable,
    /// Reading a variable (non-callable) identifier.
    VariableSymbol,
    /// Reading a callable identifier.
    CallableSymbol,
    /// Between the arguments of an open call.
    CallableArguments,
    /// Reading a numeric literal.
    Number,
    /// A complete expression has been parsed.
    Done,
    /// A parse error occurred; further input is ignored.
    Error,
}

/// An open call being filled: the node and how many of its child slots
/// have been attached so far.
struct OpenCall {
    id: NodeId,
    filled: u8,
}

/// Character-fed S-expression parser.
///
/// Feed characters with [`Parser::consume`], or use [`Parser::parse`] for
/// whole strings. After a failure, [`Parser::reset`] destroys the
/// partially built nodes so the arena's pools return to their prior state.
pub struct Parser {
    state: ParserState,
    stack: Vec<OpenCall>,
    buffer: String,
    root: NodeId,
    error: Option<ParseErrorKind>,
    line: usize,
    column: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a parser in the ready state.
    #[must_use]
    pub fn new() -> Parser {
        Parser {
            state: ParserState::Ready,
            stack: Vec::new(),
            buffer: String::new(),
            root: NodeId::EMPTY,
            error: None,
            line: 1,
            column: 0,
        }
    }

    /// Parse a whole string into a validated root handle.
    ///
    /// On failure the partially built nodes are destroyed before the error
    /// is returned, so failed parses do not leak arena slots.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] carrying the failure kind and position.
    pub fn parse<C>(env: &mut Environment<C>, input: &str) -> Result<NodeId, ParseError> {
        let mut parser = Parser::new();
        for ch in input.chars() {
            parser.consume(env, ch);
            if parser.is_error() {
                break;
            }
        }
        parser.finish(env);
        if parser.is_done() {
            Ok(parser.take_result())
        } else {
            let error = ParseError {
                kind: parser.error.clone().unwrap_or(ParseErrorKind::UnexpectedEnd),
                state: parser.state,
                line: parser.line,
                column: parser.column,
            };
            parser.reset(env);
            Err(error)
        }
    }

    /// Feed one character. Input after an error is ignored until
    /// [`Parser::reset`]; input after a completed expression restarts the
    /// parser on a new expression (the previous result is dropped from the
    /// parser but its nodes stay alive).
    pub fn consume<C>(&mut self, env: &mut Environment<C>, ch: char) {
        match self.state {
            ParserState::Error => return,
            ParserState::Done if ch.is_whitespace() => {
                // Trailing whitespace after a complete expression.
                self.count(ch);
                return;
            }
            ParserState::Done => {
                // A new expression starts; an untaken previous result is
                // torn down rather than leaked in the arena.
                env.arena_mut().destroy_subtree(self.root);
                self.root = NodeId::EMPTY;
                self.state = ParserState::Ready;
            }
            _ => {}
        }

        self.count(ch);

        match ch {
            c if c.is_whitespace() => self.on_space(env),
            '(' => self.on_paren_left(),
            ')' => self.on_paren_right(env),
            c if c.is_ascii_digit() => self.on_digit(c),
            '.' => self.on_dot(),
            c if is_ident_char(c) => self.on_ident(c),
            c => self.set_error(ParseErrorKind::InvalidChar(c)),
        }
    }

    /// Complete parsing at end of input: closes a trailing variable or
    /// number, or records why the expression is incomplete.
    pub fn finish<C>(&mut self, env: &mut Environment<C>) {
        match self.state {
            ParserState::VariableSymbol => {
                self.complete_variable(env);
                if self.state != ParserState::Done && self.error.is_none() {
                    self.set_error(ParseErrorKind::UnexpectedEnd);
                }
            }
            ParserState::Number => {
                self.complete_number(env);
                if self.state != ParserState::Done && self.error.is_none() {
                    self.set_error(ParseErrorKind::UnexpectedEnd);
                }
            }
            ParserState::Ready => self.set_error(ParseErrorKind::Empty),
            ParserState::ExpectCallable
            | ParserState::CallableSymbol
            | ParserState::CallableArguments => self.set_error(ParseErrorKind::UnexpectedEnd),
            ParserState::Done | ParserState::Error => {}
        }
    }

    /// Whether a complete expression has been parsed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == ParserState::Done
    }

    /// Whether the parser is in the error state.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.state == ParserState::Error
    }

    /// Whether the parser is waiting for the start of an expression.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == ParserState::Ready
    }

    /// Current state, for diagnostics.
    #[must_use]
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// The recorded failure kind, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ParseErrorKind> {
        self.error.as_ref()
    }

    /// 1-based line of the last consumed character.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column of the last consumed character.
    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    /// Move the parsed root out of the parser, leaving it ready.
    #[must_use]
    pub fn take_result(&mut self) -> NodeId {
        let root = self.root;
        self.root = NodeId::EMPTY;
        self.state = ParserState::Ready;
        root
    }

    /// Destroy all partially built nodes and return to the ready state.
    /// After a failed parse this returns the affected pools to their
    /// prior free counts.
    pub fn reset<C>(&mut self, env: &mut Environment<C>) {
        while let Some(open) = self.stack.pop() {
            for n in 0..open.filled {
                let child = env.arena().argument(open.id, n);
                env.arena_mut().destroy_subtree(child);
            }
            env.arena_mut().destroy(open.id);
        }
        if !self.root.is_empty() {
            env.arena_mut().destroy_subtree(self.root);
            self.root = NodeId::EMPTY;
        }
        self.buffer.clear();
        self.state = ParserState::Ready;
        self.error = None;
        self.line = 1;
        self.column = 0;
    }

    fn count(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }

    fn on_space<C>(&mut self, env: &mut Environment<C>) {
        match self.state {
            ParserState::VariableSymbol => self.complete_variable(env),
            ParserState::CallableSymbol => self.complete_callable_symbol(env),
            ParserState::Number => self.complete_number(env),
            _ => {}
        }
    }

    fn on_paren_left(&mut self) {
        match self.state {
            ParserState::Ready | ParserState::CallableArguments => {
                self.state = ParserState::ExpectCallable;
            }
            ParserState::ExpectCallable
            | ParserState::VariableSymbol
            | ParserState::CallableSymbol
            | ParserState::Number => self.set_error(ParseErrorKind::UnexpectedLeftParen),
            ParserState::Done | ParserState::Error => {}
        }
    }

    fn on_paren_right<C>(&mut self, env: &mut Environment<C>) {
        match self.state {
            ParserState::Ready | ParserState::ExpectCallable => {
                self.set_error(ParseErrorKind::UnexpectedRightParen);
            }
            ParserState::VariableSymbol => {
                self.complete_variable(env);
                if self.state == ParserState::CallableArguments {
                    self.complete_callable(env);
                }
            }
            ParserState::CallableSymbol => {
                self.complete_callable_symbol(env);
                if self.state == ParserState::CallableArguments {
                    self.complete_callable(env);
                }
            }
            ParserState::CallableArguments => self.complete_callable(env),
            ParserState::Number => {
                self.complete_number(env);
                if self.state == ParserState::CallableArguments {
                    self.complete_callable(env);
                }
            }
            ParserState::Done | ParserState::Error => {}
        }
    }

    fn on_digit(&mut self, ch: char) {
        match self.state {
            ParserState::Ready | ParserState::CallableArguments => {
                self.buffer.push(ch);
                self.state = ParserState::Number;
            }
            ParserState::ExpectCallable => self.set_error(ParseErrorKind::UnexpectedNumber),
            // Digits may continue an identifier, just not start one.
            ParserState::VariableSymbol
            | ParserState::CallableSymbol
            | ParserState::Number => self.buffer.push(ch),
            ParserState::Done | ParserState::Error => {}
        }
    }

    fn on_dot(&mut self) {
        match self.state {
            ParserState::Number => {
                if self.buffer.contains('.') {
                    self.set_error(ParseErrorKind::UnexpectedDot);
                } else {
                    self.buffer.push('.');
                }
            }
            ParserState::Done | ParserState::Error => {}
            _ => self.set_error(ParseErrorKind::InvalidChar('.')),
        }
    }

    fn on_ident(&mut self, ch: char) {
        match self.state {
            ParserState::Ready => {
                self.buffer.push(ch);
                self.state = ParserState::VariableSymbol;
            }
            ParserState::ExpectCallable => {
                self.buffer.push(ch);
                self.state = ParserState::CallableSymbol;
            }
            ParserState::CallableArguments => {
                self.buffer.push(ch);
                self.state = ParserState::VariableSymbol;
            }
            ParserState::VariableSymbol | ParserState::CallableSymbol => self.buffer.push(ch),
            ParserState::Number => self.set_error(ParseErrorKind::UnexpectedNonNumber),
            ParserState::Done | ParserState::Error => {}
        }
    }

    /// A finished identifier in variable position.
    fn complete_variable<C>(&mut self, env: &mut Environment<C>) {
        let name = std::mem::take(&mut self.buffer);
        match env.symbol_id(&name) {
            None => self.set_error(ParseErrorKind::SymbolNotFound(name)),
            Some(symbol) => {
                if env.symbols().get(symbol).is_callable() {
                    self.set_error(ParseErrorKind::UnexpectedCallable(name));
                } else {
                    self.attach_symbol(env, symbol);
                }
            }
        }
    }

    /// A finished identifier in callable position.
    fn complete_callable_symbol<C>(&mut self, env: &mut Environment<C>) {
        let name = std::mem::take(&mut self.buffer);
        match env.symbol_id(&name) {
            None => self.set_error(ParseErrorKind::SymbolNotFound(name)),
            Some(symbol) => {
                if env.symbols().get(symbol).is_callable() {
                    self.attach_symbol(env, symbol);
                } else {
                    self.set_error(ParseErrorKind::UnexpectedVariable(name));
                }
            }
        }
    }

    /// A finished numeric literal becomes an anonymous constant node.
    fn complete_number<C>(&mut self, env: &mut Environment<C>) {
        let literal = std::mem::take(&mut self.buffer);
        let value: Value = match literal.parse() {
            Ok(value) => value,
            Err(_) => {
                self.set_error(ParseErrorKind::InvalidNumber(literal));
                return;
            }
        };
        if !value.is_finite() {
            self.set_error(ParseErrorKind::NumberOutOfRange(literal));
            return;
        }
        let id = env.make_const(value);
        self.attach(env, id, false);
    }

    /// `)` closes the innermost open call.
    fn complete_callable<C>(&mut self, env: &mut Environment<C>) {
        let open = match self.stack.pop() {
            Some(open) => open,
            None => unreachable!("call completion with no open call"),
        };
        if open.filled != open.id.arity() {
            self.stack.push(open);
            self.set_error(ParseErrorKind::NotEnoughArguments);
            return;
        }
        self.place_completed(env, open.id);
    }

    /// Attach a node declared by a symbol: variables drop into the open
    /// call (or finish the expression); callables open a new call.
    fn attach_symbol<C>(&mut self, env: &mut Environment<C>, symbol: SymbolId) {
        let callable = env.symbols().get(symbol).is_callable();
        let id = env.make_id(symbol);
        self.attach(env, id, callable);
    }

    fn attach<C>(&mut self, env: &mut Environment<C>, id: NodeId, callable: bool) {
        if callable {
            self.stack.push(OpenCall { id, filled: 0 });
            self.state = ParserState::CallableArguments;
            return;
        }
        self.place_completed(env, id);
    }

    /// Wire a completed node into its parent call, or make it the result.
    fn place_completed<C>(&mut self, env: &mut Environment<C>, id: NodeId) {
        match self.stack.last_mut() {
            None => {
                self.root = id;
                self.state = ParserState::Done;
            }
            Some(open) => {
                if open.filled < open.id.arity() {
                    let slot = open.filled;
                    open.filled += 1;
                    let parent = open.id;
                    env.arena_mut().set_argument(parent, slot, id);
                    self.state = ParserState::CallableArguments;
                } else {
                    env.arena_mut().destroy_subtree(id);
                    self.set_error(ParseErrorKind::TooManyArguments);
                }
            }
        }
    }

    fn set_error(&mut self, kind: ParseErrorKind) {
        self.state = ParserState::Error;
        self.error = Some(kind);
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("state", &self.state)
            .field("open_calls", &self.stack.len())
            .field("line", &self.line)
            .field("column", &self.column)
            .finish()
    }
}

/// Identifier alphabet: lowercase letters, arithmetic and logic operator
/// characters, and a few punctuation characters. Digits are handled
/// separately because they cannot start an identifier.
fn is_ident_char(c: char) -> bool {
    c.is_ascii_lowercase() || "-+*/%=<>!&|^_:?@#$".contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render;
    use crate::stats::ArenaStats;
    use crate::Kind;

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
        env.add_function("inc", 0, noop).unwrap();
        env.add_select_function("sel", 2, 0, pick).unwrap();
        env.add_positional("x", 0).unwrap();
        env.add_positional("long-name2", 1).unwrap();
        env.add_constant("pi", 3.5).unwrap();
        env
    }

    #[test]
    fn test_parse_call() {
        let mut env = test_env();
        let root = Parser::parse(&mut env, "(+ x x)").unwrap();
        assert_eq!(root.kind(), Kind::Function);
        assert_eq!(root.arity(), 2);
        assert_eq!(render(&env, root).unwrap(), "(+ x x)");
    }

    #[test]
    fn test_parse_bare_leaves() {
        let mut env = test_env();
        let x = Parser::parse(&mut env, "x").unwrap();
        assert_eq!(x.kind(), Kind::Positional);

        let n = Parser::parse(&mut env, "2.5").unwrap();
        assert_eq!(n.kind(), Kind::Const);
        assert_eq!(env.arena().value(n), 2.5);

        let named = Parser::parse(&mut env, "pi").unwrap();
        assert_eq!(named.kind(), Kind::Const);
        assert_eq!(env.arena().value(named), 3.5);
    }

    #[test]
    fn test_parse_numbers_and_nested_calls() {
        let mut env = test_env();
        let root = Parser::parse(&mut env, "(+ (* x 3) (sel 1.5 (inc)))").unwrap();
        assert_eq!(render(&env, root).unwrap(), "(+ (* x 3) (sel 1.5 (inc)))");
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        let mut env = test_env();
        let root = Parser::parse(&mut env, "  (+\n  x\t x )\n").unwrap();
        assert_eq!(render(&env, root).unwrap(), "(+ x x)");
    }

    #[test]
    fn test_error_positions() {
        let mut env = test_env();
        let err = Parser::parse(&mut env, "(+ x\n [)").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidChar('['));
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 2);
    }

    #[test]
    fn test_error_kinds() {
        let mut env = test_env();
        let cases: &[(&str, ParseErrorKind)] = &[
            ("", ParseErrorKind::Empty),
            ("   ", ParseErrorKind::Empty),
            ("(+ x", ParseErrorKind::UnexpectedEnd),
            (")", ParseErrorKind::UnexpectedRightParen),
            ("(+ x x x)", ParseErrorKind::TooManyArguments),
            ("(+ x)", ParseErrorKind::NotEnoughArguments),
            ("(nope x x)", ParseErrorKind::SymbolNotFound("nope".to_string())),
            ("(x 1 2)", ParseErrorKind::UnexpectedVariable("x".to_string())),
            ("(+ + x)", ParseErrorKind::UnexpectedCallable("+".to_string())),
            ("(+ 1.2.3 x)", ParseErrorKind::UnexpectedDot),
            ("(+ 12x x)", ParseErrorKind::UnexpectedNonNumber),
            ("(2 x)", ParseErrorKind::UnexpectedNumber),
            ("((+ x x))", ParseErrorKind::UnexpectedLeftParen),
        ];
        for (input, expected) in cases {
            let err = Parser::parse(&mut env, input).unwrap_err();
            assert_eq!(err.kind, *expected, "input: {input:?}");
        }
    }

    #[test]
    fn test_failed_parse_leaks_no_slots() {
        let mut env = test_env();
        let before = ArenaStats::collect(env.arena());
        // Grow the pools once so recycled slots are comparable.
        let seed = Parser::parse(&mut env, "(+ (* x 1) x)").unwrap();
        env.arena_mut().destroy_subtree(seed);
        let baseline = ArenaStats::collect(env.arena());
        assert_ne!(before, baseline);

        let err = Parser::parse(&mut env, "(+ (* x 1) nope)");
        assert!(err.is_err());
        // Everything built before the failure was destroyed again.
        assert_eq!(ArenaStats::collect(env.arena()), baseline);
    }

    #[test]
    fn test_incremental_consume() {
        let mut env = test_env();
        let mut parser = Parser::new();
        for ch in "(+ x 1)".chars() {
            parser.consume(&mut env, ch);
            assert!(!parser.is_error());
        }
        assert!(parser.is_done());
        let root = parser.take_result();
        assert_eq!(render(&env, root).unwrap(), "(+ x 1)");
        assert!(parser.is_ready());
    }
}
