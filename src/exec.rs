//! Resumable execution engine: the evaluator's semantics on an explicit
//! frame stack, with cost accounting and run-control flags.
//!
//! The recursive evaluator cannot be paused mid-computation. [`Exec`]
//! reimplements it as a cooperative state machine: [`Exec::step`] performs
//! one bounded unit of work and returns control to the caller, which is
//! what allows many trees to be interleaved on one thread (round-robin
//! evaluation of a population, breakpoint-style debugging, budget
//! enforcement).

use std::fmt::Write as _;

use crate::arena::{Kind, NodeId};
use crate::env::Environment;
use crate::error::ExecError;
use crate::eval::argument_count;
use crate::tree::Tree;
use crate::{Arity, Cost, Value};

/// Flag for [`Exec::run`]: keep stepping until the evaluation finishes.
/// Without it, `run` performs a single step.
pub const RUN_LOOP: u8 = 1;
/// Flag for [`Exec::run`]: stop after any step whose cost was nonzero.
pub const STOP_ON_COST: u8 = 2;
/// Flag for [`Exec::run`]: stop right after a function node finishes.
pub const STOP_ON_FUNCTION: u8 = 4;
/// Flag for [`Exec::run`]: stop right after a select node acts.
pub const STOP_ON_SELECT: u8 = 8;

/// What one [`Exec::step`] call did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepEvent {
    /// Kind of the node that was dispatched.
    pub kind: Kind,
    /// Cost accounted for the dispatch.
    pub cost: Cost,
}

/// One evaluation in progress: the node, how many argument values it needs
/// before acting, and the values collected so far.
struct Frame {
    id: NodeId,
    required: Arity,
    args: Vec<Value>,
}

/// Resumable evaluation of one tree against one environment.
pub struct Exec<'e, C = ()> {
    env: &'e Environment<C>,
    root: NodeId,
    params: Vec<Value>,
    flags: u8,
    cost_limit: Cost,
    cost_used: Cost,
    stack: Vec<Frame>,
    finished: bool,
    result: Option<Value>,
}

impl<'e, C> Exec<'e, C> {
    /// Create an engine for the subtree under `root`. Call [`Exec::init`]
    /// before stepping.
    #[must_use]
    pub fn new(env: &'e Environment<C>, root: NodeId) -> Exec<'e, C> {
        Exec {
            env,
            root,
            params: Vec::new(),
            flags: 0,
            cost_limit: -1.0,
            cost_used: 0.0,
            stack: Vec::new(),
            finished: false,
            result: None,
        }
    }

    /// Create an engine for a whole tree.
    #[must_use]
    pub fn for_tree(env: &'e Environment<C>, tree: &Tree) -> Exec<'e, C> {
        Exec::new(env, tree.root())
    }

    /// Supply the parameter vector and reset to the start of the
    /// evaluation. The vector is retained across [`Exec::restart`].
    pub fn init(&mut self, params: Vec<Value>) {
        self.params = params;
        self.restart();
    }

    /// Clear the stack, re-push the root and reset the finished flag and
    /// the cost counter. The last-supplied parameter vector is kept.
    pub fn restart(&mut self) {
        self.stack.clear();
        self.push_frame(self.root);
        self.finished = false;
        self.cost_used = 0.0;
        self.result = None;
    }

    /// Set run-control flags (bitwise or of the `RUN_*`/`STOP_*` consts).
    pub fn set_flag(&mut self, flag: u8) {
        self.flags |= flag;
    }

    /// Clear run-control flags.
    pub fn unset_flag(&mut self, flag: u8) {
        self.flags &= !flag;
    }

    /// Whether all given flag bits are set.
    #[must_use]
    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag == flag
    }

    /// Set the cost limit. A limit of zero or less disables the check.
    pub fn set_cost_limit(&mut self, limit: Cost) {
        self.cost_limit = limit;
    }

    /// The configured cost limit.
    #[must_use]
    pub fn cost_limit(&self) -> Cost {
        self.cost_limit
    }

    /// Whether a positive cost limit is configured.
    #[must_use]
    pub fn has_cost_limit(&self) -> bool {
        self.cost_limit > 0.0
    }

    /// Cost accounted so far in this evaluation.
    #[must_use]
    pub fn cost_used(&self) -> Cost {
        self.cost_used
    }

    /// Whether the evaluation has produced its final value.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The final value, once finished.
    #[must_use]
    pub fn result(&self) -> Option<Value> {
        self.result
    }

    /// Perform one bounded unit of work: exactly one node dispatch.
    ///
    /// Leaf children are gathered inline without counting as work; frames
    /// are pushed until some node has all required argument values, and
    /// that node is dispatched. A finished engine restarts first.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::CostLimitExceeded`] when a positive cost limit
    /// would be exceeded by the dispatch. The engine state is left as it
    /// was before the dispatch.
    pub fn step(&mut self, ctx: &mut C) -> Result<StepEvent, ExecError> {
        if self.finished {
            self.restart();
        }
        loop {
            let top = match self.stack.last_mut() {
                Some(frame) => frame,
                None => unreachable!("frame stack is empty while unfinished"),
            };
            if top.args.len() < usize::from(top.required) {
                let next = top.args.len() as Arity;
                let child = self.env.arena().argument(top.id, next);
                match child.kind() {
                    // Leaves are free: evaluate inline, no frame, no step.
                    Kind::Const if !child.is_empty() => {
                        top.args.push(self.env.arena().value(child));
                    }
                    Kind::Positional => {
                        let position = usize::from(self.env.arena().position(child));
                        assert!(
                            position < self.params.len(),
                            "parameter position {position} out of range for {} parameters",
                            self.params.len()
                        );
                        top.args.push(self.params[position]);
                    }
                    _ => {
                        assert!(!child.is_empty(), "cannot execute an empty handle");
                        self.push_frame(child);
                    }
                }
                continue;
            }
            return self.dispatch(ctx);
        }
    }

    /// Step repeatedly according to the run-control flags.
    ///
    /// Without [`RUN_LOOP`] a single step is performed. With it, stepping
    /// continues until the evaluation finishes or one of the configured
    /// stop flags triggers.
    ///
    /// # Errors
    ///
    /// Propagates [`ExecError::CostLimitExceeded`] from [`Exec::step`].
    pub fn run(&mut self, ctx: &mut C) -> Result<(), ExecError> {
        loop {
            let event = self.step(ctx)?;
            if self.finished || !self.has_flag(RUN_LOOP) {
                return Ok(());
            }
            if self.has_flag(STOP_ON_COST) && event.cost > 0.0 {
                return Ok(());
            }
            if self.has_flag(STOP_ON_FUNCTION) && event.kind == Kind::Function {
                return Ok(());
            }
            if self.has_flag(STOP_ON_SELECT) && event.kind == Kind::Select {
                return Ok(());
            }
        }
    }

    /// Step to the final value regardless of stop flags.
    ///
    /// # Errors
    ///
    /// Propagates [`ExecError::CostLimitExceeded`] from [`Exec::step`].
    pub fn run_to_completion(&mut self, ctx: &mut C) -> Result<Value, ExecError> {
        while !self.finished {
            self.step(ctx)?;
        }
        match self.result {
            Some(value) => Ok(value),
            None => unreachable!("finished without a result"),
        }
    }

    /// Render one line per live stack frame: frame number, handle, symbol
    /// name (or literal), collected argument values, and `<empty>`
    /// placeholders for slots not yet gathered.
    #[must_use]
    pub fn backtrace(&self) -> String {
        if self.stack.is_empty() {
            return "<empty>\n".to_string();
        }
        let mut out = String::new();
        for (n, frame) in self.stack.iter().enumerate() {
            let _ = write!(out, "#{n} {} {} :", frame.id, self.frame_name(frame.id));
            for value in &frame.args {
                let _ = write!(out, " {value}");
            }
            for _ in frame.args.len()..usize::from(frame.required) {
                out.push_str(" <empty>");
            }
            out.push('\n');
        }
        out
    }

    fn frame_name(&self, id: NodeId) -> String {
        match self.env.resolve(id) {
            Ok(symbol) => self.env.symbols().get(symbol).name().to_string(),
            Err(_) if id.kind() == Kind::Const && !id.is_empty() => {
                self.env.arena().value(id).to_string()
            }
            Err(_) => "<unknown>".to_string(),
        }
    }

    fn push_frame(&mut self, id: NodeId) {
        let required = argument_count(self.env, id);
        self.stack.push(Frame { id, required, args: Vec::with_capacity(usize::from(required)) });
    }

    /// Dispatch the fully gathered top frame: one Function call, one Select
    /// decision, or a root-leaf evaluation.
    fn dispatch(&mut self, ctx: &mut C) -> Result<StepEvent, ExecError> {
        let top = match self.stack.last() {
            Some(frame) => frame,
            None => unreachable!("dispatch on an empty stack"),
        };
        let id = top.id;
        let kind = id.kind();

        let cost = match self.env.resolve(id) {
            Ok(symbol) => self.env.symbols().get(symbol).cost(),
            Err(_) => 0.0,
        };
        if self.has_cost_limit() && self.cost_used + cost > self.cost_limit {
            return Err(ExecError::CostLimitExceeded {
                limit: self.cost_limit,
                used: self.cost_used,
            });
        }

        match kind {
            Kind::Const => {
                self.stack.pop();
                self.return_value(self.env.arena().value(id));
            }
            Kind::Positional => {
                let position = usize::from(self.env.arena().position(id));
                assert!(
                    position < self.params.len(),
                    "parameter position {position} out of range for {} parameters",
                    self.params.len()
                );
                self.stack.pop();
                let value = self.params[position];
                self.return_value(value);
            }
            Kind::Function => {
                let frame = match self.stack.pop() {
                    Some(frame) => frame,
                    None => unreachable!("dispatch on an empty stack"),
                };
                let value =
                    self.env.invoke_function(self.env.arena().fid(id), &frame.args, ctx);
                self.return_value(value);
            }
            Kind::Select => {
                let frame = match self.stack.pop() {
                    Some(frame) => frame,
                    None => unreachable!("dispatch on an empty stack"),
                };
                let branch =
                    self.env.invoke_select(self.env.arena().sfid(id), &frame.args, ctx);
                if branch < usize::from(frame.required) {
                    // The branch was already evaluated as a selector
                    // argument; reuse its value.
                    self.return_value(frame.args[branch]);
                } else {
                    assert!(
                        branch < usize::from(id.arity()),
                        "select branch {branch} out of range for arity {}",
                        id.arity()
                    );
                    let child = self.env.arena().argument(id, branch as Arity);
                    self.push_frame(child);
                }
            }
        }

        self.cost_used += cost;
        Ok(StepEvent { kind, cost })
    }

    /// Hand a finished frame's value to the new top frame, or record it as
    /// the final result when the stack has drained.
    fn return_value(&mut self, value: Value) {
        match self.stack.last_mut() {
            Some(top) => {
                debug_assert!(top.args.len() < usize::from(top.required), "too many arguments");
                top.args.push(value);
            }
            None => {
                self.finished = true;
                self.result = Some(value);
            }
        }
    }
}

impl<C> std::fmt::Debug for Exec<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exec")
            .field("root", &self.root)
            .field("stack_depth", &self.stack.len())
            .field("finished", &self.finished)
            .field("cost_used", &self.cost_used)
            .finish()
    }
}
