//! Environment: symbol table, callable tables and the arena, injected
//! explicitly into every operation.
//!
//! An [`Environment`] is the unit of isolation. The intended deployment
//! shape is one environment per worker; nothing here is shared behind a
//! hidden singleton. The context type `C` is threaded into every callable
//! so user functions can carry side state (sensors, counters, simulation
//! handles) without globals.

use crate::arena::{Arena, Kind, MAX_ARITY, NodeId};
use crate::error::SymbolError;
use crate::symbol::{Symbol, SymbolData, SymbolId, SymbolTable};
use crate::{Arity, Cost, FunctionIndex, Position, SelectFunctionIndex, Value};

/// A registered callable: receives the evaluated arguments and the caller's
/// context, returns the node's value.
pub type Function<C> = fn(&[Value], &mut C) -> Value;

/// A registered select predicate: receives the evaluated selector arguments
/// and the context, returns a zero-based branch index.
pub type SelectFunction<C> = fn(&[Value], &mut C) -> usize;

/// Symbol table, callable tables and node storage for one worker.
pub struct Environment<C = ()> {
    arena: Arena,
    symbols: SymbolTable,
    functions: Vec<Function<C>>,
    select_functions: Vec<SelectFunction<C>>,
    selector_arities: Vec<Arity>,
}

impl<C> Default for Environment<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Environment<C> {
    /// Create an empty environment.
    #[must_use]
    pub fn new() -> Environment<C> {
        Environment {
            arena: Arena::new(),
            symbols: SymbolTable::new(),
            functions: Vec::new(),
            select_functions: Vec::new(),
            selector_arities: Vec::new(),
        }
    }

    /// Register a function under `name`.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate name or when the 8-bit function index space is
    /// exhausted.
    ///
    /// # Panics
    ///
    /// Panics if `arity` exceeds [`MAX_ARITY`].
    pub fn add_function(
        &mut self,
        name: &str,
        arity: Arity,
        function: Function<C>,
    ) -> Result<SymbolId, SymbolError> {
        assert!(arity <= MAX_ARITY, "arity {arity} exceeds the maximum of {MAX_ARITY}");
        if self.functions.len() >= usize::from(FunctionIndex::MAX) {
            return Err(SymbolError::TableFull);
        }
        let fid = self.functions.len() as FunctionIndex;
        let id = self.symbols.add(Symbol::new(name, SymbolData::Function { arity, fid }))?;
        self.functions.push(function);
        Ok(id)
    }

    /// Register a select predicate under `name`.
    ///
    /// Only the first `selector_arity` children of a node declared by this
    /// symbol are evaluated to pick the active branch among all `arity`
    /// children.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate name or when the 8-bit select index space is
    /// exhausted.
    ///
    /// # Panics
    ///
    /// Panics if `arity` exceeds [`MAX_ARITY`] or `selector_arity > arity`.
    pub fn add_select_function(
        &mut self,
        name: &str,
        arity: Arity,
        selector_arity: Arity,
        function: SelectFunction<C>,
    ) -> Result<SymbolId, SymbolError> {
        assert!(arity <= MAX_ARITY, "arity {arity} exceeds the maximum of {MAX_ARITY}");
        assert!(selector_arity <= arity, "selector arity must not exceed arity");
        if self.select_functions.len() >= usize::from(SelectFunctionIndex::MAX) {
            return Err(SymbolError::TableFull);
        }
        let sfid = self.select_functions.len() as SelectFunctionIndex;
        let id = self
            .symbols
            .add(Symbol::new(name, SymbolData::Select { arity, selector_arity, sfid }))?;
        self.select_functions.push(function);
        self.selector_arities.push(selector_arity);
        Ok(id)
    }

    /// Register a positional parameter under `name`.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate name or an already-covered position.
    pub fn add_positional(&mut self, name: &str, position: Position) -> Result<SymbolId, SymbolError> {
        self.symbols.add(Symbol::new(name, SymbolData::Positional { position }))
    }

    /// Register a named constant under `name`.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate name.
    pub fn add_constant(&mut self, name: &str, value: Value) -> Result<SymbolId, SymbolError> {
        self.symbols.add(Symbol::new(name, SymbolData::Const { value }))
    }

    /// Set the declared evaluation cost of the symbol named `name`.
    ///
    /// # Errors
    ///
    /// Fails if no such symbol exists.
    pub fn set_cost(&mut self, name: &str, cost: Cost) -> Result<(), SymbolError> {
        let id = self.symbols.by_name(name).ok_or_else(|| SymbolError::NotFound(name.to_string()))?;
        self.symbols.get_mut(id).set_cost(cost);
        Ok(())
    }

    /// Look a symbol up by name.
    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.by_name(name).map(|id| self.symbols.get(id))
    }

    /// Look a symbol id up by name.
    #[must_use]
    pub fn symbol_id(&self, name: &str) -> Option<SymbolId> {
        self.symbols.by_name(name)
    }

    /// Resolve a handle to its declaring symbol.
    ///
    /// # Errors
    ///
    /// Constant nodes carry a literal instead of a symbol
    /// ([`SymbolError::ConstHasNoSymbol`]); other kinds fail when the node
    /// references an unregistered position or callable index.
    pub fn resolve(&self, id: NodeId) -> Result<SymbolId, SymbolError> {
        match id.kind() {
            Kind::Const => Err(SymbolError::ConstHasNoSymbol),
            Kind::Positional => self.symbols.by_position(self.arena.position(id)),
            Kind::Function => self.symbols.by_fid(self.arena.fid(id)),
            Kind::Select => self.symbols.by_sfid(self.arena.sfid(id)),
        }
    }

    /// Invoke a registered function.
    ///
    /// # Panics
    ///
    /// Panics if `fid` is unregistered.
    pub fn invoke_function(&self, fid: FunctionIndex, args: &[Value], ctx: &mut C) -> Value {
        self.functions[usize::from(fid)](args, ctx)
    }

    /// Invoke a registered select predicate.
    ///
    /// # Panics
    ///
    /// Panics if `sfid` is unregistered.
    pub fn invoke_select(&self, sfid: SelectFunctionIndex, args: &[Value], ctx: &mut C) -> usize {
        self.select_functions[usize::from(sfid)](args, ctx)
    }

    /// Selector arity of a registered select predicate.
    ///
    /// # Panics
    ///
    /// Panics if `sfid` is unregistered.
    #[must_use]
    pub fn selector_arity(&self, sfid: SelectFunctionIndex) -> Arity {
        self.selector_arities[usize::from(sfid)]
    }

    /// Allocate a node declared by the symbol `id`. Call nodes start with
    /// all child slots empty.
    pub fn make_id(&mut self, id: SymbolId) -> NodeId {
        let data = self.symbols.get(id).data();
        match data {
            SymbolData::Const { value } => self.make_const(value),
            SymbolData::Positional { position } => {
                let node = self.arena.make(Kind::Positional, 0);
                self.arena.set_position(node, position);
                node
            }
            SymbolData::Function { arity, fid } => {
                let node = self.arena.make(Kind::Function, arity);
                self.arena.set_fid(node, fid);
                node
            }
            SymbolData::Select { arity, sfid, .. } => {
                let node = self.arena.make(Kind::Select, arity);
                self.arena.set_sfid(node, sfid);
                node
            }
        }
    }

    /// Allocate a node declared by the symbol named `name`.
    ///
    /// # Errors
    ///
    /// Fails if no such symbol exists.
    pub fn make_named(&mut self, name: &str) -> Result<NodeId, SymbolError> {
        let id = self.symbols.by_name(name).ok_or_else(|| SymbolError::NotFound(name.to_string()))?;
        Ok(self.make_id(id))
    }

    /// Allocate an anonymous constant node holding `value`.
    pub fn make_const(&mut self, value: Value) -> NodeId {
        let node = self.arena.make(Kind::Const, 0);
        self.arena.set_value(node, value);
        node
    }

    /// The node storage.
    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Mutable access to the node storage.
    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// The symbol table.
    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }
}

impl<C> std::fmt::Debug for Environment<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("symbols", &self.symbols.len())
            .field("functions", &self.functions.len())
            .field("select_functions", &self.select_functions.len())
            .field("arena", &self.arena)
            .finish()
    }
}
