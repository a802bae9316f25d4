//! Symbols and the symbol table.
//!
//! A symbol declares a name for something a tree node can reference: a
//! named constant, a positional parameter, a registered function, or a
//! registered select predicate. The table is append-only; symbols are
//! addressed by [`SymbolId`] and symbol identity is `SymbolId` equality.

use std::collections::HashMap;

use crate::error::SymbolError;
use crate::{Arity, Cost, FunctionIndex, Kind, Position, SelectFunctionIndex, Value};

/// Stable index of a symbol within its [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(u32);

/// Kind-specific payload of a [`Symbol`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SymbolData {
    /// Named constant with a fixed literal.
    Const {
        /// The literal value.
        value: Value,
    },
    /// Positional parameter.
    Positional {
        /// Index into the runtime parameter vector.
        position: Position,
    },
    /// Registered function.
    Function {
        /// Child count of nodes declared by this symbol.
        arity: Arity,
        /// Index into the environment's function table.
        fid: FunctionIndex,
    },
    /// Registered select predicate.
    Select {
        /// Child count of nodes declared by this symbol.
        arity: Arity,
        /// How many children are evaluated to pick the branch.
        selector_arity: Arity,
        /// Index into the environment's select table.
        sfid: SelectFunctionIndex,
    },
}

/// A named entry of the symbol table.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    name: String,
    cost: Cost,
    data: SymbolData,
}

impl Symbol {
    /// Create a symbol with zero cost.
    #[must_use]
    pub fn new(name: impl Into<String>, data: SymbolData) -> Symbol {
        Symbol { name: name.into(), cost: 0.0, data }
    }

    /// The symbol's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared evaluation cost, accounted by the execution engine.
    #[must_use]
    pub fn cost(&self) -> Cost {
        self.cost
    }

    /// Set the declared evaluation cost.
    pub fn set_cost(&mut self, cost: Cost) {
        self.cost = cost;
    }

    /// Kind-specific payload.
    #[must_use]
    pub fn data(&self) -> SymbolData {
        self.data
    }

    /// Node kind this symbol declares.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self.data {
            SymbolData::Const { .. } => Kind::Const,
            SymbolData::Positional { .. } => Kind::Positional,
            SymbolData::Function { .. } => Kind::Function,
            SymbolData::Select { .. } => Kind::Select,
        }
    }

    /// Child count of nodes declared by this symbol.
    #[must_use]
    pub fn arity(&self) -> Arity {
        match self.data {
            SymbolData::Const { .. } | SymbolData::Positional { .. } => 0,
            SymbolData::Function { arity, .. } | SymbolData::Select { arity, .. } => arity,
        }
    }

    /// Whether the symbol declares a leaf.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.arity() == 0
    }

    /// Whether the symbol declares a call node (function or select).
    #[must_use]
    pub fn is_callable(&self) -> bool {
        matches!(self.data, SymbolData::Function { .. } | SymbolData::Select { .. })
    }

    /// Selector arity of a select symbol; 0 for every other kind.
    #[must_use]
    pub fn selector_arity(&self) -> Arity {
        match self.data {
            SymbolData::Select { selector_arity, .. } => selector_arity,
            _ => 0,
        }
    }
}

/// Append-only symbol registry with secondary lookup maps.
#[derive(Debug, Default)]
pub struct SymbolTable {
    list: Vec<Symbol>,
    by_name: HashMap<String, SymbolId>,
    by_position: HashMap<Position, SymbolId>,
    by_fid: HashMap<FunctionIndex, SymbolId>,
    by_sfid: HashMap<SelectFunctionIndex, SymbolId>,
    by_arity: HashMap<Arity, Vec<SymbolId>>,
    terminals: Vec<SymbolId>,
    nonterminals: Vec<SymbolId>,
}

impl SymbolTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Register a symbol.
    ///
    /// # Errors
    ///
    /// Fails without modifying the table if the name is taken, or if a
    /// positional with the same position (or a callable with the same
    /// table index) is already registered.
    pub fn add(&mut self, symbol: Symbol) -> Result<SymbolId, SymbolError> {
        if self.by_name.contains_key(symbol.name()) {
            return Err(SymbolError::Duplicate(symbol.name().to_string()));
        }
        match symbol.data {
            SymbolData::Const { .. } => {}
            SymbolData::Positional { position } => {
                if self.by_position.contains_key(&position) {
                    return Err(SymbolError::PositionTaken(position));
                }
            }
            SymbolData::Function { fid, .. } => {
                debug_assert!(!self.by_fid.contains_key(&fid));
            }
            SymbolData::Select { sfid, .. } => {
                debug_assert!(!self.by_sfid.contains_key(&sfid));
            }
        }

        let id = SymbolId(self.list.len() as u32);
        self.by_name.insert(symbol.name().to_string(), id);
        match symbol.data {
            SymbolData::Const { .. } => {}
            SymbolData::Positional { position } => {
                self.by_position.insert(position, id);
            }
            SymbolData::Function { fid, .. } => {
                self.by_fid.insert(fid, id);
            }
            SymbolData::Select { sfid, .. } => {
                self.by_sfid.insert(sfid, id);
            }
        }
        self.by_arity.entry(symbol.arity()).or_default().push(id);
        if symbol.is_terminal() {
            self.terminals.push(id);
        } else {
            self.nonterminals.push(id);
        }
        self.list.push(symbol);
        Ok(id)
    }

    /// Number of registered symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// The symbol behind an id.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this table.
    #[must_use]
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.list[id.0 as usize]
    }

    /// Mutable access to the symbol behind an id (e.g. to set its cost).
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this table.
    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.list[id.0 as usize]
    }

    /// Look a symbol up by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    /// Look a positional symbol up by parameter position.
    ///
    /// # Errors
    ///
    /// Returns [`SymbolError::PositionNotFound`] if no positional covers
    /// `position`.
    pub fn by_position(&self, position: Position) -> Result<SymbolId, SymbolError> {
        self.by_position.get(&position).copied().ok_or(SymbolError::PositionNotFound(position))
    }

    /// Look a function symbol up by function-table index.
    ///
    /// # Errors
    ///
    /// Returns [`SymbolError::FunctionNotFound`] if `fid` is unregistered.
    pub fn by_fid(&self, fid: FunctionIndex) -> Result<SymbolId, SymbolError> {
        self.by_fid.get(&fid).copied().ok_or(SymbolError::FunctionNotFound(fid))
    }

    /// Look a select symbol up by select-table index.
    ///
    /// # Errors
    ///
    /// Returns [`SymbolError::SelectNotFound`] if `sfid` is unregistered.
    pub fn by_sfid(&self, sfid: SelectFunctionIndex) -> Result<SymbolId, SymbolError> {
        self.by_sfid.get(&sfid).copied().ok_or(SymbolError::SelectNotFound(sfid))
    }

    /// All symbols declaring the given arity, in registration order.
    #[must_use]
    pub fn by_arity(&self, arity: Arity) -> &[SymbolId] {
        self.by_arity.get(&arity).map_or(&[], Vec::as_slice)
    }

    /// All terminal symbols, in registration order.
    #[must_use]
    pub fn terminals(&self) -> &[SymbolId] {
        &self.terminals
    }

    /// All nonterminal symbols, in registration order.
    #[must_use]
    pub fn nonterminals(&self) -> &[SymbolId] {
        &self.nonterminals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut table = SymbolTable::new();
        let plus =
            table.add(Symbol::new("+", SymbolData::Function { arity: 2, fid: 0 })).unwrap();
        let x = table.add(Symbol::new("x", SymbolData::Positional { position: 0 })).unwrap();

        assert_eq!(table.by_name("+"), Some(plus));
        assert_eq!(table.by_name("x"), Some(x));
        assert_eq!(table.by_name("y"), None);
        assert_eq!(table.by_fid(0).unwrap(), plus);
        assert_eq!(table.by_position(0).unwrap(), x);
        assert_eq!(table.get(plus).arity(), 2);
        assert!(table.get(plus).is_callable());
        assert!(table.get(x).is_terminal());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut table = SymbolTable::new();
        table.add(Symbol::new("x", SymbolData::Positional { position: 0 })).unwrap();
        let err = table.add(Symbol::new("x", SymbolData::Positional { position: 1 }));
        assert_eq!(err, Err(SymbolError::Duplicate("x".to_string())));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_duplicate_position_rejected() {
        let mut table = SymbolTable::new();
        table.add(Symbol::new("x", SymbolData::Positional { position: 0 })).unwrap();
        let err = table.add(Symbol::new("y", SymbolData::Positional { position: 0 }));
        assert_eq!(err, Err(SymbolError::PositionTaken(0)));
    }

    #[test]
    fn test_terminal_partition() {
        let mut table = SymbolTable::new();
        let plus =
            table.add(Symbol::new("+", SymbolData::Function { arity: 2, fid: 0 })).unwrap();
        let x = table.add(Symbol::new("x", SymbolData::Positional { position: 0 })).unwrap();
        let one = table.add(Symbol::new("one", SymbolData::Const { value: 1.0 })).unwrap();

        assert_eq!(table.terminals(), &[x, one][..]);
        assert_eq!(table.nonterminals(), &[plus][..]);
        assert_eq!(table.by_arity(2), &[plus][..]);
        assert_eq!(table.by_arity(5), &[] as &[SymbolId]);
    }

    #[test]
    fn test_select_symbol_accessors() {
        let mut table = SymbolTable::new();
        let s = table
            .add(Symbol::new("if", SymbolData::Select { arity: 4, selector_arity: 2, sfid: 0 }))
            .unwrap();
        let symbol = table.get(s);
        assert_eq!(symbol.arity(), 4);
        assert_eq!(symbol.selector_arity(), 2);
        assert_eq!(symbol.kind(), Kind::Select);
    }

    #[test]
    fn test_cost_mutation() {
        let mut table = SymbolTable::new();
        let s = table.add(Symbol::new("+", SymbolData::Function { arity: 2, fid: 0 })).unwrap();
        assert_eq!(table.get(s).cost(), 0.0);
        table.get_mut(s).set_cost(1.5);
        assert_eq!(table.get(s).cost(), 1.5);
    }
}
