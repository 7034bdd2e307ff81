//! Flat symbol table: one global scope for the whole program.

use std::collections::HashMap;

use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    /// Element type, present only for lists.
    pub element: Option<Type>,
    pub declared_at_line: usize,
    pub initialized: bool,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            entries: HashMap::new(),
        }
    }

    /// Insert a new symbol. Returns `false` if the name is already taken.
    pub fn declare(&mut self, name: &str, ty: Type, element: Option<Type>, line: usize) -> bool {
        if self.entries.contains_key(name) {
            return false;
        }
        self.entries.insert(
            name.to_string(),
            Symbol {
                name: name.to_string(),
                ty,
                element,
                declared_at_line: line,
                initialized: false,
            },
        );
        true
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name)
    }

    pub fn mark_initialized(&mut self, name: &str) {
        if let Some(symbol) = self.entries.get_mut(name) {
            symbol.initialized = true;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
