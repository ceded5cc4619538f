use crate::definitions::{Symbol, ARG, KBD, LCL, SCREEN_START, SP, THAT, THIS, VARIABLE_START};
use serde::Serialize;
use std::collections::BTreeMap;

/// The symbols of one assembled program.
///
/// Starts out with the predefined symbols, labels are added in the first pass and variables
/// as they are encountered in the second one
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct SymbolTable {
    counter: Symbol,
    symbols: BTreeMap<String, Symbol>,
}

impl SymbolTable {
    /// A table without any symbols at all, not even SP and friends
    pub fn empty() -> Self {
        Self {
            counter: VARIABLE_START,
            symbols: BTreeMap::new(),
        }
    }

    /// Lookup a value in the symbol table
    pub fn lookup(&self, ident: &str) -> Option<Symbol> {
        self.symbols.get(ident).copied()
    }

    /// Lookup a value in the symbol table
    ///
    /// if the value does not exist we create a new variable for it
    pub fn lookup_or_insert(&mut self, ident: impl Into<String>) -> Symbol {
        *self.symbols.entry(ident.into()).or_insert_with(|| {
            let value = self.counter;
            self.counter += 1;
            value
        })
    }

    /// Set a value in the Symbol Table explicitly
    ///
    /// this is only makes sense for labels and predefined symbols
    pub fn set(&mut self, ident: impl Into<String>, value: Symbol) {
        self.symbols.insert(ident.into(), value);
    }

    pub fn contains(&self, ident: &str) -> bool {
        self.symbols.contains_key(ident)
    }

    /// The address the next new variable will get
    pub fn next_variable(&self) -> Symbol {
        self.counter
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        let mut table = Self::empty();

        for (name, value) in [
            ("SP", SP),
            ("LCL", LCL),
            ("ARG", ARG),
            ("THIS", THIS),
            ("THAT", THAT),
            ("SCREEN", SCREEN_START),
            ("KBD", KBD),
        ] {
            table.set(name, value as Symbol);
        }
        for r in 0..16 {
            table.set(format!("R{}", r), r);
        }

        table
    }
}
