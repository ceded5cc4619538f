use crate::parse::jack::ast::Type;
use crate::vm::command::Segment;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize)]
pub enum VarKind {
    Static,
    Field,
    Argument,
    Local,
}

impl VarKind {
    pub fn segment(&self) -> Segment {
        match self {
            Self::Static => Segment::Static,
            Self::Field => Segment::This,
            Self::Argument => Segment::Argument,
            Self::Local => Segment::Local,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct SymbolEntry {
    pub name: String,
    pub type_name: Type,
    pub kind: VarKind,
    /// the offset inside of the segment
    pub index: u16,
}

impl SymbolEntry {
    pub fn segment(&self) -> Segment {
        self.kind.segment()
    }
}

/// One scope of variables. A class owns one for its statics and fields, every subroutine gets a
/// fresh one for its arguments and locals
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    entries: HashMap<String, SymbolEntry>,
    counts: HashMap<VarKind, u16>,
}

impl SymbolTable {
    /// Declares a new variable with the next free index of its kind.
    ///
    /// Returns None if the name is already declared in this scope
    pub fn define(&mut self, name: &str, type_name: Type, kind: VarKind) -> Option<&SymbolEntry> {
        if self.entries.contains_key(name) {
            return None;
        }

        let count = self.counts.entry(kind).or_insert(0);
        let entry = SymbolEntry {
            name: name.to_owned(),
            type_name,
            kind,
            index: *count,
        };
        *count += 1;

        Some(self.entries.entry(name.to_owned()).or_insert(entry))
    }

    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries.get(name)
    }

    pub fn count(&self, kind: VarKind) -> u16 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_counted_per_kind() {
        let mut table = SymbolTable::default();
        table.define("a", Type::Int, VarKind::Argument);
        table.define("x", Type::Int, VarKind::Local);
        table.define("b", Type::Boolean, VarKind::Argument);
        table.define("y", Type::ClassName("Array".to_owned()), VarKind::Local);
        table.define("z", Type::Char, VarKind::Local);

        assert_eq!(2, table.count(VarKind::Argument));
        assert_eq!(3, table.count(VarKind::Local));
        assert_eq!(0, table.count(VarKind::Static));

        let y = table.lookup("y").unwrap();
        assert_eq!(1, y.index);
        assert_eq!(Segment::Local, y.segment());
        assert_eq!(1, table.lookup("b").unwrap().index);
    }

    #[test]
    fn test_duplicates_are_rejected() {
        let mut table = SymbolTable::default();
        assert!(table.define("a", Type::Int, VarKind::Field).is_some());
        assert!(table.define("a", Type::Char, VarKind::Static).is_none());
        // the failed declaration must not use up an index
        assert_eq!(0, table.count(VarKind::Static));
        assert_eq!(Type::Int, table.lookup("a").unwrap().type_name);
    }

    #[test]
    fn test_fields_live_in_this() {
        let mut table = SymbolTable::default();
        table.define("x", Type::Int, VarKind::Field);
        assert_eq!(Segment::This, table.lookup("x").unwrap().segment());
        table.clear();
        assert!(table.lookup("x").is_none());
        assert_eq!(0, table.count(VarKind::Field));
    }
}
