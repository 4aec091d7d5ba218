//! The formula sub-system, consumed by [`crate::content::Content::Formula`] as an opaque
//! "compiled formula" offering `evaluate`, `expression`, and `referenced_cells` — exactly the
//! external Compiled Formula contract this spec treats as out of THE CORE's scope, now given one
//! concrete, minimal implementation so the engine runs standalone.

mod ast;
mod eval;
mod parser;

pub use eval::{FormulaValue, SheetView};

use smallvec::SmallVec;

use crate::position::Position;
use ast::Expr;

/// Most formulas reference only a few cells; inline up to 4 before spilling to the heap.
pub(crate) type RefList = SmallVec<[Position; 4]>;

/// A parsed, immediately-evaluable formula expression.
///
/// Opaque to its caller beyond the three methods below: the Cell layer never inspects the AST
/// directly.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFormula {
    ast: Expr,
    /// Referenced positions in parse order, unsorted and possibly duplicated. The Cell layer
    /// de-duplicates and sorts; tests must not rely on this order.
    references: RefList,
}

impl CompiledFormula {
    /// Parses `expression` (the formula text with the leading `=` already stripped).
    pub fn parse(expression: &str) -> Result<Self, String> {
        let (ast, references) = parser::parse(expression)?;
        Ok(CompiledFormula { ast, references })
    }

    /// Evaluates this formula against a read-only sheet view. Never mutates the sheet.
    pub fn evaluate(&self, sheet: &dyn SheetView) -> FormulaValue {
        eval::evaluate(&self.ast, sheet)
    }

    /// Canonical, whitespace-normalized, minimally-parenthesized reprint of the expression.
    pub fn expression(&self) -> String {
        self.ast.to_canonical_string()
    }

    /// Raw (unsorted, possibly duplicated) referenced positions, in parse order.
    pub fn referenced_cells(&self) -> &[Position] {
        &self.references
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::value::Value;

    struct FakeSheet(HashMap<Position, Value>);
    impl SheetView for FakeSheet {
        fn get_value(&self, pos: Position) -> Option<Value> {
            self.0.get(&pos).cloned()
        }
    }

    #[test]
    fn parse_failure_is_reported() {
        assert!(CompiledFormula::parse("A1+").is_err());
    }

    #[test]
    fn round_trips_through_canonical_reprint() {
        let f = CompiledFormula::parse("(A1+3)*2").unwrap();
        assert_eq!(f.expression(), "(A1 + 3) * 2");
        // Reparsing the canonical form must yield the same AST (idempotent canonicalization).
        let reparsed = CompiledFormula::parse(&f.expression()).unwrap();
        assert_eq!(reparsed.expression(), f.expression());
    }

    #[test]
    fn evaluates_against_a_sheet_view() {
        let mut cells = HashMap::new();
        cells.insert(Position::new(0, 0), Value::Number(2.0));
        let sheet = FakeSheet(cells);
        let f = CompiledFormula::parse("A1+3").unwrap();
        assert_eq!(f.evaluate(&sheet), FormulaValue::Number(5.0));
        assert_eq!(f.referenced_cells(), &[Position::new(0, 0)]);
    }
}
