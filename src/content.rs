//! The three kinds of cell content (Empty / Text / Formula), unified behind one small capability
//! set, mirroring the original C++ `Cell::Impl` / `EmptyImpl` / `TextImpl` / `FormulaImpl`
//! hierarchy as a Rust tagged sum rather than an inheritance hierarchy.

use std::cell::RefCell;
use std::collections::BTreeSet;

use crate::error::CellGraphError;
use crate::formula::{CompiledFormula, SheetView};
use crate::position::Position;
use crate::value::Value;

/// A text beginning with this character, with length >= 2, is parsed as a formula.
pub const FORMULA_SIGN: char = '=';
/// A `Text` content whose first character is this renders its remainder (unescaped) as its value.
pub const ESCAPE_SIGN: char = '\'';

/// The polymorphic content a [`crate::cell::Cell`] holds.
#[derive(Debug)]
pub enum Content {
    Empty,
    Text(String),
    Formula {
        formula: CompiledFormula,
        /// Memoized last-computed value. A `RefCell` because `get_value` is a logical mutation
        /// (it updates the memoization cell) performed through a `&self` getter — see the design
        /// note on "cache as mutable state inside a conceptually-const getter".
        cache: RefCell<Option<Value>>,
    },
}

impl Content {
    /// Classifies raw cell text into the appropriate content kind, parsing a formula expression
    /// if present. Does not touch any graph state — that is [`crate::cell::Cell::set`]'s job.
    pub fn classify(text: &str) -> Result<Content, CellGraphError> {
        if text.is_empty() {
            return Ok(Content::Empty);
        }
        if text.starts_with(FORMULA_SIGN) && text.len() >= 2 {
            let expr = &text[FORMULA_SIGN.len_utf8()..];
            let formula = CompiledFormula::parse(expr).map_err(CellGraphError::FormulaParse)?;
            return Ok(Content::Formula {
                formula,
                cache: RefCell::new(None),
            });
        }
        Ok(Content::Text(text.to_string()))
    }

    /// The text that would round-trip through `SetCell`/`GetText` for this content.
    pub fn get_text(&self) -> String {
        match self {
            Content::Empty => String::new(),
            Content::Text(s) => s.clone(),
            Content::Formula { formula, .. } => format!("{FORMULA_SIGN}{}", formula.expression()),
        }
    }

    /// This content's value, evaluating (and memoizing) a formula against `sheet` if needed.
    pub fn get_value(&self, sheet: &dyn SheetView) -> Value {
        match self {
            Content::Empty => Value::Text(String::new()),
            Content::Text(s) => match s.strip_prefix(ESCAPE_SIGN) {
                Some(rest) => Value::Text(rest.to_string()),
                None => Value::Text(s.clone()),
            },
            Content::Formula { formula, cache } => {
                if let Some(cached) = cache.borrow().as_ref() {
                    return cached.clone();
                }
                let result: Value = formula.evaluate(sheet).into();
                *cache.borrow_mut() = Some(result.clone());
                result
            }
        }
    }

    /// De-duplicated, sorted referenced positions (empty for non-formula content).
    pub fn get_referenced_cells(&self) -> Vec<Position> {
        match self {
            Content::Formula { formula, .. } => formula
                .referenced_cells()
                .iter()
                .copied()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Clears the memoized value. A no-op for non-formula content.
    pub fn reset_cache(&self) {
        if let Content::Formula { cache, .. } = self {
            *cache.borrow_mut() = None;
        }
    }

    /// Exposed only for tests/diagnostics, per the external capability set.
    #[cfg(test)]
    pub fn get_cache(&self) -> Option<Value> {
        match self {
            Content::Formula { cache, .. } => cache.borrow().clone(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeSheet(HashMap<Position, Value>);
    impl SheetView for FakeSheet {
        fn get_value(&self, pos: Position) -> Option<Value> {
            self.0.get(&pos).cloned()
        }
    }

    #[test]
    fn empty_text_classifies_as_empty() {
        assert!(matches!(Content::classify("").unwrap(), Content::Empty));
    }

    #[test]
    fn lone_equals_sign_is_text_not_formula() {
        // Length 1, starts with '=' but isn't long enough to be a formula per the spec rule.
        assert!(matches!(Content::classify("=").unwrap(), Content::Text(s) if s == "="));
    }

    #[test]
    fn escape_sign_forces_literal_rendering() {
        let c = Content::classify("'=not a formula").unwrap();
        assert_eq!(c.get_text(), "'=not a formula");
        let sheet = FakeSheet(HashMap::new());
        assert_eq!(c.get_value(&sheet), Value::Text("=not a formula".to_string()));
    }

    #[test]
    fn formula_caches_until_reset() {
        let mut cells = HashMap::new();
        cells.insert(Position::new(0, 0), Value::Number(2.0));
        let sheet = FakeSheet(cells);
        let c = Content::classify("=A1+3").unwrap();
        assert_eq!(c.get_cache(), None);
        assert_eq!(c.get_value(&sheet), Value::Number(5.0));
        assert_eq!(c.get_cache(), Some(Value::Number(5.0)));
        c.reset_cache();
        assert_eq!(c.get_cache(), None);
    }

    #[test]
    fn formula_references_are_sorted_and_deduped() {
        let c = Content::classify("=B2+A1+B2").unwrap();
        assert_eq!(
            c.get_referenced_cells(),
            vec![Position::new(0, 0), Position::new(1, 1)]
        );
    }

    #[test]
    fn invalid_formula_fails_to_classify() {
        assert!(Content::classify("=A1+").is_err());
    }
}
