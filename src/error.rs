//! Error taxonomy surfaced to callers of `Sheet::set_cell` / `get_cell` / `clear_cell`.

use crate::position::Position;

/// The three failure kinds a public mutating/addressing operation can return.
///
/// An arithmetic error produced while *evaluating* a formula is deliberately not a variant here —
/// see [`crate::value::ArithmeticError`] and its doc comment for why.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CellGraphError {
    #[error("position out of bounds: {0:?}")]
    InvalidPosition(Position),

    #[error("formula parse error: {0}")]
    FormulaParse(String),

    #[error("circular reference introduced at {0}")]
    CircularReference(Position),
}
