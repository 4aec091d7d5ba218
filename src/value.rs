//! The value union a cell (or a formula's evaluation) produces.

/// Marker for an arithmetic failure during formula evaluation (division by zero, an invalid
/// power, or propagation from an input cell that itself holds an arithmetic error).
///
/// This is not part of [`crate::error::CellGraphError`]: per the engine's error-handling policy,
/// an arithmetic error is a *value*, not a failed operation — it is cached and cleared by
/// invalidation exactly like any other evaluation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArithmeticError;

impl std::fmt::Display for ArithmeticError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#ARITHM!")
    }
}

/// The value a cell or a compiled formula's evaluation yields.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Error(ArithmeticError),
}

impl Value {
    /// Textual rendering used by `Sheet::print_values` and by GetValue on Text/Empty cells.
    pub fn render(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::Error(e) => e.to_string(),
        }
    }

    /// Numeric coercion used when a formula consumes another cell's value: numeric values pass
    /// through, blank text coerces to zero, non-numeric text and propagated errors are an
    /// arithmetic error.
    pub fn coerce_numeric(&self) -> Result<f64, ArithmeticError> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Text(s) if s.is_empty() => Ok(0.0),
            Value::Text(s) => s.trim().parse::<f64>().map_err(|_| ArithmeticError),
            Value::Error(_) => Err(ArithmeticError),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
