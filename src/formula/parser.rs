//! Parses the arithmetic-over-cell-references grammar (`grammar.pest`) into an [`Expr`] AST,
//! collecting referenced [`Position`]s in parse order (unsorted, possibly duplicated — the Cell
//! layer above this module is responsible for de-duplicating and sorting).
//!
//! Fulfils the intent the teacher crate's own `parser.rs` declared but never implemented: a
//! `#[derive(Parser)]` pointed at a grammar file, previously a stub returning `NotImplemented`.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::ast::{BinOp, Expr, UnaryOp};
use super::RefList;
use crate::position::Position;

#[derive(Parser)]
#[grammar = "formula/grammar.pest"]
struct FormulaGrammar;

/// Parses `input` (the text after the leading `=`) into an AST plus its referenced positions.
pub fn parse(input: &str) -> Result<(Expr, RefList), String> {
    let mut parsed =
        FormulaGrammar::parse(Rule::formula, input).map_err(|e| format!("{e}"))?;
    let formula_pair = parsed.next().expect("formula rule always produces one pair");
    let expr_pair = formula_pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::expr)
        .expect("formula = { SOI ~ expr ~ EOI }");

    let mut refs = RefList::new();
    let expr = build_expr(expr_pair, &mut refs)?;
    Ok((expr, refs))
}

fn build_expr(pair: Pair<Rule>, refs: &mut RefList) -> Result<Expr, String> {
    let mut inner = pair.into_inner();
    let mut acc = build_term(inner.next().expect("expr always has a leading term"), refs)?;
    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_str() {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            other => return Err(format!("unexpected additive operator {other:?}")),
        };
        let rhs_pair = inner.next().expect("add_op is always followed by a term");
        let rhs = build_term(rhs_pair, refs)?;
        acc = Expr::Binary(op, Box::new(acc), Box::new(rhs));
    }
    Ok(acc)
}

fn build_term(pair: Pair<Rule>, refs: &mut RefList) -> Result<Expr, String> {
    let mut inner = pair.into_inner();
    let mut acc = build_factor(inner.next().expect("term always has a leading factor"), refs)?;
    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_str() {
            "*" => BinOp::Mul,
            "/" => BinOp::Div,
            other => return Err(format!("unexpected multiplicative operator {other:?}")),
        };
        let rhs_pair = inner.next().expect("mul_op is always followed by a factor");
        let rhs = build_factor(rhs_pair, refs)?;
        acc = Expr::Binary(op, Box::new(acc), Box::new(rhs));
    }
    Ok(acc)
}

fn build_factor(pair: Pair<Rule>, refs: &mut RefList) -> Result<Expr, String> {
    let mut inner = pair.into_inner().peekable();
    let unary = match inner.peek() {
        Some(p) if p.as_rule() == Rule::unary_op => {
            let op = match p.as_str() {
                "+" => UnaryOp::Plus,
                "-" => UnaryOp::Minus,
                other => return Err(format!("unexpected unary operator {other:?}")),
            };
            inner.next();
            Some(op)
        }
        _ => None,
    };
    let power_pair = inner.next().expect("factor always ends in a power");
    let power = build_power(power_pair, refs)?;
    Ok(match unary {
        Some(op) => Expr::Unary(op, Box::new(power)),
        None => power,
    })
}

fn build_power(pair: Pair<Rule>, refs: &mut RefList) -> Result<Expr, String> {
    let mut inner = pair.into_inner();
    let atom = build_atom(inner.next().expect("power always has a leading atom"), refs)?;
    match inner.next() {
        // pow_op
        Some(_op_pair) => {
            let rhs_pair = inner.next().expect("pow_op is always followed by a factor");
            let rhs = build_factor(rhs_pair, refs)?;
            Ok(Expr::Binary(BinOp::Pow, Box::new(atom), Box::new(rhs)))
        }
        None => Ok(atom),
    }
}

fn build_atom(pair: Pair<Rule>, refs: &mut RefList) -> Result<Expr, String> {
    let inner = pair
        .into_inner()
        .next()
        .expect("atom always wraps number | cell_ref | '(' expr ')'");
    match inner.as_rule() {
        Rule::number => {
            let n: f64 = inner
                .as_str()
                .parse()
                .map_err(|_| format!("invalid numeric literal {:?}", inner.as_str()))?;
            Ok(Expr::Number(n))
        }
        Rule::cell_ref => {
            let pos = Position::from_a1(inner.as_str())
                .ok_or_else(|| format!("invalid cell reference {:?}", inner.as_str()))?;
            refs.push(pos);
            Ok(Expr::CellRef(pos))
        }
        Rule::expr => build_expr(inner, refs),
        other => Err(format!("unexpected atom contents: {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_number() {
        let (ast, refs) = parse("42").unwrap();
        assert_eq!(ast, Expr::Number(42.0));
        assert!(refs.is_empty());
    }

    #[test]
    fn parses_cell_plus_literal() {
        let (ast, refs) = parse("A1+3").unwrap();
        assert_eq!(
            ast,
            Expr::Binary(
                BinOp::Add,
                Box::new(Expr::CellRef(Position::new(0, 0))),
                Box::new(Expr::Number(3.0))
            )
        );
        assert_eq!(refs.as_slice(), &[Position::new(0, 0)]);
    }

    #[test]
    fn respects_precedence_and_parens() {
        let (ast, _) = parse("(A1+3)*2").unwrap();
        assert_eq!(
            ast,
            Expr::Binary(
                BinOp::Mul,
                Box::new(Expr::Binary(
                    BinOp::Add,
                    Box::new(Expr::CellRef(Position::new(0, 0))),
                    Box::new(Expr::Number(3.0))
                )),
                Box::new(Expr::Number(2.0))
            )
        );
    }

    #[test]
    fn unary_minus_binds_tighter_than_power() {
        // -2^2 == -(2^2) == -4, matching Excel's operator precedence.
        let (ast, _) = parse("-2^2").unwrap();
        assert_eq!(
            ast,
            Expr::Unary(
                UnaryOp::Minus,
                Box::new(Expr::Binary(
                    BinOp::Pow,
                    Box::new(Expr::Number(2.0)),
                    Box::new(Expr::Number(2.0))
                ))
            )
        );
    }

    #[test]
    fn collects_duplicate_references_unsorted_in_parse_order() {
        let (_, refs) = parse("B2+A1+B2").unwrap();
        assert_eq!(
            refs.as_slice(),
            &[Position::new(1, 1), Position::new(0, 0), Position::new(1, 1)]
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse("A1+").is_err());
        assert!(parse("()").is_err());
        assert!(parse("1 2").is_err());
    }
}
