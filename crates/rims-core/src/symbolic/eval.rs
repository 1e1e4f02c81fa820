//! Floating-point evaluation of expression trees.

use super::expr::Expr;
use super::SymbolicError;

/// Evaluates `expr` with symbol values supplied by `lookup`.
///
/// Returns NaN (never panics) for domain errors such as `ln(-1)` or an
/// unbound symbol.
pub fn evaluate(expr: &Expr, lookup: &dyn Fn(&str) -> Option<f64>) -> f64 {
    match expr {
        Expr::Num(n) => *n,
        Expr::Sym(name) => lookup(name).unwrap_or(f64::NAN),
        Expr::Const(c) => c.value(),
        Expr::Add(items) => items.iter().map(|e| evaluate(e, lookup)).sum(),
        Expr::Mul(items) => items.iter().map(|e| evaluate(e, lookup)).product(),
        Expr::Pow(base, exp) => power(evaluate(base, lookup), evaluate(exp, lookup)),
        Expr::Func(func, arg) => func.apply(evaluate(arg, lookup)),
    }
}

/// Real-valued power that keeps odd roots of negative numbers real.
pub(crate) fn power(base: f64, exp: f64) -> f64 {
    if base < 0.0 && exp.fract() != 0.0 {
        let inv = 1.0 / exp;
        if (inv - inv.round()).abs() < 1e-12 && (inv.round() as i64) % 2 != 0 {
            return -(-base).powf(exp);
        }
        return f64::NAN;
    }
    base.powf(exp)
}

/// Evaluates an expression that must not contain free symbols.
pub fn evaluate_const(expr: &Expr) -> Result<f64, SymbolicError> {
    let symbols = expr.free_symbols();
    if !symbols.is_empty() {
        return Err(SymbolicError::FreeSymbols(symbols.join(", ")));
    }
    let value = evaluate(expr, &|_| None);
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SymbolicError::NonFinite)
    }
}
