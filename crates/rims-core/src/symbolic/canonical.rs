//! Canonical form: flattening, constant folding, like-term collection and
//! operand ordering.
//!
//! Two expressions that differ only by commutativity, associativity,
//! numeric folding or like-term grouping canonicalize to structurally equal
//! trees. No expansion of products of sums is attempted, which keeps the
//! rewrite linear-ish in the input size.

use super::eval::power;
use super::expr::{compare, Expr, NUM_EPS};
use super::SymbolicError;
use crate::worker::Deadline;

/// Inputs larger than this are rejected instead of canonicalized.
pub const MAX_NODES: usize = 4096;

/// Snaps values within a few ulps of a non-zero integer and clears `-0.0`.
/// Small non-zero values are kept as they are.
pub(crate) fn tidy(x: f64) -> f64 {
    if x == 0.0 {
        return 0.0;
    }
    let r = x.round();
    if r != 0.0 && (x - r).abs() <= NUM_EPS * x.abs() {
        r
    } else {
        x
    }
}

/// True when `sum` is zero, or only rounding noise left over from adding
/// values of magnitude up to `scale`.
fn cancelled(sum: f64, scale: f64) -> bool {
    sum == 0.0 || sum.abs() <= NUM_EPS * scale
}

fn is_integer(e: &Expr) -> bool {
    matches!(e, Expr::Num(n) if n.fract() == 0.0)
}

/// Returns the canonical form of `expr`, checking `deadline` at every node.
pub fn canonicalize(expr: &Expr, deadline: &Deadline) -> Result<Expr, SymbolicError> {
    let size = expr.size();
    if size > MAX_NODES {
        return Err(SymbolicError::TooLarge(size));
    }
    canon(expr, deadline)
}

fn canon(expr: &Expr, deadline: &Deadline) -> Result<Expr, SymbolicError> {
    if deadline.expired() {
        return Err(SymbolicError::Timeout);
    }
    Ok(match expr {
        Expr::Num(n) => Expr::Num(tidy(*n)),
        Expr::Sym(_) | Expr::Const(_) => expr.clone(),
        Expr::Add(items) => {
            let items = items
                .iter()
                .map(|e| canon(e, deadline))
                .collect::<Result<Vec<_>, _>>()?;
            canon_add(items)
        }
        Expr::Mul(items) => {
            let items = items
                .iter()
                .map(|e| canon(e, deadline))
                .collect::<Result<Vec<_>, _>>()?;
            canon_mul(items, deadline)?
        }
        Expr::Pow(base, exp) => canon_pow(canon(base, deadline)?, canon(exp, deadline)?, deadline)?,
        Expr::Func(func, arg) => {
            let arg = canon(arg, deadline)?;
            if let Expr::Num(n) = arg {
                let v = func.apply(n);
                if v.is_finite() {
                    return Ok(Expr::Num(tidy(v)));
                }
            }
            Expr::Func(*func, Box::new(arg))
        }
    })
}

/// Splits a canonical term into its numeric coefficient and the remainder.
fn split_coefficient(term: Expr) -> (f64, Expr) {
    match term {
        Expr::Mul(mut items) => match items.first() {
            Some(Expr::Num(n)) => {
                let coef = *n;
                items.remove(0);
                let rest = if items.len() == 1 {
                    items.remove(0)
                } else {
                    Expr::Mul(items)
                };
                (coef, rest)
            }
            _ => (1.0, Expr::Mul(items)),
        },
        other => (1.0, other),
    }
}

fn scale(coef: f64, rest: Expr) -> Expr {
    if coef == 1.0 {
        return rest;
    }
    match rest {
        Expr::Mul(items) => {
            let mut out = Vec::with_capacity(items.len() + 1);
            out.push(Expr::Num(coef));
            out.extend(items);
            Expr::Mul(out)
        }
        other => Expr::Mul(vec![Expr::Num(coef), other]),
    }
}

fn canon_add(items: Vec<Expr>) -> Expr {
    let (mut constant, mut constant_scale) = (0.0, 0.0_f64);
    // (coefficient sum, largest summand, term)
    let mut terms: Vec<(f64, f64, Expr)> = Vec::new();
    let mut flat = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Expr::Add(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    for item in flat {
        if let Expr::Num(n) = item {
            constant += n;
            constant_scale = constant_scale.max(n.abs());
            continue;
        }
        let (coef, rest) = split_coefficient(item);
        match terms.iter_mut().find(|(_, _, r)| *r == rest) {
            Some(slot) => {
                slot.0 += coef;
                slot.1 = slot.1.max(coef.abs());
            }
            None => terms.push((coef, coef.abs(), rest)),
        }
    }

    let mut out: Vec<Expr> = terms
        .into_iter()
        .filter(|(coef, largest, _)| !cancelled(*coef, *largest))
        .map(|(coef, _, rest)| scale(tidy(coef), rest))
        .collect();
    out.sort_by(compare);

    if !cancelled(constant, constant_scale) {
        out.insert(0, Expr::Num(tidy(constant)));
    }
    match out.len() {
        0 => Expr::Num(0.0),
        1 => out.remove(0),
        _ => Expr::Add(out),
    }
}

fn canon_mul(items: Vec<Expr>, deadline: &Deadline) -> Result<Expr, SymbolicError> {
    let mut coef = 1.0;
    let mut groups: Vec<(Expr, Vec<Expr>)> = Vec::new();
    let mut flat = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Expr::Mul(inner) => flat.extend(inner),
            other => flat.push(other),
        }
    }
    for item in flat {
        let (base, exp) = match item {
            Expr::Num(n) => {
                coef *= n;
                continue;
            }
            Expr::Pow(base, exp) => (*base, *exp),
            other => (other, Expr::Num(1.0)),
        };
        match groups.iter_mut().find(|(b, _)| *b == base) {
            Some(slot) => slot.1.push(exp),
            None => groups.push((base, vec![exp])),
        }
    }

    let coef_is_zero = coef == 0.0;
    let mut out = Vec::with_capacity(groups.len());
    for (base, exps) in groups {
        let exp = if exps.len() == 1 {
            exps.into_iter().next().unwrap_or(Expr::Num(1.0))
        } else {
            canon_add(exps)
        };
        match canon_pow(base, exp, deadline)? {
            Expr::Num(n) => coef *= n,
            Expr::Mul(inner) => {
                for f in inner {
                    match f {
                        Expr::Num(n) => coef *= n,
                        other => out.push(other),
                    }
                }
            }
            other => out.push(other),
        }
    }

    let coef = tidy(coef);
    if coef_is_zero || coef == 0.0 {
        return Ok(Expr::Num(0.0));
    }
    out.sort_by(compare);
    if coef != 1.0 {
        out.insert(0, Expr::Num(coef));
    }
    Ok(match out.len() {
        0 => Expr::Num(coef),
        1 => out.remove(0),
        _ => Expr::Mul(out),
    })
}

fn canon_pow(base: Expr, exp: Expr, deadline: &Deadline) -> Result<Expr, SymbolicError> {
    if exp.is_zero() || base.is_one() {
        return Ok(Expr::Num(1.0));
    }
    if exp.is_one() {
        return Ok(base);
    }
    if let (Expr::Num(b), Expr::Num(e)) = (&base, &exp) {
        let v = power(*b, *e);
        if v.is_finite() {
            return Ok(Expr::Num(tidy(v)));
        }
        return Ok(Expr::Pow(Box::new(base), Box::new(exp)));
    }
    if is_integer(&exp) {
        match base {
            Expr::Pow(inner_base, inner_exp) => {
                let merged = canon_mul(vec![*inner_exp, exp], deadline)?;
                return canon_pow(*inner_base, merged, deadline);
            }
            Expr::Mul(items) => {
                let distributed = items
                    .into_iter()
                    .map(|item| canon_pow(item, exp.clone(), deadline))
                    .collect::<Result<Vec<_>, _>>()?;
                return canon_mul(distributed, deadline);
            }
            other => return Ok(Expr::Pow(Box::new(other), Box::new(exp))),
        }
    }
    Ok(Expr::Pow(Box::new(base), Box::new(exp)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::parser::parse_expr;

    fn canon_str(input: &str) -> Expr {
        canonicalize(&parse_expr(input).unwrap(), &Deadline::unbounded()).unwrap()
    }

    #[test]
    fn test_commutativity() {
        assert_eq!(canon_str("x+1"), canon_str("1+x"));
        assert_eq!(canon_str("2*x*y"), canon_str("y*x*2"));
    }

    #[test]
    fn test_like_terms_collect() {
        assert_eq!(canon_str("x + x"), canon_str("2x"));
        assert_eq!(canon_str("3x - x - 2x"), Expr::Num(0.0));
    }

    #[test]
    fn test_powers_merge() {
        assert_eq!(canon_str("x*x"), canon_str("x^2"));
        assert_eq!(canon_str("x/x"), Expr::Num(1.0));
        assert_eq!(canon_str("(x y)^2"), canon_str("x^2 y^2"));
    }

    #[test]
    fn test_constant_folding() {
        assert_eq!(canon_str("\\frac{1}{2} + \\frac{1}{2}"), Expr::Num(1.0));
        assert_eq!(canon_str("0.1 + 0.2"), canon_str("0.3"));
        assert_eq!(canon_str("0 * x"), Expr::Num(0.0));
    }

    #[test]
    fn test_small_coefficients_survive() {
        assert_eq!(
            canon_str("x + 0.000000000001 - x"),
            Expr::Num(0.000000000001)
        );
        assert_eq!(canon_str("10^{-20}"), Expr::Num(1e-20));
        assert_ne!(canon_str("(1 + 10^{-13}) x"), canon_str("x"));
        // Rounding noise from cancellation still folds away.
        assert_eq!(canon_str("0.1 + 0.2 - 0.3"), Expr::Num(0.0));
    }

    #[test]
    fn test_distinct_expressions_stay_distinct() {
        assert_ne!(canon_str("x"), canon_str("y"));
        assert_ne!(canon_str("x+1"), canon_str("x+2"));
    }

    #[test]
    fn test_size_guard() {
        let big = Expr::Add((0..MAX_NODES + 1).map(|i| Expr::num(i as f64)).collect());
        assert!(matches!(
            canonicalize(&big, &Deadline::unbounded()),
            Err(SymbolicError::TooLarge(_))
        ));
    }

    #[test]
    fn test_expired_deadline_aborts() {
        let expired = Deadline::after(std::time::Duration::ZERO);
        assert!(matches!(
            canonicalize(&Expr::sym("x"), &expired),
            Err(SymbolicError::Timeout)
        ));
    }
}
