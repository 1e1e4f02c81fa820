//! Expression tree shared by the parser, canonicalizer and evaluator.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Relative slack, a few ulps, for floating noise in folded literals.
pub(crate) const NUM_EPS: f64 = 8.0 * f64::EPSILON;

/// Named mathematical constants recognized by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constant {
    Pi,
}

impl Constant {
    pub fn value(self) -> f64 {
        match self {
            Constant::Pi => std::f64::consts::PI,
        }
    }
}

/// Unary functions recognized by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Sec,
    Csc,
    Cot,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Ln,
    Exp,
    Abs,
    Factorial,
}

impl Func {
    /// Looks up a function by its LaTeX command or plain-text name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "sec" => Func::Sec,
            "csc" => Func::Csc,
            "cot" => Func::Cot,
            "arcsin" | "asin" => Func::Asin,
            "arccos" | "acos" => Func::Acos,
            "arctan" | "atan" => Func::Atan,
            "sinh" => Func::Sinh,
            "cosh" => Func::Cosh,
            "tanh" => Func::Tanh,
            "ln" | "log" => Func::Ln,
            "exp" => Func::Exp,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Sec => "sec",
            Func::Csc => "csc",
            Func::Cot => "cot",
            Func::Asin => "asin",
            Func::Acos => "acos",
            Func::Atan => "atan",
            Func::Sinh => "sinh",
            Func::Cosh => "cosh",
            Func::Tanh => "tanh",
            Func::Ln => "ln",
            Func::Exp => "exp",
            Func::Abs => "abs",
            Func::Factorial => "factorial",
        }
    }

    pub fn apply(self, x: f64) -> f64 {
        match self {
            Func::Sin => x.sin(),
            Func::Cos => x.cos(),
            Func::Tan => x.tan(),
            Func::Sec => 1.0 / x.cos(),
            Func::Csc => 1.0 / x.sin(),
            Func::Cot => 1.0 / x.tan(),
            Func::Asin => x.asin(),
            Func::Acos => x.acos(),
            Func::Atan => x.atan(),
            Func::Sinh => x.sinh(),
            Func::Cosh => x.cosh(),
            Func::Tanh => x.tanh(),
            Func::Ln => x.ln(),
            Func::Exp => x.exp(),
            Func::Abs => x.abs(),
            Func::Factorial => factorial(x),
        }
    }
}

fn factorial(x: f64) -> f64 {
    if x < 0.0 || x.fract() != 0.0 || x > 170.0 {
        return f64::NAN;
    }
    (1..=x as u64).fold(1.0, |acc, k| acc * k as f64)
}

/// An algebraic expression.
///
/// Subtraction is represented as addition of a `-1` product and division as
/// multiplication by a `-1` power, so canonicalization only has to reason
/// about sums, products and powers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum Expr {
    Num(f64),
    Sym(String),
    Const(Constant),
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Func(Func, Box<Expr>),
}

impl Expr {
    pub fn num(value: f64) -> Self {
        Expr::Num(value)
    }

    pub fn sym(name: impl Into<String>) -> Self {
        Expr::Sym(name.into())
    }

    pub fn neg(self) -> Self {
        Expr::Mul(vec![Expr::Num(-1.0), self])
    }

    pub fn sub(self, rhs: Expr) -> Self {
        Expr::Add(vec![self, rhs.neg()])
    }

    pub fn div(self, rhs: Expr) -> Self {
        Expr::Mul(vec![self, Expr::Pow(Box::new(rhs), Box::new(Expr::Num(-1.0)))])
    }

    pub fn pow(self, exponent: Expr) -> Self {
        Expr::Pow(Box::new(self), Box::new(exponent))
    }

    pub fn apply(func: Func, arg: Expr) -> Self {
        Expr::Func(func, Box::new(arg))
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Expr::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Num(n) if *n == 0.0)
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Num(n) if *n == 1.0)
    }

    /// Free symbol names in first-appearance order, without duplicates.
    pub fn free_symbols(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut Vec<String>) {
        match self {
            Expr::Sym(name) => {
                if !out.iter().any(|s| s == name) {
                    out.push(name.clone());
                }
            }
            Expr::Num(_) | Expr::Const(_) => {}
            Expr::Add(items) | Expr::Mul(items) => {
                for item in items {
                    item.collect_symbols(out);
                }
            }
            Expr::Pow(base, exp) => {
                base.collect_symbols(out);
                exp.collect_symbols(out);
            }
            Expr::Func(_, arg) => arg.collect_symbols(out),
        }
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        match self {
            Expr::Num(_) | Expr::Sym(_) | Expr::Const(_) => 1,
            Expr::Add(items) | Expr::Mul(items) => 1 + items.iter().map(Expr::size).sum::<usize>(),
            Expr::Pow(base, exp) => 1 + base.size() + exp.size(),
            Expr::Func(_, arg) => 1 + arg.size(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Expr::Num(_) => 0,
            Expr::Const(_) => 1,
            Expr::Sym(_) => 2,
            Expr::Pow(..) => 3,
            Expr::Mul(_) => 4,
            Expr::Add(_) => 5,
            Expr::Func(..) => 6,
        }
    }
}

/// Total structural order used to sort commutative operands.
///
/// Numbers closer than [`NUM_EPS`] (relative) compare equal.
pub fn compare(a: &Expr, b: &Expr) -> Ordering {
    match (a, b) {
        (Expr::Num(x), Expr::Num(y)) => {
            if nums_close(*x, *y) {
                Ordering::Equal
            } else {
                x.partial_cmp(y).unwrap_or(Ordering::Equal)
            }
        }
        (Expr::Sym(x), Expr::Sym(y)) => x.cmp(y),
        (Expr::Const(x), Expr::Const(y)) => x.cmp(y),
        (Expr::Add(xs), Expr::Add(ys)) | (Expr::Mul(xs), Expr::Mul(ys)) => compare_slices(xs, ys),
        (Expr::Pow(xb, xe), Expr::Pow(yb, ye)) => compare(xb, yb).then_with(|| compare(xe, ye)),
        (Expr::Func(xf, xa), Expr::Func(yf, ya)) => xf.cmp(yf).then_with(|| compare(xa, ya)),
        _ => a.rank().cmp(&b.rank()),
    }
}

fn compare_slices(xs: &[Expr], ys: &[Expr]) -> Ordering {
    for (x, y) in xs.iter().zip(ys) {
        let ord = compare(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    xs.len().cmp(&ys.len())
}

pub(crate) fn nums_close(x: f64, y: f64) -> bool {
    x == y || (x - y).abs() <= NUM_EPS * x.abs().max(y.abs())
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        compare(self, other) == Ordering::Equal
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Pi => write!(f, "pi"),
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, e: &Expr, parent_rank: u8) -> fmt::Result {
    let needs_parens = matches!(e, Expr::Add(_) | Expr::Mul(_)) && e.rank() >= parent_rank
        || matches!(e, Expr::Num(n) if *n < 0.0 && parent_rank <= 4);
    if needs_parens {
        write!(f, "({e})")
    } else {
        write!(f, "{e}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(n) => write!(f, "{n}"),
            Expr::Sym(s) => write!(f, "{s}"),
            Expr::Const(c) => write!(f, "{c}"),
            Expr::Add(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " + ")?;
                    }
                    write_operand(f, item, 6)?;
                }
                Ok(())
            }
            Expr::Mul(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, "*")?;
                    }
                    write_operand(f, item, 5)?;
                }
                Ok(())
            }
            Expr::Pow(base, exp) => {
                write_operand(f, base, 3)?;
                write!(f, "^")?;
                write_operand(f, exp, 3)
            }
            Expr::Func(func, arg) => write!(f, "{}({arg})", func.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_symbols_dedup_in_order() {
        let e = Expr::Add(vec![
            Expr::sym("y"),
            Expr::Mul(vec![Expr::sym("x"), Expr::sym("y")]),
        ]);
        assert_eq!(e.free_symbols(), vec!["y".to_string(), "x".to_string()]);
    }

    #[test]
    fn test_compare_numbers_with_slack() {
        assert_eq!(
            compare(&Expr::num(0.1 + 0.2), &Expr::num(0.3)),
            Ordering::Equal
        );
        assert_eq!(compare(&Expr::num(1.0), &Expr::num(2.0)), Ordering::Less);
    }

    #[test]
    fn test_numbers_sort_before_symbols() {
        assert_eq!(compare(&Expr::num(5.0), &Expr::sym("a")), Ordering::Less);
    }

    #[test]
    fn test_display() {
        let e = Expr::Add(vec![
            Expr::num(1.0),
            Expr::Mul(vec![Expr::num(2.0), Expr::sym("x").pow(Expr::num(2.0))]),
        ]);
        assert_eq!(e.to_string(), "1 + 2*x^2");
        assert_eq!(Expr::apply(Func::Sin, Expr::sym("x")).to_string(), "sin(x)");
    }

    #[test]
    fn test_factorial() {
        assert_eq!(Func::Factorial.apply(5.0), 120.0);
        assert!(Func::Factorial.apply(2.5).is_nan());
    }
}
