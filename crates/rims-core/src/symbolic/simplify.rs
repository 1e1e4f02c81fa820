//! Zero testing of expression differences.
//!
//! `a - b` is first canonicalized; if that folds to zero the expressions are
//! equal. Otherwise both sides are evaluated at a fixed set of sample points
//! and must agree at every point that yields a finite value on both sides.

use super::canonical::canonicalize;
use super::eval::evaluate;
use super::expr::Expr;
use super::SymbolicError;
use crate::worker::Deadline;

/// Irrational-ish sample coordinates, chosen to avoid the special points of
/// the trigonometric and logarithmic functions.
const SAMPLES: [f64; 8] = [
    0.577_215_664_9,
    1.324_717_957_2,
    2.685_452_001_0,
    0.915_965_594_2,
    1.618_033_988_7,
    3.359_885_666_2,
    0.318_309_886_2,
    1.202_056_903_2,
];

const ROUNDS: usize = 6;
const MIN_VALID_POINTS: usize = 3;
/// Relative agreement required at sample points when symbols are present.
const SAMPLE_TOL: f64 = 1e-9;
/// Constant expressions must agree to within a few ulps.
const CONSTANT_TOL: f64 = 8.0 * f64::EPSILON;

fn sample_value(round: usize, var: usize) -> f64 {
    SAMPLES[(round + 2 * var) % SAMPLES.len()] + 0.0371 * var as f64
}

/// Sorted so that both argument orders sample the same points.
fn union_symbols(a: &Expr, b: &Expr) -> Vec<String> {
    let mut symbols = a.free_symbols();
    symbols.extend(b.free_symbols());
    symbols.sort();
    symbols.dedup();
    symbols
}

/// Decides whether `a - b` is identically zero.
///
/// Returns `Ok(false)` on the first sample point where the sides disagree and
/// [`SymbolicError::Undecidable`] when too few points evaluate to finite
/// values to trust an "equal" verdict.
pub fn difference_is_zero(a: &Expr, b: &Expr, deadline: &Deadline) -> Result<bool, SymbolicError> {
    let diff = canonicalize(&a.clone().sub(b.clone()), deadline)?;
    if diff.is_zero() {
        return Ok(true);
    }
    if diff.as_num().is_some() {
        return Ok(false);
    }

    let symbols = union_symbols(a, b);
    let (needed, tol) = if symbols.is_empty() {
        (1, CONSTANT_TOL)
    } else {
        (MIN_VALID_POINTS, SAMPLE_TOL)
    };
    let mut valid = 0;
    for round in 0..ROUNDS {
        if deadline.expired() {
            return Err(SymbolicError::Timeout);
        }
        let lookup = |name: &str| {
            symbols
                .iter()
                .position(|s| s == name)
                .map(|var| sample_value(round, var))
        };
        let va = evaluate(a, &lookup);
        let vb = evaluate(b, &lookup);
        if !va.is_finite() || !vb.is_finite() {
            continue;
        }
        valid += 1;
        if (va - vb).abs() > tol * va.abs().max(vb.abs()).max(1.0) {
            return Ok(false);
        }
        if symbols.is_empty() {
            break;
        }
    }

    if valid >= needed {
        Ok(true)
    } else {
        Err(SymbolicError::Undecidable)
    }
}

/// Structural comparison of two equations after canonicalizing each side.
///
/// Sides are compared in order; `x = 1` and `1 = x` are distinct.
pub fn equations_match(
    left: (&Expr, &Expr),
    right: (&Expr, &Expr),
    deadline: &Deadline,
) -> Result<bool, SymbolicError> {
    let ll = canonicalize(left.0, deadline)?;
    let lr = canonicalize(left.1, deadline)?;
    let rl = canonicalize(right.0, deadline)?;
    let rr = canonicalize(right.1, deadline)?;
    Ok(ll == rl && lr == rr)
}
