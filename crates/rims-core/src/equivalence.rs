//! EquivalenceChecker: domain-aware, time-bounded answer comparison.
//!
//! Every comparison is total. Parse failures, undecidable samples and
//! timeouts all collapse to "not equivalent" at this boundary.

use std::time::Duration;

use crate::answer::{Answer, Domain, Equation};
use crate::metrics::METRICS;
use crate::normalize::Normalizer;
use crate::obs;
use crate::symbolic::{self, difference_is_zero, equations_match, Parsed, SymbolicError};
use crate::worker::{run_with_deadline, Deadline, WorkerError};

/// Default absolute tolerance for arithmetic answers.
pub const DEFAULT_ARITHMETIC_TOLERANCE: f64 = 1e-3;
/// Default relative tolerance for numeric answers in the science domain.
pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 1e-2;
/// Default wall-clock budget for one symbolic comparison.
pub const DEFAULT_SYMBOLIC_TIME_LIMIT: Duration = Duration::from_millis(5000);

/// Closeness test for two numbers under tolerance `tol`.
///
/// Exact matches short-circuit. When either value, or their difference, is
/// within `tol` of zero the difference is compared against `tol` scaled by
/// the mean magnitude (never below `tol` itself); otherwise a combined
/// absolute/relative test is used.
pub fn is_equiv_numeric(a: f64, b: f64, tol: f64) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    let diff = (a - b).abs();
    if a.abs() < tol || b.abs() < tol || diff < tol {
        return diff < tol * ((a.abs() + b.abs()) / 2.0).max(1.0);
    }
    diff <= 1e-8 + tol * a.abs().max(b.abs())
}

/// How two numeric answers are compared.
#[derive(Debug, Clone, Copy, PartialEq)]
enum NumericRule {
    /// `|a - b| < tol`.
    Absolute(f64),
    /// [`is_equiv_numeric`] with the given tolerance.
    Relative(f64),
}

/// Compares normalized answers for one domain.
#[derive(Debug, Clone, PartialEq)]
pub struct EquivalenceChecker {
    domain: Domain,
    numeric: NumericRule,
    time_limit: Duration,
}

impl EquivalenceChecker {
    /// Checker with explicit tolerances. `tolerance` is absolute in the
    /// arithmetic domain and relative elsewhere.
    pub fn new(domain: Domain, tolerance: f64, time_limit: Duration) -> Self {
        let numeric = match domain {
            Domain::Arithmetic => NumericRule::Absolute(tolerance),
            _ => NumericRule::Relative(tolerance),
        };
        Self {
            domain,
            numeric,
            time_limit,
        }
    }

    /// Checker with the default tolerances for `domain`.
    pub fn for_domain(domain: Domain) -> Self {
        let tolerance = match domain {
            Domain::Arithmetic => DEFAULT_ARITHMETIC_TOLERANCE,
            _ => DEFAULT_RELATIVE_TOLERANCE,
        };
        Self::new(domain, tolerance, DEFAULT_SYMBOLIC_TIME_LIMIT)
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn tolerance(&self) -> f64 {
        match self.numeric {
            NumericRule::Absolute(t) | NumericRule::Relative(t) => t,
        }
    }

    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.domain)
    }

    /// Whether two normalized answers are equivalent.
    pub fn is_equiv(&self, a: &Answer, b: &Answer) -> bool {
        self.decide(a, b).unwrap_or(false)
    }

    /// Like [`is_equiv`](Self::is_equiv) but `None` when either side is
    /// `Invalid`, so callers can tell "undecidable" from "different".
    pub fn decide(&self, a: &Answer, b: &Answer) -> Option<bool> {
        METRICS.inc_equivalence_checks();
        match (a, b) {
            (Answer::Invalid, _) | (_, Answer::Invalid) => None,
            (Answer::Numeric(x), Answer::Numeric(y)) => Some(self.numbers_match(*x, *y)),
            (Answer::Symbolic(x), Answer::Symbolic(y)) => Some(self.is_equiv_symbolic(x, y)),
            (Answer::Equation(x), Answer::Equation(y)) => Some(self.is_equiv_equation(x, y)),
            _ => Some(false),
        }
    }

    /// Normalizes a candidate and a reference answer for this domain and
    /// compares them. This is the grading primitive.
    pub fn grade(&self, candidate: &str, ground_truth: &str) -> bool {
        let normalizer = self.normalizer();
        self.is_equiv(
            &normalizer.normalize(candidate),
            &normalizer.normalize(ground_truth),
        )
    }

    fn numbers_match(&self, a: f64, b: f64) -> bool {
        match self.numeric {
            NumericRule::Absolute(tol) => a == b || (a - b).abs() < tol,
            NumericRule::Relative(tol) => is_equiv_numeric(a, b, tol),
        }
    }

    /// Compares two normalized LaTeX strings.
    ///
    /// Whitespace-insensitive exact match first; otherwise the difference is
    /// tested for zero on a worker bounded by the checker's time limit.
    pub fn is_equiv_symbolic(&self, a: &str, b: &str) -> bool {
        if a.is_empty() || b.is_empty() || a == "nan" || b == "nan" {
            return false;
        }
        if strip_spaces(a) == strip_spaces(b) {
            return true;
        }

        let (lhs, rhs) = (a.to_string(), b.to_string());
        let outcome = run_with_deadline(self.time_limit, move |deadline| {
            symbolic_difference_is_zero(&lhs, &rhs, deadline)
        });
        match outcome {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(SymbolicError::Timeout)) | Err(WorkerError::Timeout { .. }) => {
                METRICS.inc_equivalence_timeouts();
                obs::emit_equivalence_timeout(a, b, self.time_limit.as_millis() as u64);
                false
            }
            Ok(Err(err)) => {
                obs::emit_equivalence_failed(a, b, &err);
                false
            }
            Err(err) => {
                obs::emit_equivalence_failed(a, b, &err);
                false
            }
        }
    }

    /// Structural comparison of two equations; no algebra across the `=`.
    pub fn is_equiv_equation(&self, a: &Equation, b: &Equation) -> bool {
        let deadline = Deadline::after(self.time_limit);
        match equations_match((&a.lhs, &a.rhs), (&b.lhs, &b.rhs), &deadline) {
            Ok(verdict) => verdict,
            Err(err) => {
                obs::emit_equivalence_failed(&a.text, &b.text, &err);
                false
            }
        }
    }
}

fn strip_spaces(s: &str) -> String {
    s.chars().filter(|c| *c != ' ').collect()
}

fn symbolic_difference_is_zero(a: &str, b: &str, deadline: &Deadline) -> Result<bool, SymbolicError> {
    match (symbolic::parse(a)?, symbolic::parse(b)?) {
        (Parsed::Expr(x), Parsed::Expr(y)) => difference_is_zero(&x, &y, deadline),
        (Parsed::Equation(al, ar), Parsed::Equation(bl, br)) => {
            equations_match((&al, &ar), (&bl, &br), deadline)
        }
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbolic() -> EquivalenceChecker {
        EquivalenceChecker::for_domain(Domain::SymbolicExpression)
    }

    #[test]
    fn test_numeric_exact_and_relative() {
        assert!(is_equiv_numeric(3.0, 3.0, 1e-3));
        assert!(!is_equiv_numeric(1.0, 1.01, 1e-3));
        assert!(is_equiv_numeric(1.0, 1.01, 2e-2));
        assert!(is_equiv_numeric(1000.0, 1000.5, 1e-3));
    }

    #[test]
    fn test_numeric_near_zero() {
        assert!(is_equiv_numeric(0.0, 0.0001, 1e-3));
        assert!(!is_equiv_numeric(0.0, 0.01, 1e-3));
        assert!(is_equiv_numeric(-2.0, -2.0005, 1e-3));
    }

    #[test]
    fn test_arithmetic_is_absolute() {
        let checker = EquivalenceChecker::for_domain(Domain::Arithmetic);
        assert!(checker.grade("3.0", "3"));
        assert!(checker.grade("1,000", "1000.0004"));
        assert!(!checker.grade("1000", "1000.5"));
    }

    #[test]
    fn test_invalid_is_undecidable() {
        let checker = EquivalenceChecker::for_domain(Domain::Arithmetic);
        assert_eq!(checker.decide(&Answer::Invalid, &Answer::Numeric(1.0)), None);
        assert_eq!(checker.decide(&Answer::Invalid, &Answer::Invalid), None);
        assert!(!checker.is_equiv(&Answer::Invalid, &Answer::Invalid));
    }

    #[test]
    fn test_cross_tag_is_false() {
        let checker = symbolic();
        assert_eq!(
            checker.decide(&Answer::Numeric(1.0), &Answer::Symbolic("1".into())),
            Some(false)
        );
    }

    #[test]
    fn test_symbolic() {
        let checker = symbolic();
        assert!(checker.is_equiv_symbolic("x+1", "1+x"));
        assert!(!checker.is_equiv_symbolic("x", "y"));
        assert!(checker.is_equiv_symbolic("\\frac{1}{2}", "0.5"));
        assert!(checker.is_equiv_symbolic("2 x", "2x"));
        assert!(!checker.is_equiv_symbolic("", ""));
    }

    #[test]
    fn test_symbolic_parse_failure_is_false() {
        assert!(!symbolic().is_equiv_symbolic("\\frac{1}{", "\\frac{1}{2}"));
    }

    #[test]
    fn test_equations_structural() {
        let checker = EquivalenceChecker::for_domain(Domain::SymbolicEquationOrExpression);
        assert!(checker.grade("y = 2x + 1", "$y = 1 + 2x$"));
        assert!(!checker.grade("y = 2x + 1", "y - 1 = 2x"));
    }

    #[test]
    fn test_science_grade_with_units() {
        let checker = EquivalenceChecker::for_domain(Domain::SymbolicEquationOrExpression);
        assert!(checker.grade("9.8 m/s", "9.81"));
        assert!(!checker.grade("9.0 m/s", "9.81"));
        assert!(!checker.grade("[invalidanswer]", "9.81"));
    }

    #[test]
    fn test_math_grade() {
        let checker = symbolic();
        assert!(checker.grade("\\boxed{\\frac{\\sqrt{2}}{2}}", "\\frac{1}{\\sqrt{2}}"));
        assert!(checker.grade("\\dfrac{3}{4}", "0.75"));
    }
}
