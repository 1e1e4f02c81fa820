//! Numeric normalization: unit stripping followed by a float cast or, for
//! closed-form constants, evaluation.

use crate::answer::Domain;
use crate::symbolic::{evaluate_const, parse_expr};

/// Physics units stripped in the science domain, in order.
const PHYSICS_UNITS: &[&str] = &[
    "eV",
    " \\mathrm{~kg} \\cdot \\mathrm{m} / \\mathrm{s}",
    " kg m/s",
    "kg*m/s",
    "kg",
    "m/s",
    "m / s",
    "m s^{-1}",
    "\\text{ m/s}",
    " \\mathrm{m/s}",
    " \\text{ m/s}",
    "g/mole",
    "g/mol",
    "\\mathrm{~g}",
    "\\mathrm{~g} / \\mathrm{mol}",
    "W",
    "erg/s",
    "years",
    "year",
    "cm",
];

/// Units that appear wrapped in `\mathrm{...}` or `\mathrm{~...}`.
const MATHRM_UNITS: &[&str] = &["m", "s", "cm"];

fn strip_physics_units(raw: &str) -> String {
    let mut text = raw.to_string();
    for unit in PHYSICS_UNITS {
        text = text.replace(unit, "").trim().to_string();
    }
    for unit in MATHRM_UNITS {
        text = text
            .replace(&format!("\\mathrm{{{unit}}}"), "")
            .replace(&format!("\\mathrm{{~{unit}}}"), "")
            .trim()
            .to_string();
    }
    text
}

fn strip_digit_grouping(raw: &str) -> String {
    raw.replace(',', "").trim().trim_end_matches('.').to_string()
}

/// Casts text to a finite float, falling back to evaluating it as a
/// constant expression (`1/2`, `\frac{3}{4}`, `2\pi`).
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(value) = text.parse::<f64>() {
        return value.is_finite().then_some(value);
    }
    let expr = parse_expr(text).ok()?;
    evaluate_const(&expr).ok()
}

/// Normalizes `raw` to a float, or `None` when it is not a number in
/// `domain`.
///
/// The arithmetic domain only removes digit grouping; the symbolic domains
/// strip a table of physics units first.
pub fn normalize_numeric(raw: &str, domain: Domain) -> Option<f64> {
    let text = match domain {
        Domain::Arithmetic => strip_digit_grouping(raw),
        Domain::SymbolicExpression | Domain::SymbolicEquationOrExpression => {
            strip_physics_units(raw)
        }
    };
    parse_number(text.trim_matches('$'))
}
