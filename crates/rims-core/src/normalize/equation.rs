//! Equation normalization: light delimiter cleanup, then a parse that must
//! yield a single equality.

use crate::answer::{Answer, Equation, INVALID_ANSWER};
use crate::symbolic::{parse, Parsed};

fn clean_once(raw: &str) -> String {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("\\[") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("\\]") {
        s = rest;
    }
    let mut s = s
        .replace("\\left(", "(")
        .replace("\\right)", ")")
        .replace("\\\\", "\\");
    if s.starts_with('$') || s.ends_with('$') {
        s = s.trim_matches('$').to_string();
    }
    s.trim().to_string()
}

/// Strips display delimiters and parenthesis escaping until stable.
pub fn clean_equation_text(raw: &str) -> String {
    let mut current = clean_once(raw);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Parses `raw` as an equation. Anything that is not exactly one equality
/// is [`Answer::Invalid`].
pub fn normalize_equation(raw: &str) -> Answer {
    if raw.trim() == INVALID_ANSWER {
        return Answer::Invalid;
    }
    let text = clean_equation_text(raw);
    match parse(&text) {
        Ok(Parsed::Equation(lhs, rhs)) => Answer::Equation(Equation { lhs, rhs, text }),
        Ok(Parsed::Expr(_)) => {
            tracing::debug!(input = %raw, "not an equation");
            Answer::Invalid
        }
        Err(err) => {
            tracing::debug!(input = %raw, error = %err, "equation parse failed");
            Answer::Invalid
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_equation() {
        match normalize_equation("\\[y = \\left(x+1\\right)\\]") {
            Answer::Equation(eq) => assert_eq!(eq.text, "y = (x+1)"),
            other => panic!("expected equation, got {other:?}"),
        }
    }

    #[test]
    fn test_expression_is_invalid() {
        assert!(normalize_equation("x + 1").is_invalid());
        assert!(normalize_equation("x = = 1").is_invalid());
        assert!(normalize_equation(INVALID_ANSWER).is_invalid());
    }

    #[test]
    fn test_clean_is_idempotent() {
        let once = clean_equation_text("$$\\\\\\\\frac{a}{b} = c$$");
        assert_eq!(clean_equation_text(&once), once);
    }
}
