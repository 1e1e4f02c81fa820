//! Pulling a final answer out of free-form chain-of-thought text.

use std::sync::LazyLock;

use regex::Regex;

static GROUPED_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[+\-]?(?:\d{1,3}(?:,\d{3})*|\d+)(?:\.\d+)?(?:[eE][+\-]?\d+)?")
        .expect("grouped number regex")
});
static PLAIN_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?").expect("plain number regex"));
static LATEX_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(?:\\\[|\\\(|\$).+?(?:\\\]|\\\)|\$)").expect("latex span regex")
});

/// Markers after which a chain-of-thought solution states its result.
const FINAL_ANSWER_MARKERS: &[&str] = &[
    "Final answer:",
    "Final Answer:",
    "The final answer is",
    "The final answer",
    "### Final Answer",
    "### Final answer",
];

const CLOSING_REMARK: &str = ". I hope it is correct.";

/// Last number in `text`, allowing comma grouping, a sign and an exponent.
fn last_number_text(text: &str) -> Option<String> {
    GROUPED_NUMBER
        .find_iter(text)
        .last()
        .map(|m| m.as_str().replace(',', ""))
}

/// Reads the answer of an arithmetic chain-of-thought solution: the last
/// number, with a leading "So the answer is " and a trailing period ignored.
pub fn extract_last_number(solution: &str) -> Option<f64> {
    let text = solution.trim().replace("So the answer is ", "");
    let number = last_number_text(&text)?;
    number.trim_end_matches('.').parse().ok()
}

/// Last plain number of a declared answer line, after dropping commas.
pub fn parse_num_from_answer(raw: &str) -> Option<f64> {
    let text = raw.replace(',', "");
    PLAIN_NUMBER.find_iter(&text).last()?.as_str().parse().ok()
}

/// Extracts the final answer of a symbolic chain-of-thought solution.
///
/// The text is cut after the latest final-answer marker and before the
/// closing remark; the last LaTeX span wins, else the last number.
pub fn extract_cot_answer(solution: &str) -> Option<String> {
    let mut text = solution;
    let latest_marker = FINAL_ANSWER_MARKERS
        .iter()
        .filter_map(|marker| text.rfind(marker).map(|idx| idx + marker.len()))
        .max();
    if let Some(end) = latest_marker {
        text = &text[end..];
    }
    if let Some(idx) = text.find(CLOSING_REMARK) {
        text = &text[..idx];
    }
    let text = text.trim();

    if let Some(span) = LATEX_SPAN.find_iter(text).last() {
        return Some(span.as_str().to_string());
    }
    last_number_text(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_last_number() {
        assert_eq!(
            extract_last_number("She has 3 apples and buys 1,200 more. So the answer is 1,203."),
            Some(1203.0)
        );
        assert_eq!(extract_last_number("no digits here"), None);
        assert_eq!(extract_last_number("drops to -2.5e1"), Some(-25.0));
    }

    #[test]
    fn test_parse_num_from_answer() {
        assert_eq!(parse_num_from_answer("The answer is 12,000"), Some(12000.0));
        assert_eq!(parse_num_from_answer("x = -0.75"), Some(-0.75));
        assert_eq!(parse_num_from_answer("unknown"), None);
    }

    #[test]
    fn test_extract_cot_answer_prefers_latex() {
        let solution = "We compute $x=2$ first.\nFinal Answer: The final answer is $\\frac{1}{2}$. I hope it is correct.";
        assert_eq!(extract_cot_answer(solution).as_deref(), Some("$\\frac{1}{2}$"));
    }

    #[test]
    fn test_extract_cot_answer_falls_back_to_number() {
        let solution = "The final answer is 42. I hope it is correct.";
        assert_eq!(extract_cot_answer(solution).as_deref(), Some("42"));
        assert_eq!(extract_cot_answer("nothing to see"), None);
    }
}
