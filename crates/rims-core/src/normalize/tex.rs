//! Textual normalization of LaTeX final answers.
//!
//! The passes run in a fixed order: delimiter stripping, right-hand side of
//! the last `=`, substitution and removal tables, `$...$` extraction,
//! balanced unwrapping of wrapper commands, shorthand macro expansion and
//! digit-group collapsing. The whole pipeline is repeated until the text
//! stops changing, which makes it idempotent.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::braces::unwrap_command;

/// Ordered `(before, after)` replacements collapsing formatting noise.
pub const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("an ", ""),
    ("a ", ""),
    (".$", "$"),
    ("\\$", ""),
    ("\\ ", ""),
    (" ", ""),
    ("mbox", "text"),
    (",\\text{and}", ","),
    ("\\text{and}", ","),
    ("\\text{m}", "\\text{}"),
];

/// Unit and filler tokens deleted outright, in order.
pub const REMOVED_EXPRESSIONS: &[&str] = &[
    "\\left",
    "\\right",
    "square",
    "ways",
    "integers",
    "dollars",
    "mph",
    "inches",
    "ft",
    "hours",
    "km",
    "units",
    "\\ldots",
    "sue",
    "points",
    "feet",
    "minutes",
    "digits",
    "cents",
    "degrees",
    "cm",
    "gm",
    "pounds",
    "meters",
    "meals",
    "edges",
    "students",
    "childrentickets",
    "multiples",
    "\\text{s}",
    "\\text{.}",
    "\\text{}^2",
    "\\text{}^3",
    "\\text{}",
    "\\mathrm{th}",
    "^\\circ",
    "^{\\circ}",
    "\\;",
    ",\\!",
    "{,}",
    "\"",
    "\\dots",
];

/// Commands whose braces are dropped, keeping the contents.
const WRAPPERS: &[&str] = &["text", "textbf", "overline", "boxed"];

const MAX_PASSES: usize = 32;

static TRAILING_BRACKET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\.?\d*)\]$").expect("trailing bracket regex"));
static DOLLAR_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.*?)(\$)(.*?)(\$)(.*)").expect("dollar span regex"));
static FRAC_SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(frac)([^{])(.)").expect("frac shorthand regex"));
static SQRT_SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(sqrt)([^{])").expect("sqrt shorthand regex"));

fn strip_delimiters(mut text: &str) -> &str {
    for (open, close) in [("\\(", "\\)"), ("\\[", "\\]")] {
        while text.len() >= open.len() + close.len()
            && text.starts_with(open)
            && text.ends_with(close)
        {
            text = text[open.len()..text.len() - close.len()].trim();
        }
    }
    text
}

fn normalize_once(raw: &str) -> String {
    let joined = raw.replace('\n', "");
    let stripped = strip_delimiters(joined.trim());

    let mut text = match TRAILING_BRACKET.captures(stripped) {
        Some(caps) => caps[1].to_string(),
        None => stripped.to_string(),
    };

    if let Some(idx) = text.rfind('=') {
        text = text[idx + 1..].to_string();
    }

    for (before, after) in SUBSTITUTIONS {
        text = text.replace(before, after);
    }
    for expr in REMOVED_EXPRESSIONS {
        text = text.replace(expr, "");
    }

    text = DOLLAR_SPAN
        .replace(&text, |caps: &Captures| format!("${}$", &caps[3]))
        .into_owned();
    for cmd in WRAPPERS {
        text = unwrap_command(&text, cmd);
    }

    text = FRAC_SHORTHAND
        .replace_all(&text, |caps: &Captures| format!("frac{{{}}}{{{}}}", &caps[2], &caps[3]))
        .into_owned();
    text = SQRT_SHORTHAND
        .replace_all(&text, |caps: &Captures| format!("sqrt{{{}}}", &caps[2]))
        .into_owned();
    text = text.replace('$', "");

    let without_commas = text.replace(',', "");
    if !without_commas.is_empty() && without_commas.chars().all(|c| c.is_ascii_digit()) {
        text = without_commas;
    }
    text
}

/// Normalizes a LaTeX final answer into its canonical comparison string.
pub fn normalize_final_answer(raw: &str) -> String {
    let mut current = normalize_once(raw);
    for _ in 0..MAX_PASSES {
        let next = normalize_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}
