//! Cleanup of generated code before it is executed.
//!
//! Model output arrives wrapped in markdown fences, mixed with commentary and
//! full of `print` calls. [`PreparedCode::from_raw`] keeps the code, disables
//! the prints and finds the function whose return value is the answer.

use std::sync::LazyLock;

use regex::Regex;

const FENCE: &str = "```";

static TOP_LEVEL_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^def\s+(\w+)\s*\((.*)\)\s*(?:->[^:]*)?:").expect("def regex")
});

static LANGUAGE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][\w+.-]*$").expect("language tag regex"));

/// Generated code ready to hand to an interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCode {
    pub source: String,
    /// Top-level function callable without arguments, when there is one.
    pub entry: Option<String>,
    /// Expression in the entry function's outermost `return`.
    pub return_expr: Option<String>,
}

impl PreparedCode {
    pub fn from_raw(raw: &str) -> Self {
        let source = neutralize_prints(&strip_fences(raw));
        let (entry, return_expr) = match locate_entry_point(&source) {
            Some(EntryPoint { name, return_expr }) => (Some(name), return_expr),
            None => (None, None),
        };
        Self {
            source,
            entry,
            return_expr,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source.trim().is_empty()
    }
}

/// A function the harness calls to obtain the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: String,
    pub return_expr: Option<String>,
}

/// Returns the code inside markdown fences, or the whole text when unfenced.
///
/// With several fenced blocks the last Python-tagged one wins, else the first
/// block. An opening fence without a closing one runs to the end of the text.
pub fn strip_fences(raw: &str) -> String {
    let parts: Vec<&str> = raw.split(FENCE).collect();
    if parts.len() == 1 {
        return dedent(raw.trim_end());
    }

    let blocks: Vec<&str> = parts
        .iter()
        .skip(1)
        .step_by(2)
        .copied()
        .filter(|block| !block.trim().is_empty())
        .collect();
    // Only a stray closing fence: the code is what precedes it.
    let Some(first) = blocks.first().copied() else {
        return dedent(parts[0].trim_end());
    };
    let chosen = blocks
        .iter()
        .rev()
        .find(|block| is_python_tag(first_line(block)))
        .copied()
        .unwrap_or(first);

    let tag = first_line(chosen);
    let body = if tag.trim().is_empty() || LANGUAGE_TAG.is_match(tag.trim()) {
        chosen.split_once('\n').map(|(_, rest)| rest).unwrap_or("")
    } else {
        chosen
    };
    dedent(body.trim_end())
}

fn first_line(text: &str) -> &str {
    text.split('\n').next().unwrap_or("")
}

fn is_python_tag(tag: &str) -> bool {
    matches!(tag.trim().to_ascii_lowercase().as_str(), "python" | "python3" | "py")
}

/// Removes the indentation shared by every non-blank line.
fn dedent(code: &str) -> String {
    let lines: Vec<&str> = code
        .lines()
        .skip_while(|line| line.trim().is_empty())
        .collect();
    let shared = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| indentation(line).len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| line.get(shared..).unwrap_or("").trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Replaces statement-level `print(...)` calls with `pass`, keeping the
/// indentation so blocks whose only statement was a print stay valid.
/// Continuation lines of a multi-line print are commented out.
pub fn neutralize_prints(code: &str) -> String {
    let mut out = Vec::new();
    let mut open_parens = 0i32;

    for line in code.lines() {
        let trimmed = line.trim_start();
        let indent = indentation(line);
        if open_parens > 0 {
            open_parens += paren_balance(trimmed);
            out.push(format!("{indent}# {trimmed}"));
            continue;
        }
        if trimmed.starts_with("print(") || trimmed.starts_with("print (") {
            out.push(format!("{indent}pass  # {trimmed}"));
            open_parens = paren_balance(trimmed).max(0);
        } else {
            out.push(line.to_string());
        }
    }
    out.join("\n")
}

/// Net open brackets on a line, outside string literals and comments.
fn paren_balance(text: &str) -> i32 {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(_), '\\') => {
                chars.next();
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '#') => break,
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth -= 1,
            (None, _) => {}
        }
    }
    depth
}

/// True when every parameter in a `def` signature has a default, so the
/// function can be called with no arguments.
fn callable_without_arguments(params: &str) -> bool {
    split_top_level(params).into_iter().all(|param| {
        let param = param.trim();
        param.is_empty()
            || param == "*"
            || param == "/"
            || param.starts_with('*')
            || param.contains('=')
    })
}

/// Splits on commas that are not nested inside brackets or strings.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut depth = 0;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Finds the top-level function to call: `solution` when it exists,
/// otherwise the first one defined. Only functions callable without
/// arguments (no parameters, or defaults for all of them) qualify.
pub fn locate_entry_point(code: &str) -> Option<EntryPoint> {
    let lines: Vec<&str> = code.lines().collect();
    let mut found = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(caps) = TOP_LEVEL_DEF.captures(line) else {
            continue;
        };
        if !callable_without_arguments(&caps[2]) {
            continue;
        }
        found.push(EntryPoint {
            name: caps[1].to_string(),
            return_expr: outermost_return(&lines[i + 1..]),
        });
    }

    if found.is_empty() {
        return None;
    }
    let pos = found
        .iter()
        .position(|entry| entry.name == "solution")
        .unwrap_or(0);
    Some(found.swap_remove(pos))
}

/// The first `return` at the body's own indentation level.
fn outermost_return(body: &[&str]) -> Option<String> {
    let body: Vec<&str> = body
        .iter()
        .take_while(|line| line.trim().is_empty() || line.starts_with(char::is_whitespace))
        .copied()
        .collect();
    let depth = body
        .iter()
        .find(|line| !line.trim().is_empty())
        .map(|line| indentation(line).len())?;

    body.iter()
        .filter(|line| indentation(line).len() == depth)
        .find_map(|line| line.trim().strip_prefix("return "))
        .map(|expr| expr.trim().to_string())
}
