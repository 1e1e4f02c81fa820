//! Balanced-brace helpers for LaTeX commands.

/// Byte index of the `}` that closes the `{` at byte index `open`.
pub fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.get(open..)?.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Replaces every `\cmd{body}` with `body`, counting brace depth so nested
/// groups survive intact. Occurrences without a closing brace are kept.
pub fn unwrap_command(text: &str, cmd: &str) -> String {
    let needle = format!("\\{cmd}{{");
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(&needle) {
        let open = pos + needle.len() - 1;
        match matching_brace(rest, open) {
            Some(close) => {
                out.push_str(&rest[..pos]);
                out.push_str(&unwrap_command(&rest[open + 1..close], cmd));
                rest = &rest[close + 1..];
            }
            None => {
                out.push_str(&rest[..=open]);
                rest = &rest[open + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}
