//! Rewrites raw query text into a single line with explicit nesting markers.
//!
//! After normalization every `{` is preceded by [`START_SENTINEL`], every `}`
//! is followed by [`END_SENTINEL`], argument lists are comma separated and
//! every other separator is a single space. Names containing either sentinel
//! are not supported.

/// Marker prepended to every opening brace.
pub const START_SENTINEL: &str = "@@start@@";
/// Marker appended to every closing brace.
pub const END_SENTINEL: &str = "@@end@@";

/// Normalizes a query document.
///
/// The single leading `{` wrapping the document is removed; its closing
/// partner is kept and ends the document during tree building.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim_start();
    let body = trimmed.strip_prefix('{').unwrap_or(trimmed);

    let marked = body
        .replace('}', &format!("}}{END_SENTINEL}"))
        .replace('{', &format!("{START_SENTINEL}{{"));

    let mut out = String::with_capacity(marked.len());
    let mut depth = 0usize;
    let mut pending_space = false;
    for ch in marked.chars() {
        match ch {
            '(' => {
                depth += 1;
                pending_space = false;
                out.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                pending_space = false;
                trim_trailing_commas(&mut out);
                out.push(ch);
            }
            c if depth > 0 && (c.is_whitespace() || c == ',') => {
                // Inside an argument list every separator run becomes one comma.
                if !out.ends_with('(') && !out.ends_with(',') && !out.ends_with(':') {
                    out.push(',');
                }
            }
            c if c.is_whitespace() || c == ',' => {
                pending_space = !out.is_empty();
            }
            ':' => {
                // `key : value`, `key: value` and `key:value` are equivalent.
                if depth > 0 {
                    trim_trailing_commas(&mut out);
                }
                pending_space = false;
                out.push(ch);
            }
            _ => {
                if pending_space && !out.ends_with(':') {
                    out.push(' ');
                }
                pending_space = false;
                out.push(ch);
            }
        }
    }
    out.trim().to_owned()
}

fn trim_trailing_commas(out: &mut String) {
    while out.ends_with(',') {
        out.pop();
    }
}
