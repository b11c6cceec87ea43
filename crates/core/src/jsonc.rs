//! JSON-with-comments support
//!
//! Hand-edited manifests routinely carry `//` line comments and `/* */` block
//! comments. [`strip_comments`] removes both in a single left-to-right pass
//! while leaving the contents of double-quoted strings untouched, so that a
//! value like `"https://example.com"` survives intact. The output is meant to
//! be handed to a strict JSON parser; anything malformed (including an
//! unterminated string) is copied through for that parser to reject.

/// Scanner position relative to string literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Outside any string literal; comments are recognized here
    Code,
    /// Inside a double-quoted string literal
    InString,
    /// Inside a string, directly after a backslash
    Escape,
}

/// Remove `//` and `/* */` comments from JSONC text.
///
/// Line comments are removed up to, but not including, the terminating
/// newline so line numbers reported by the JSON parser stay meaningful.
/// Block comments do not nest; an unterminated block comment consumes the
/// rest of the input.
///
/// ```rust
/// use hubpack_core::jsonc::strip_comments;
///
/// let text = "{\n  // base image\n  \"image\": \"python:3.11\" /* pinned */\n}";
/// let stripped = strip_comments(text);
/// let value: serde_json::Value = serde_json::from_str(&stripped).unwrap();
/// assert_eq!(value["image"], "python:3.11");
/// ```
pub fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut state = ScanState::Code;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            ScanState::Escape => {
                out.push(c);
                state = ScanState::InString;
            }
            ScanState::InString => {
                out.push(c);
                match c {
                    '\\' => state = ScanState::Escape,
                    '"' => state = ScanState::Code,
                    _ => {}
                }
            }
            ScanState::Code => match (c, chars.peek()) {
                ('"', _) => {
                    out.push(c);
                    state = ScanState::InString;
                }
                ('/', Some('/')) => {
                    while chars.next_if(|&next| next != '\n').is_some() {}
                }
                ('/', Some('*')) => {
                    chars.next();
                    let mut previous = '\0';
                    for next in chars.by_ref() {
                        if previous == '*' && next == '/' {
                            break;
                        }
                        previous = next;
                    }
                }
                _ => out.push(c),
            },
        }
    }

    out
}
