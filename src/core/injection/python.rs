use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::input_lines;

static READ_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\binput\s*\(\s*\)").unwrap());

/// Replaces `input()` calls in source order with the input lines. Calls past
/// the last line are left alone and hit end-of-file at runtime. Comments,
/// string literals and attribute calls such as `reader.input()` are skipped.
pub(super) fn inject(source: &str, input: &str) -> String {
    let mut lines = input_lines(input).into_iter();
    let skipped = comments_and_strings(source);

    let mut out = String::with_capacity(source.len() + input.len());
    let mut copied = 0;
    for call in READ_CALL.find_iter(source) {
        if skipped.iter().any(|span| span.contains(&call.start()))
            || source[..call.start()].trim_end().ends_with('.')
        {
            continue;
        }
        let Some(line) = lines.next() else {
            break;
        };
        out.push_str(&source[copied..call.start()]);
        out.push_str(&literal(line));
        copied = call.end();
    }
    out.push_str(&source[copied..]);
    out
}

/// Byte ranges of `#` comments and string literals, triple-quoted included.
fn comments_and_strings(source: &str) -> Vec<Range<usize>> {
    let bytes = source.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'#' => {
                let end = bytes[i..]
                    .iter()
                    .position(|b| *b == b'\n')
                    .map_or(bytes.len(), |pos| i + pos);
                spans.push(i..end);
                i = end;
            }
            quote @ (b'"' | b'\'') => {
                let triple = [quote; 3];
                let end = if bytes[i..].starts_with(&triple) {
                    string_end(bytes, i + 3, &triple)
                } else {
                    string_end(bytes, i + 1, &triple[..1])
                };
                spans.push(i..end);
                i = end;
            }
            _ => i += 1,
        }
    }
    spans
}

/// End of a literal opened just before `from`. Single-quoted literals stop at
/// an unescaped newline.
fn string_end(bytes: &[u8], mut from: usize, delimiter: &[u8]) -> usize {
    while from < bytes.len() {
        if bytes[from] == b'\\' {
            from += 2;
            continue;
        }
        if bytes[from..].starts_with(delimiter) {
            return from + delimiter.len();
        }
        if delimiter.len() == 1 && bytes[from] == b'\n' {
            return from;
        }
        from += 1;
    }
    bytes.len()
}

fn literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Every control character sits below U+0100
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
