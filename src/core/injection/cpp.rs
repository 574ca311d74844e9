use std::sync::LazyLock;

use regex::Regex;

static MAIN_SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bint\s+main\s*\(([^)]*)\)\s*\{").unwrap());

static TRAILING_RETURN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"return\s+0\s*;\s*$").unwrap());

const HEADERS: &str = "#include <iostream>\n#include <sstream>\n#include <string>\n";

/// Rebuilds `main` so that `std::cin` reads from an `istringstream` over the
/// input. The original body runs inside a lambda, so `cin` is restored however
/// the body returns. Source without a recognizable `int main(...) {` is
/// returned unchanged.
pub(super) fn inject(source: &str, input: &str) -> String {
    let Some(signature) = MAIN_SIGNATURE.captures(source) else {
        tracing::warn!("No entry point found, input not injected");
        return source.to_string();
    };
    let (Some(whole), Some(params)) = (signature.get(0), signature.get(1)) else {
        return source.to_string();
    };
    let Some(close) = matching_brace(source, whole.end()) else {
        tracing::warn!("Unbalanced entry point body, input not injected");
        return source.to_string();
    };

    let prefix = &source[..whole.start()];
    let body = source[whole.end()..close].trim();
    let body = TRAILING_RETURN.replace(body, "");
    let suffix = &source[close + 1..];

    format!(
        "{HEADERS}{prefix}int main({params}) {{\n\
         \x20   std::istringstream __judge_input({literal});\n\
         \x20   std::streambuf* __judge_original = std::cin.rdbuf(__judge_input.rdbuf());\n\
         \x20   int __judge_status = [&]() -> int {{\n\
         {body}\n\
         \x20   return 0;\n\
         \x20   }}();\n\
         \x20   std::cin.rdbuf(__judge_original);\n\
         \x20   return __judge_status;\n\
         }}{suffix}",
        params = params.as_str(),
        literal = literal(input),
    )
}

/// Index of the `}` closing the block whose body starts at `start`. String
/// and character literals, raw strings and comments are skipped.
fn matching_brace(source: &str, start: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 1usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = find_from(bytes, i + 2, b"\n")?;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = find_from(bytes, i + 2, b"*/")? + 1;
            }
            b'R' if bytes.get(i + 1) == Some(&b'"') && !is_ident_byte(bytes, i) => {
                let open = find_from(bytes, i + 2, b"(")?;
                let mut terminator = Vec::with_capacity(open - i);
                terminator.push(b')');
                terminator.extend_from_slice(&bytes[i + 2..open]);
                terminator.push(b'"');
                i = find_from(bytes, open + 1, &terminator)? + terminator.len() - 1;
            }
            b'\'' if is_digit_separator(bytes, i) => {}
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// True when the byte before `at` continues an identifier, e.g. `fooR"`.
fn is_ident_byte(bytes: &[u8], at: usize) -> bool {
    at > 0 && (bytes[at - 1].is_ascii_alphanumeric() || bytes[at - 1] == b'_')
}

/// True when the `'` at `at` sits inside a number, as in `1'000'000`.
/// Prefixed character literals such as `L'x'` start with a letter instead.
fn is_digit_separator(bytes: &[u8], at: usize) -> bool {
    let token_start = bytes[..at]
        .iter()
        .rposition(|b| !(b.is_ascii_alphanumeric() || matches!(*b, b'\'' | b'.' | b'_')))
        .map_or(0, |pos| pos + 1);
    token_start < at && bytes[token_start].is_ascii_digit()
}

fn find_from(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| from + pos)
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
            // Keeps `??x` from being read as a trigraph
            '?' => out.push_str("\\?"),
            c if c.is_control() => out.push_str(&format!("\\{:03o}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
