use std::sync::LazyLock;

use regex::{Captures, Regex};

static SCANNER_OVER_STDIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"new\s+((?:java\.util\.)?Scanner)\s*\(\s*System\s*\.\s*in\s*\)").unwrap()
});

static READER_OVER_STDIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"new\s+(?:java\.io\.)?InputStreamReader\s*\(\s*System\s*\.\s*in\s*\)").unwrap()
});

static SCANNER_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*import\s+java\.util\.(?:Scanner|\*)\s*;").unwrap()
});

static PACKAGE_DECL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*package\s+[\w.]+\s*;[^\n]*\n?").unwrap());

/// Rebuilds `Scanner` and `InputStreamReader` instances over `System.in` on a
/// `StringReader` holding the whole input. The string reader is referenced by
/// its qualified name, so only `Scanner` may need an import.
pub(super) fn inject(source: &str, input: &str) -> String {
    let reader = format!("new java.io.StringReader({})", literal(input));

    let mut replaced_scanner = false;
    let out = SCANNER_OVER_STDIN.replace_all(source, |caps: &Captures| {
        replaced_scanner = true;
        format!("new {}({})", &caps[1], reader)
    });
    let out = READER_OVER_STDIN
        .replace_all(&out, regex::NoExpand(&reader))
        .into_owned();

    if replaced_scanner && !SCANNER_IMPORT.is_match(&out) {
        add_import(&out, "import java.util.Scanner;")
    } else {
        out
    }
}

/// Imports must follow the package declaration when there is one.
fn add_import(source: &str, import: &str) -> String {
    match PACKAGE_DECL.find(source) {
        Some(decl) => {
            let (head, tail) = source.split_at(decl.end());
            let separator = if head.ends_with('\n') { "" } else { "\n" };
            format!("{head}{separator}{import}\n{tail}")
        }
        None => format!("{import}\n{source}"),
    }
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
            // Octal escapes reach \377, which covers every control character
            c if c.is_control() => out.push_str(&format!("\\{:03o}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
