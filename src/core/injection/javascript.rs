use super::input_lines;

/// Prepends a `readline()` that yields the input lines in order, then `""`.
pub(super) fn inject(source: &str, input: &str) -> String {
    let lines = input_lines(input);
    // A JSON array of strings is a valid JS array literal with every
    // delimiter and control character escaped.
    let literal = serde_json::to_string(&lines).unwrap_or_else(|_| "[]".to_string());
    format!(
        "const __judgeInputLines = {literal};\n\
         let __judgeInputIndex = 0;\n\
         function readline() {{\n\
         \x20   return __judgeInputIndex < __judgeInputLines.length ? __judgeInputLines[__judgeInputIndex++] : \"\";\n\
         }}\n\
         {source}"
    )
}
