//! Rewrites a program so that reads from interactive stdin come from a fixed
//! string instead. The rewrite is textual and best-effort: source that doesn't
//! match the expected shape is returned unchanged and still runs, just without
//! the injected input.
//!
//! Input is interpolated only through the per-language literal encoders,
//! which escape every delimiter and control character of the target
//! language's string literals.

mod cpp;
mod java;
mod javascript;
mod python;

use crate::core::domain::Language;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InjectionStrategy {
    /// Substitute each no-argument read call with the next input line.
    ReplaceReadCalls,
    /// Prepend a `readline()` function backed by the input lines.
    ReadlineShim,
    /// Swap readers built over `System.in` for readers over a string.
    ReaderSource,
    /// Rebuild the entry point around a redirected input stream.
    StreamRedirect,
}

#[tracing::instrument(skip(source, input))]
pub fn inject(source: &str, input: &str, language: Language) -> String {
    match language.entry().injection {
        InjectionStrategy::ReplaceReadCalls => python::inject(source, input),
        InjectionStrategy::ReadlineShim => javascript::inject(source, input),
        InjectionStrategy::ReaderSource => java::inject(source, input),
        InjectionStrategy::StreamRedirect => cpp::inject(source, input),
    }
}

/// Ordered input lines; a trailing `\r` is dropped from each.
pub(crate) fn input_lines(input: &str) -> Vec<&str> {
    input
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}
