//! Per-language dispatch table. Each entry bundles everything that varies by
//! language apart from toolchain paths, which come from configuration.

use crate::core::domain::Language;
use crate::core::injection::InjectionStrategy;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    /// Script handed straight to an interpreter.
    Interpreted,
    /// Compiled to a native executable, then run.
    CompiledNative,
    /// Compiled to class files named after the public class, then run on a VM.
    ClassFile,
}

/// Command-line arguments with `{source}`, `{output}`, `{dir}` and `{entry}`
/// placeholders, filled in per execution.
pub type ArgTemplate = &'static [&'static str];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LanguageEntry {
    pub language: Language,
    pub extension: &'static str,
    pub family: Family,
    pub injection: InjectionStrategy,
    /// Arguments for the compiler; `None` for interpreted languages.
    pub compile_args: Option<ArgTemplate>,
    /// Arguments for the interpreter, VM or produced executable.
    pub run_args: ArgTemplate,
}

/// Per-execution values substituted into an [`ArgTemplate`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateSlots<'a> {
    pub source: &'a str,
    pub output: &'a str,
    pub dir: &'a str,
    /// Entry point name, e.g. a fully qualified class.
    pub entry: &'a str,
}

impl TemplateSlots<'_> {
    pub fn render(&self, template: ArgTemplate) -> Vec<String> {
        template
            .iter()
            .map(|arg| {
                arg.replace("{source}", self.source)
                    .replace("{output}", self.output)
                    .replace("{dir}", self.dir)
                    .replace("{entry}", self.entry)
            })
            .collect()
    }
}

pub static PYTHON: LanguageEntry = LanguageEntry {
    language: Language::Python,
    extension: "py",
    family: Family::Interpreted,
    injection: InjectionStrategy::ReplaceReadCalls,
    compile_args: None,
    run_args: &["{source}"],
};

pub static JAVASCRIPT: LanguageEntry = LanguageEntry {
    language: Language::JavaScript,
    extension: "js",
    family: Family::Interpreted,
    injection: InjectionStrategy::ReadlineShim,
    compile_args: None,
    run_args: &["{source}"],
};

pub static CPP: LanguageEntry = LanguageEntry {
    language: Language::Cpp,
    extension: "cpp",
    family: Family::CompiledNative,
    injection: InjectionStrategy::StreamRedirect,
    compile_args: Some(&["-o", "{output}", "{source}", "-std=c++17"]),
    run_args: &[],
};

pub static JAVA: LanguageEntry = LanguageEntry {
    language: Language::Java,
    extension: "java",
    family: Family::ClassFile,
    injection: InjectionStrategy::ReaderSource,
    // `-d` lays packaged classes out under their package directories
    compile_args: Some(&["-encoding", "UTF-8", "-d", "{dir}", "{source}"]),
    run_args: &["-cp", "{dir}", "{entry}"],
};

impl Language {
    pub fn entry(&self) -> &'static LanguageEntry {
        match self {
            Language::Python => &PYTHON,
            Language::JavaScript => &JAVASCRIPT,
            Language::Cpp => &CPP,
            Language::Java => &JAVA,
        }
    }
}
