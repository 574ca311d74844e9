//! One adapter per language family. Each owns its files in the shared
//! workspace and deletes them once the run is over, whatever the outcome.

pub mod class_file;
pub mod compiled;
pub mod interpreted;

pub use class_file::ClassFileAdapter;
pub use compiled::CompiledAdapter;
pub use interpreted::InterpretedAdapter;

#[cfg(test)]
pub(crate) mod testing {
    use crate::core::domain::ExecutionResult;

    pub fn exited(stdout: &str, stderr: &str, exit_code: i32) -> ExecutionResult {
        ExecutionResult {
            success: exit_code == 0,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code,
            execution_time_ms: 12,
            error: None,
            system_error: None,
        }
    }

    /// Names of the entries left in a directory.
    pub fn leftovers(dir: &std::path::Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }
}
