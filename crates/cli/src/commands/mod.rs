use colored::*;
use pkgrun_core::types::PkgrunError;

pub mod list;
pub mod plan;
pub mod run;
pub mod schema;

/// Print a diagnostic for `error` and return the exit code it maps to
pub fn report(error: &PkgrunError) -> i32 {
    eprintln!("{} {}", "✗".red().bold(), error.to_string().red());
    error.exit_code()
}
