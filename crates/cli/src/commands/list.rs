use colored::*;
use pkgrun_core::results::ScriptListResult;
use pkgrun_core::script_manager::ScriptManager;

pub fn execute(manager: &ScriptManager) -> i32 {
    let result = manager.list_scripts();

    println!(
        "{} {}",
        "Scripts in".bold().underline(),
        result.manifest_path.display().to_string().cyan()
    );
    print_scripts(&result);

    0
}

/// Print each script with its command, in declaration order
pub fn print_scripts(result: &ScriptListResult) {
    if result.scripts.is_empty() {
        println!("  {}", "No scripts found".dimmed());
        return;
    }

    for script in &result.scripts {
        println!("  {}: {}", script.name.blue().bold(), script.command.dimmed());
    }
}
