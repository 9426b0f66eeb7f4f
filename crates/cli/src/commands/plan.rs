use colored::*;
use pkgrun_core::script_manager::ScriptManager;

use super::report;

pub fn execute(manager: &ScriptManager, script: &str, args: &[String]) -> i32 {
    let plan = match manager.plan(script, args) {
        Ok(plan) => plan,
        Err(e) => return report(&e),
    };

    println!("{} {}", "Execution plan for".bold(), plan.script_name.cyan());

    println!("\n{}:", "Execution order".bold());
    for (i, phase) in plan.phases.iter().enumerate() {
        println!(
            "  {}. {} {} {}",
            i + 1,
            format!("[{}]", phase.phase.label()).dimmed(),
            phase.script.blue().bold(),
            phase.command_line
        );
    }

    println!("\n{}:", "PATH prefix".bold());
    if plan.path_prefix.is_empty() {
        println!("  {}", "no node_modules/.bin directories found".dimmed());
    }
    for dir in &plan.path_prefix {
        println!("  {}", dir.display());
    }

    0
}
