use colored::*;
use pkgrun_core::results::{ExitOutcome, GENERIC_USER_ERROR};
use pkgrun_core::script_manager::ScriptManager;

use super::list::print_scripts;
use super::report;

pub async fn execute(manager: &ScriptManager, script: Option<&str>, args: &[String]) -> i32 {
    let Some(script) = script else {
        println!("{}", "Available scripts are:".bold());
        print_scripts(&manager.list_scripts());
        return GENERIC_USER_ERROR;
    };

    match manager.run_script(script, args).await {
        Ok(()) => ExitOutcome::Success.exit_code(),
        Err(e) => report(&e),
    }
}
