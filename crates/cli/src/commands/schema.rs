use anyhow::Result;
use pkgrun_core::configs::runner_config_schema;

pub fn execute() -> Result<i32> {
    println!("{}", serde_json::to_string_pretty(&runner_config_schema())?);
    Ok(0)
}
