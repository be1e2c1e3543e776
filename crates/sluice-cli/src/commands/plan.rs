//! Print the window plan a run would process.

use crate::config::CliConfig;
use crate::error::{CliError, Result};
use chrono::Utc;
use sluice_domain::WindowPlan;

/// Resolve the run bounds and list every window of the plan
pub fn execute_plan(config: CliConfig) -> Result<()> {
    let Some(inc) = &config.run.incremental else {
        return Err(CliError::InvalidInput(
            "plan requires an [run.incremental] section".to_string(),
        ));
    };

    let (from, to) = config.run.resolve_run_bounds(Utc::now());
    let plan = WindowPlan::new(from, to, inc.range_days);

    println!("{} windows over {} (range {} days):", plan.remaining(), inc.range_field, inc.range_days);
    for window in plan {
        println!("  {}", window);
    }
    Ok(())
}
