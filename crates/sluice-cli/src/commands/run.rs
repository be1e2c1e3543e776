//! Execute an extraction run against the configured store.

use crate::cli::RunArgs;
use crate::config::CliConfig;
use crate::error::Result;
use crate::sink::DirectorySink;
use sluice_engine::RunController;
use sluice_mongo::MongoStore;

/// Run the configured extraction and commit units into the output directory
pub fn execute_run(args: RunArgs, config: CliConfig) -> Result<()> {
    // A store that cannot be reached fails here, before any sink
    // transaction exists.
    let store = MongoStore::connect(&config.store)?;
    let mut sink = DirectorySink::new(&args.out_dir)?;

    let controller = RunController::new(config.run)?;
    let report = controller.run(&store, &mut sink)?;

    println!("{}", report.summary());
    println!("committed into {}", args.out_dir.display());
    Ok(())
}
