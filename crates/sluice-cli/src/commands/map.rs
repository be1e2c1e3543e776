//! Merge store lookups into a JSON-array payload.

use crate::cli::MapArgs;
use crate::config::CliConfig;
use crate::error::Result;
use sluice_engine::FieldMapper;
use sluice_mongo::MongoStore;

/// Rewrite the input payload with fields merged from the store
pub fn execute_map(args: MapArgs, config: CliConfig) -> Result<()> {
    let store = MongoStore::connect(&config.store)?;
    let payload = std::fs::read_to_string(&args.input)?;

    let mapper = FieldMapper::new(
        config.run.query_spec()?,
        args.from_field,
        args.to_field,
    )
    .with_replace_id(args.replace_id);
    let mapped = mapper.map_payload(&store, &payload)?;

    match args.output {
        Some(path) => std::fs::write(path, mapped)?,
        None => println!("{}", mapped),
    }
    Ok(())
}
