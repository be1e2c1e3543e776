//! Attach detected address regions to a JSON-array payload.

use crate::cli::EnrichArgs;
use crate::error::Result;
use sluice_enrich::{enrich_payload, HttpEnricher};

/// Enrich the input payload through the detection service
pub fn execute_enrich(args: EnrichArgs) -> Result<()> {
    let payload = std::fs::read_to_string(&args.input)?;
    let enricher = HttpEnricher::new(args.endpoint);

    let enriched = enrich_payload(&payload, &enricher)?;

    match args.output {
        Some(path) => std::fs::write(path, enriched)?,
        None => println!("{}", enriched),
    }
    Ok(())
}
