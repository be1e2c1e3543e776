//! Command implementations.

pub mod enrich;
pub mod map;
pub mod plan;
pub mod run;

pub use self::enrich::execute_enrich;
pub use self::map::execute_map;
pub use self::plan::execute_plan;
pub use self::run::execute_run;
