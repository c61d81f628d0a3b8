// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    credentials, load_module_map, outcome_details, resolve_path, run_annotate, verbosity_level,
};

// Re-export run types from clinickit-core
pub use clinickit_core::{FileOutcome, ModuleMap, RunSummary};
