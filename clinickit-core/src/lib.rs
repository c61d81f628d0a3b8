pub mod annotate;
pub mod error;
pub mod imports;
pub mod jsx;
pub mod module_map;
pub mod report;
pub mod run;

pub use annotate::{ActionKind, AnnotateOptions, Annotation, HandleStatus, annotate_source};
pub use error::AnnotateError;
pub use module_map::ModuleMap;
pub use run::{FileOutcome, RunOptions, RunSummary, annotate_file, annotate_tree};
