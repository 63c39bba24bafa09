//! Performance identifier registry and ID list files

pub mod id_file;
pub mod registry;

pub use id_file::{merge_identifiers, read_id_file, write_id_file, IdLoadSummary};
pub use registry::{compare_names, IdRegistry, PerformanceIdentifier};
