//! Storage layer: record files, per-file sources and the source chain

pub mod chain;
pub mod discovery;
pub mod record_file;
pub mod source;

pub use chain::*;
pub use discovery::*;
pub use record_file::*;
pub use source::*;
