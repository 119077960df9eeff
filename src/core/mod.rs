//! Core data types: timestamps, records and segments

pub mod record;
pub mod segment;
pub mod temporal;

pub use record::*;
pub use segment::*;
pub use temporal::*;
