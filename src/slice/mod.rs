//! Time-window slicing over a chain of record sources

pub mod cursor;
pub mod selection;
pub mod sequence;

pub use cursor::*;
pub use selection::*;
pub use sequence::*;
