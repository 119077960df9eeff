//! logslice: time-window slicing of multi-file record logs
//!
//! A recording session is often split across many files, each holding
//! timestamped records in time order. logslice reads those files as one
//! stream and cuts it into named windows.
//!
//! # Core Concepts
//!
//! - **Records**: typed, timestamped payloads read from record files
//! - **Segments**: inclusive `[start, end]` windows with an output name
//! - **Chain**: the forward-only cursor shared by every segment of a run
//! - **Selection**: one identity stream, or one stream per segment
//!
//! # Example
//!
//! ```no_run
//! use logslice::prelude::*;
//!
//! # fn example() -> logslice::error::Result<()> {
//! let files = vec!["day1.lsr".into(), "day2.lsr".into()];
//! let opener = RecordFileOpener::default();
//! let selection = Selection::choose(files, opener, &["1694736000,1694739600,morning"])?;
//!
//! selection.for_each_stream(|records, name| {
//!     println!("{}: {} record(s)", name, records.filter(|r| r.is_ok()).count());
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod slice;
pub mod storage;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::{Config, DecoderConfig};
    pub use crate::core::*;
    pub use crate::error::{Error, Result};
    pub use crate::slice::*;
    pub use crate::storage::*;
}
