//! # Built-in subscribers
//!
//! - [`LogWriter`]: forwards events to `tracing` (enable with `--features logging`).

#[cfg(feature = "logging")]
mod log;

#[cfg(feature = "logging")]
pub use log::LogWriter;
